//! Test data builders

use rhs_relay::config::DeviceConfig;

/// Builder for configs that run fast under test
pub struct ConfigBuilder {
    config: DeviceConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = DeviceConfig::default();
        config.sampling.sample_delay_us = 200;
        config.sampling.init_backoff_ms = 1;
        config.stimulation.enabled = false;
        Self { config }
    }

    pub fn batch_capacity(mut self, capacity: usize) -> Self {
        self.config.sampling.batch_capacity = capacity;
        self
    }

    pub fn stimulation_every_ms(mut self, interval_ms: u64) -> Self {
        self.config.stimulation.enabled = true;
        self.config.stimulation.interval_ms = interval_ms;
        self
    }

    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.queues.outbound_capacity = capacity;
        self
    }

    pub fn build(self) -> DeviceConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_config_is_valid() {
        let config = ConfigBuilder::new().stimulation_every_ms(5).build();
        assert!(config.validate().is_ok());
        assert!(config.stimulation.enabled);
    }
}
