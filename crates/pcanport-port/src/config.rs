use pcanport_filter::{validate, FilterSpec};
use pcanport_native::Baudrate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Bit rate used when none is configured.
pub const DEFAULT_CAN_RATE: u32 = 250_000;

/// Options for a [`Port`](crate::Port).
///
/// Deserializes from the camelCase option names (`canRate`, `loopback`,
/// `filters`); missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortConfig {
    /// Bus bit rate in bits per second. Default: 250 000.
    pub can_rate: u32,
    /// Echo every written frame back as inbound data. Default: off.
    pub loopback: bool,
    /// Receive filters. Default: none (receive everything).
    pub filters: Vec<FilterSpec>,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            can_rate: DEFAULT_CAN_RATE,
            loopback: false,
            filters: Vec::new(),
        }
    }
}

impl PortConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_can_rate(mut self, can_rate: u32) -> Self {
        self.can_rate = can_rate;
        self
    }

    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filters.push(filter);
        self
    }

    /// Controller timing code for the configured rate.
    pub fn baudrate(&self) -> Result<Baudrate, ConfigError> {
        Baudrate::from_bit_rate(self.can_rate).ok_or(ConfigError::UnsupportedRate(self.can_rate))
    }

    /// Check the rate and every filter without touching hardware.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.baudrate()?;
        validate(&self.filters)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pcanport_filter::FilterError;

    use super::*;

    #[test]
    fn defaults() {
        let config = PortConfig::default();
        assert_eq!(config.can_rate, 250_000);
        assert!(!config.loopback);
        assert!(config.filters.is_empty());
        assert_eq!(config.baudrate().unwrap(), Baudrate::BAUD_250K);
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let config = PortConfig::from_json(r#"{"loopback": true}"#).unwrap();
        assert_eq!(config.can_rate, DEFAULT_CAN_RATE);
        assert!(config.loopback);

        let config = PortConfig::from_json(
            r#"{"canRate": 500000, "filters": [{"ext": true, "id": "08000000 1CFFFFFF"}]}"#,
        )
        .unwrap();
        assert_eq!(config.can_rate, 500_000);
        assert_eq!(config.filters, vec![FilterSpec::id("08000000 1CFFFFFF", true)]);
        config.validate().unwrap();
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            PortConfig::from_json("{canRate"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn validate_rejects_unsupported_rate() {
        let err = PortConfig::default().with_can_rate(115_200).validate().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedRate(115_200)));
    }

    #[test]
    fn validate_rejects_mixed_filters() {
        let config = PortConfig::default()
            .with_filter(FilterSpec::id("0 7FF", false))
            .with_filter(FilterSpec::id("0 1FFFFFFF", true));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Filter(FilterError::MixedModes))
        ));
    }
}
