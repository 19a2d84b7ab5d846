//! Connection and cache settings.

use serde::{Deserialize, Serialize};

/// Settings for building a [`crate::Session`] over TCP.
///
/// All fields have defaults, so a partial config (e.g. just `{"port": 4000}`
/// from JSON) deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server hostname or address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Block cache capacity in entries; `None` disables caching.
    pub cache_capacity: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3333,
            cache_capacity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local_and_uncached() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3333);
        assert_eq!(config.cache_capacity, None);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: Config = serde_json::from_str(r#"{"cache_capacity": 1024}"#).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3333);
        assert_eq!(config.cache_capacity, Some(1024));
    }

    #[test]
    fn round_trips_through_json() {
        let config = Config {
            host: "array.example".to_owned(),
            port: 4000,
            cache_capacity: Some(64),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
    }
}
