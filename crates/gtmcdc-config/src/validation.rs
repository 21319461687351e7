use crate::error::{ConfigError, ConfigResult};
use crate::filter::FilterConfig;

/// Validate a loaded configuration.
pub fn validate(config: &FilterConfig) -> ConfigResult<()> {
    validate_kafka(config)?;
    validate_listen_addr(config)?;
    Ok(())
}

fn validate_kafka(config: &FilterConfig) -> ConfigResult<()> {
    if config.kafka_timeout_ms == 0 {
        return Err(ConfigError::InvalidTimeout);
    }
    if config.kafka_enabled() {
        if config.kafka_topic.trim().is_empty() {
            return Err(ConfigError::MissingTopic);
        }
        if config.broker_list().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "kafka_brokers".to_string(),
                value: config.kafka_brokers.clone(),
            });
        }
    }
    Ok(())
}

fn validate_listen_addr(config: &FilterConfig) -> ConfigResult<()> {
    config.prom_addr().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&FilterConfig::default()).is_ok());
        assert!(validate(&FilterConfig::dev()).is_ok());
    }

    #[test]
    fn test_topic_required_with_brokers() {
        let config = FilterConfig {
            kafka_brokers: "localhost:9092".into(),
            kafka_topic: " ".into(),
            ..Default::default()
        };
        assert!(matches!(validate(&config), Err(ConfigError::MissingTopic)));

        // no brokers, no topic needed
        let config = FilterConfig {
            kafka_topic: String::new(),
            ..Default::default()
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_brokers_must_name_a_host() {
        let config = FilterConfig {
            kafka_brokers: ",,".into(),
            ..Default::default()
        };
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = FilterConfig {
            kafka_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(validate(&config), Err(ConfigError::InvalidTimeout)));
    }

    #[test]
    fn test_listen_addr() {
        for addr in ["0.0.0.0:10101", ":10101", "localhost:10101"] {
            let config = FilterConfig {
                prom_http_addr: addr.into(),
                ..Default::default()
            };
            assert!(validate(&config).is_ok(), "{addr:?}");
        }

        let config = FilterConfig {
            prom_http_addr: "localhost".into(),
            ..Default::default()
        };
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidListenAddr(_))
        ));
    }
}
