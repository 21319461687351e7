use std::future::Future;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::{debug, info};

use crate::error::{ChannelError, ChannelResult};

/// Sink for serialized change events.
pub trait MessageChannel: Send + Sync {
    /// Publish one payload, resolving once the broker has acknowledged it.
    fn publish(&self, payload: String) -> impl Future<Output = ChannelResult<()>> + Send;
}

/// Producer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    /// Upper bound on one publish, including queueing and retries.
    pub timeout: Duration,
    pub retries: u32,
}

impl KafkaConfig {
    pub const DEFAULT_RETRIES: u32 = 10;

    /// An empty broker list yields `ChannelError::Disabled`.
    pub fn new(
        brokers: Vec<String>,
        topic: impl Into<String>,
        timeout: Duration,
    ) -> ChannelResult<Self> {
        if brokers.is_empty() {
            return Err(ChannelError::Disabled);
        }

        Ok(Self {
            brokers,
            topic: topic.into(),
            timeout,
            retries: Self::DEFAULT_RETRIES,
        })
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.brokers.join(","))
            .set("acks", "1")
            .set("retries", self.retries.to_string())
            .set("message.timeout.ms", self.timeout.as_millis().to_string());
        config
    }
}

/// Publishes events to a single Kafka topic.
pub struct KafkaChannel {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
}

impl KafkaChannel {
    pub fn new(config: &KafkaConfig) -> ChannelResult<Self> {
        let producer: FutureProducer = config.client_config().create()?;

        info!(
            brokers = %config.brokers.join(","),
            topic = %config.topic,
            "Kafka producer created"
        );

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            timeout: config.timeout,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for queued messages to be delivered.
    pub fn flush(&self) -> ChannelResult<()> {
        self.producer.flush(Timeout::After(self.timeout))?;
        Ok(())
    }
}

impl MessageChannel for KafkaChannel {
    fn publish(&self, payload: String) -> impl Future<Output = ChannelResult<()>> + Send {
        async move {
            let record = FutureRecord::<(), str>::to(&self.topic).payload(payload.as_str());

            match self
                .producer
                .send(record, Timeout::After(self.timeout))
                .await
            {
                Ok((partition, offset)) => {
                    debug!(topic = %self.topic, partition, offset, "Message published");
                    Ok(())
                }
                Err((err, _message)) => Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brokers(list: &[&str]) -> Vec<String> {
        list.iter().map(|b| b.to_string()).collect()
    }

    #[test]
    fn test_new() {
        let config =
            KafkaConfig::new(brokers(&["a:9092", "b:9092"]), "cdc", Duration::from_secs(5)).unwrap();
        assert_eq!(config.brokers, vec!["a:9092", "b:9092"]);
        assert_eq!(config.topic, "cdc");
        assert_eq!(config.retries, 10);
    }

    #[test]
    fn test_no_brokers_is_disabled() {
        let result = KafkaConfig::new(Vec::new(), "cdc", Duration::from_secs(5));
        assert!(matches!(result, Err(ChannelError::Disabled)));
    }

    #[test]
    fn test_client_config() {
        let config = KafkaConfig::new(
            brokers(&["a:9092", "b:9092"]),
            "cdc",
            Duration::from_millis(750),
        )
        .unwrap();
        let client = config.client_config();
        assert_eq!(client.get("bootstrap.servers"), Some("a:9092,b:9092"));
        assert_eq!(client.get("acks"), Some("1"));
        assert_eq!(client.get("retries"), Some("10"));
        assert_eq!(client.get("message.timeout.ms"), Some("750"));
    }
}
