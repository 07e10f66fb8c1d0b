use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use rskafka::client::consumer::{StartOffset as KafkaStartOffset, StreamConsumerBuilder};
use rskafka::client::partition::UnknownTopicHandling;
use rskafka::client::{Client, ClientBuilder};
use rskafka::BackoffConfig;
use tracing::debug;

use super::{Broker, BrokerConnection, ConsumedMessage, PartitionReader, StartOffset};
use crate::error::BrokerError;

/// Upper bound on how long a single fetch waits on the broker for new data.
pub const DEFAULT_FETCH_MAX_WAIT_MS: i32 = 500;

/// How long the client keeps retrying a broker request (metadata, partition
/// lookup, fetch) before giving up. Without it rskafka retries forever.
pub const DEFAULT_REQUEST_DEADLINE: Duration = Duration::from_secs(30);

/// [`Broker`] backed by `rskafka`.
#[derive(Debug, Clone)]
pub struct KafkaBroker {
    fetch_max_wait_ms: i32,
    request_deadline: Duration,
}

impl Default for KafkaBroker {
    fn default() -> Self {
        Self {
            fetch_max_wait_ms: DEFAULT_FETCH_MAX_WAIT_MS,
            request_deadline: DEFAULT_REQUEST_DEADLINE,
        }
    }
}

impl KafkaBroker {
    pub fn with_request_deadline(mut self, deadline: Duration) -> Self {
        self.request_deadline = deadline;
        self
    }
}

#[async_trait]
impl Broker for KafkaBroker {
    type Connection = KafkaConnection;

    async fn connect(&self, brokers: &[String]) -> Result<KafkaConnection, BrokerError> {
        if brokers.is_empty() {
            return Err(BrokerError::Other("no broker addresses configured".to_string()));
        }

        let backoff = BackoffConfig {
            deadline: Some(self.request_deadline),
            ..Default::default()
        };
        let client = ClientBuilder::new(brokers.to_vec())
            .backoff_config(backoff)
            .build()
            .await?;
        debug!(?brokers, "kafka client connected");

        Ok(KafkaConnection {
            client: Arc::new(client),
            fetch_max_wait_ms: self.fetch_max_wait_ms,
        })
    }
}

pub struct KafkaConnection {
    client: Arc<Client>,
    fetch_max_wait_ms: i32,
}

#[async_trait]
impl BrokerConnection for KafkaConnection {
    type Reader = KafkaPartitionReader;

    async fn open_partition(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<KafkaPartitionReader, BrokerError> {
        let partition_client = self
            .client
            .partition_client(topic.to_string(), partition, UnknownTopicHandling::Error)
            .await?;

        let kafka_start = match start {
            StartOffset::Earliest => KafkaStartOffset::Earliest,
        };

        let inner = StreamConsumerBuilder::new(Arc::new(partition_client), kafka_start)
            .with_max_wait_ms(self.fetch_max_wait_ms)
            .build()
            .map(|res| {
                res.map(|(record, high_watermark)| ConsumedMessage {
                    offset: record.offset,
                    high_watermark,
                })
                .map_err(BrokerError::from)
            })
            .boxed();

        debug!(topic, partition, ?start, "partition stream opened");
        Ok(KafkaPartitionReader { inner })
    }

    /// `rskafka` has no explicit shutdown; dropping the last client handle
    /// tears down the broker connections.
    async fn close(self) -> Result<(), BrokerError> {
        drop(self.client);
        debug!("kafka client released");
        Ok(())
    }
}

pub struct KafkaPartitionReader {
    inner: BoxStream<'static, Result<ConsumedMessage, BrokerError>>,
}

impl Stream for KafkaPartitionReader {
    type Item = Result<ConsumedMessage, BrokerError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

#[async_trait]
impl PartitionReader for KafkaPartitionReader {
    /// Dropping the stream cancels any in-flight fetch.
    async fn close(self) -> Result<(), BrokerError> {
        drop(self.inner);
        debug!("partition stream released");
        Ok(())
    }
}
