//! The narrow slice of a Kafka client the runner depends on: connect, open a
//! single partition, read a stream of messages, close.

mod kafka;

use async_trait::async_trait;
use futures::Stream;

use crate::error::BrokerError;

pub use kafka::{KafkaBroker, KafkaConnection, KafkaPartitionReader};

/// Where a partition reader starts. Offsets are never checkpointed, so the
/// oldest retained one is the only start point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffset {
    Earliest,
}

/// Metadata of one consumed record. The payload is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumedMessage {
    pub offset: i64,
    pub high_watermark: i64,
}

#[async_trait]
pub trait Broker: Send + Sync {
    type Connection: BrokerConnection;

    async fn connect(&self, brokers: &[String]) -> Result<Self::Connection, BrokerError>;
}

#[async_trait]
pub trait BrokerConnection: Send + Sync + Sized {
    type Reader: PartitionReader;

    async fn open_partition(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<Self::Reader, BrokerError>;

    async fn close(self) -> Result<(), BrokerError>;
}

/// A reader error ends the stream; no further items follow it.
#[async_trait]
pub trait PartitionReader:
    Stream<Item = Result<ConsumedMessage, BrokerError>> + Unpin + Send + Sized
{
    async fn close(self) -> Result<(), BrokerError>;
}
