#![allow(dead_code)]

use std::fs;
use std::future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use tempfile::TempDir;

use kafka_offset_test::broker::{
    Broker, BrokerConnection, ConsumedMessage, PartitionReader, StartOffset,
};
use kafka_offset_test::BrokerError;

pub fn folder_to_use() -> TempDir {
    tempfile::Builder::new()
        .prefix("offset_test_")
        .tempdir()
        .expect("failed to create temp dir")
}

pub fn write_config<P: AsRef<Path>>(dir: P, name: &str, body: &str) -> PathBuf {
    let path = dir.as_ref().join(name);
    fs::write(&path, body).expect("failed to write config file");
    path
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(Vec<String>),
    Open {
        topic: String,
        partition: i32,
        start: StartOffset,
    },
    CloseReader,
    CloseConnection,
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

pub type Feed = mpsc::UnboundedSender<Result<ConsumedMessage, BrokerError>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub connect: bool,
    pub open: bool,
    /// `connect` never resolves.
    pub hang_connect: bool,
    /// `open_partition` never resolves.
    pub hang_open: bool,
    pub close_reader: bool,
    pub close_connection: bool,
}

/// Broker whose single partition is fed through the returned [`Feed`].
/// Dropping the feed ends the partition stream.
pub struct MockBroker {
    pub journal: Journal,
    failures: Failures,
    feed: Mutex<Option<mpsc::UnboundedReceiver<Result<ConsumedMessage, BrokerError>>>>,
}

impl MockBroker {
    pub fn new(failures: Failures) -> (Self, Feed) {
        let (tx, rx) = mpsc::unbounded();
        let broker = Self {
            journal: Journal::default(),
            failures,
            feed: Mutex::new(Some(rx)),
        };
        (broker, tx)
    }
}

pub fn message(offset: i64) -> Result<ConsumedMessage, BrokerError> {
    Ok(ConsumedMessage {
        offset,
        high_watermark: offset + 1,
    })
}

#[async_trait]
impl Broker for MockBroker {
    type Connection = MockConnection;

    async fn connect(&self, brokers: &[String]) -> Result<MockConnection, BrokerError> {
        self.journal.push(Event::Connect(brokers.to_vec()));
        if self.failures.hang_connect {
            future::pending::<()>().await;
        }
        if self.failures.connect {
            return Err(BrokerError::Other("connection refused".to_string()));
        }
        Ok(MockConnection {
            journal: self.journal.clone(),
            failures: self.failures,
            feed: Mutex::new(self.feed.lock().unwrap().take()),
        })
    }
}

pub struct MockConnection {
    journal: Journal,
    failures: Failures,
    feed: Mutex<Option<mpsc::UnboundedReceiver<Result<ConsumedMessage, BrokerError>>>>,
}

#[async_trait]
impl BrokerConnection for MockConnection {
    type Reader = MockReader;

    async fn open_partition(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<MockReader, BrokerError> {
        self.journal.push(Event::Open {
            topic: topic.to_string(),
            partition,
            start,
        });
        if self.failures.hang_open {
            future::pending::<()>().await;
        }
        if self.failures.open {
            return Err(BrokerError::Other("unknown topic or partition".to_string()));
        }
        let feed = self
            .feed
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BrokerError::Other("partition already open".to_string()))?;
        Ok(MockReader {
            journal: self.journal.clone(),
            fail_close: self.failures.close_reader,
            feed,
        })
    }

    async fn close(self) -> Result<(), BrokerError> {
        self.journal.push(Event::CloseConnection);
        if self.failures.close_connection {
            return Err(BrokerError::Other("connection close failed".to_string()));
        }
        Ok(())
    }
}

pub struct MockReader {
    journal: Journal,
    fail_close: bool,
    feed: mpsc::UnboundedReceiver<Result<ConsumedMessage, BrokerError>>,
}

impl Stream for MockReader {
    type Item = Result<ConsumedMessage, BrokerError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.feed.poll_next_unpin(cx)
    }
}

#[async_trait]
impl PartitionReader for MockReader {
    async fn close(self) -> Result<(), BrokerError> {
        self.journal.push(Event::CloseReader);
        if self.fail_close {
            return Err(BrokerError::Other("reader close failed".to_string()));
        }
        Ok(())
    }
}
