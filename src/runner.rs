use std::fmt;
use std::future::Future;

use futures::{FutureExt, StreamExt};
use tracing::{debug, error, info, instrument};

use crate::broker::{Broker, BrokerConnection, ConsumedMessage, PartitionReader, StartOffset};
use crate::config::AppConfig;
use crate::error::{BrokerError, RunnerError};

/// Lifecycle of a single run. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunnerState {
    Disconnected,
    Connected,
    PartitionAttached,
    Consuming,
    Draining,
    Closed,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunnerState::Disconnected => "disconnected",
            RunnerState::Connected => "connected",
            RunnerState::PartitionAttached => "partition-attached",
            RunnerState::Consuming => "consuming",
            RunnerState::Draining => "draining",
            RunnerState::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
struct StateTracker(RunnerState);

impl StateTracker {
    fn enter(&mut self, next: RunnerState) {
        debug_assert!(next > self.0, "runner state moved backwards: {} -> {}", self.0, next);
        debug!(from = %self.0, to = %next, "runner state change");
        self.0 = next;
    }
}

/// What a finished run saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsumeReport {
    pub consumed: u64,
    pub last_offset: Option<i64>,
}

impl ConsumeReport {
    fn record(&mut self, msg: &ConsumedMessage) {
        debug!(offset = msg.offset, high_watermark = msg.high_watermark, "consumed message");
        self.consumed += 1;
        self.last_offset = Some(msg.offset);
    }

    fn step(&mut self, next: Option<Result<ConsumedMessage, BrokerError>>) -> Step {
        match next {
            Some(Ok(msg)) => {
                self.record(&msg);
                Step::Continue
            }
            // The reader terminates after reporting an error.
            Some(Err(e)) => {
                error!(error = %e, "partition reader failed");
                Step::Failed(e)
            }
            None => {
                info!("partition stream ended");
                Step::Ended
            }
        }
    }
}

#[derive(Debug)]
enum Step {
    Continue,
    Ended,
    Failed(BrokerError),
}

impl Step {
    fn is_continue(&self) -> bool {
        matches!(self, Step::Continue)
    }
}

/// Reads the configured partition from the oldest retained offset until
/// `shutdown` resolves or the stream ends, then releases the partition reader
/// and the connection, in that order.
///
/// `shutdown` is also watched while connecting and attaching; resolving it
/// there releases whatever was acquired and returns an empty report.
/// Connection and attach failures are returned before anything is consumed.
/// A reader failure is returned after releasing. Failures while releasing are
/// logged and never returned.
#[instrument(
    skip_all,
    fields(
        topic = %config.src_topic,
        partition = config.src_partition,
        cust_id = %config.cust_id,
        agent_id = %config.agent_id,
    )
)]
pub async fn run<B, S>(
    broker: &B,
    config: &AppConfig,
    shutdown: S,
) -> Result<ConsumeReport, RunnerError>
where
    B: Broker,
    S: Future<Output = ()>,
{
    let mut state = StateTracker(RunnerState::Disconnected);
    let mut report = ConsumeReport::default();
    tokio::pin!(shutdown);

    // Broker first: an interrupt only wins while the broker is still pending.
    let connection = tokio::select! {
        biased;
        res = broker.connect(&config.brokers) => res.map_err(RunnerError::Connect)?,
        _ = &mut shutdown => {
            info!("interrupt received while connecting");
            state.enter(RunnerState::Closed);
            return Ok(report);
        }
    };
    state.enter(RunnerState::Connected);

    let attach = tokio::select! {
        biased;
        res = connection.open_partition(
            &config.src_topic,
            config.src_partition,
            StartOffset::Earliest,
        ) => Some(res),
        _ = &mut shutdown => None,
    };
    let mut reader = match attach {
        Some(Ok(reader)) => reader,
        Some(Err(source)) => {
            close_connection(connection).await;
            return Err(RunnerError::AttachPartition {
                topic: config.src_topic.clone(),
                partition: config.src_partition,
                source,
            });
        }
        None => {
            info!("interrupt received while attaching partition");
            close_connection(connection).await;
            state.enter(RunnerState::Closed);
            return Ok(report);
        }
    };
    state.enter(RunnerState::PartitionAttached);

    let mut step = Step::Continue;

    state.enter(RunnerState::Consuming);
    info!("consuming from oldest offset");
    while step.is_continue() {
        tokio::select! {
            next = reader.next() => step = report.step(next),
            _ = &mut shutdown => {
                info!("interrupt received, shutting down");
                break;
            }
        }
    }

    // Count whatever the reader already holds so nothing delivered before the
    // interrupt is lost.
    state.enter(RunnerState::Draining);
    while step.is_continue() {
        match reader.next().now_or_never() {
            Some(next) => step = report.step(next),
            None => break,
        }
    }

    if let Err(e) = reader.close().await {
        error!(error = %e, "problem closing partition reader");
    }
    close_connection(connection).await;
    state.enter(RunnerState::Closed);

    info!(consumed = report.consumed, last_offset = ?report.last_offset, "consumer closed");
    match step {
        Step::Failed(source) => Err(RunnerError::Read {
            consumed: report.consumed,
            source,
        }),
        _ => Ok(report),
    }
}

async fn close_connection<C: BrokerConnection>(connection: C) {
    if let Err(e) = connection.close().await {
        error!(error = %e, "problem closing broker connection");
    }
}
