use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path:?} not found")]
    NotFound { path: PathBuf },

    #[error("reading config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("decoding config file {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {var} has invalid value {value:?}")]
    Env { var: String, value: String },
}

impl ConfigError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("kafka client error: {0}")]
    Client(#[from] rskafka::client::error::Error),

    #[error("broker error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to connect to brokers: {0}")]
    Connect(#[source] BrokerError),

    #[error("failed to attach to partition {partition} of topic {topic}: {source}")]
    AttachPartition {
        topic: String,
        partition: i32,
        #[source]
        source: BrokerError,
    },

    #[error("partition reader failed after {consumed} messages: {source}")]
    Read {
        consumed: u64,
        #[source]
        source: BrokerError,
    },
}
