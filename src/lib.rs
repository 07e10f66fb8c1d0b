pub mod broker;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod runner;
pub mod signal;

pub use config::{AppConfig, LoadOptions};
pub use error::{BrokerError, ConfigError, RunnerError};
pub use runner::{run, ConsumeReport, RunnerState};
