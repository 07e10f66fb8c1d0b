use clap::Parser;

use crate::logging::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "offset-test",
    about = "Counts messages on one Kafka partition, from the oldest offset, until interrupted"
)]
pub struct Params {
    /// Configuration file applied after ./offset_test.conf. Empty means none.
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Human readable log lines instead of JSON.
    #[arg(long)]
    pub logpretty: bool,
}
