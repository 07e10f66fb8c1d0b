use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Consulted before any file named on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "./offset_test.conf";

/// Prefix for the environment layer, e.g. `OFFSET_TEST_SRC_TOPIC`.
pub const ENV_PREFIX: &str = "OFFSET_TEST_";

/// Settings needed to set up the consumer. Filled in once during startup and
/// only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub src_topic: String,
    pub src_partition: i32,
    pub cust_id: String,
    pub agent_id: String,
    pub brokers: Vec<String>,
    pub num_partitions: i32,
    pub replication_factor: i16,
}

impl Default for AppConfig {
    /// Demo values. Enough to keep the process from falling over, not enough
    /// to reach a real cluster.
    fn default() -> Self {
        Self {
            src_topic: "history-transactions".to_string(),
            src_partition: 0,
            cust_id: "ce8e6040-4e29-405f-bdfd-015ae91b11a3".to_string(),
            agent_id: "f6d6d81c-6104-457b-acae-b8949ae4cecd".to_string(), // demo account
            brokers: vec![
                "bigdata-worker2.dc.res0.local:9092".to_string(),
                "bigdata-worker1.dc.res0.local:9092".to_string(),
                "bigdata-worker0.dc.res0.local:9092".to_string(),
            ],
            num_partitions: 1,
            replication_factor: 1,
        }
    }
}

/// One override layer. Every field is optional so an absent key leaves the
/// previous value alone.
#[derive(Debug, Default, Deserialize)]
struct Overlay {
    #[serde(alias = "SrcTopic")]
    src_topic: Option<String>,
    #[serde(alias = "SrcPartition")]
    src_partition: Option<i32>,
    #[serde(alias = "CustId")]
    cust_id: Option<String>,
    #[serde(alias = "AgentId")]
    agent_id: Option<String>,
    #[serde(alias = "Brokers")]
    brokers: Option<Vec<String>>,
    #[serde(alias = "NumPartitions")]
    num_partitions: Option<i32>,
    #[serde(alias = "ReplicationFactor")]
    replication_factor: Option<i16>,
}

impl Overlay {
    fn apply(self, cfg: &mut AppConfig) {
        if let Some(v) = self.src_topic {
            cfg.src_topic = v;
        }
        if let Some(v) = self.src_partition {
            cfg.src_partition = v;
        }
        if let Some(v) = self.cust_id {
            cfg.cust_id = v;
        }
        if let Some(v) = self.agent_id {
            cfg.agent_id = v;
        }
        if let Some(v) = self.brokers {
            cfg.brokers = v;
        }
        if let Some(v) = self.num_partitions {
            cfg.num_partitions = v;
        }
        if let Some(v) = self.replication_factor {
            cfg.replication_factor = v;
        }
    }

    fn from_env<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |field: &str| {
            let name = format!("{ENV_PREFIX}{field}");
            lookup(&name).map(|value| (name, value))
        };

        Ok(Self {
            src_topic: var("SRC_TOPIC").map(|(_, v)| v),
            src_partition: var("SRC_PARTITION").map(parse_var).transpose()?,
            cust_id: var("CUST_ID").map(|(_, v)| v),
            agent_id: var("AGENT_ID").map(|(_, v)| v),
            brokers: var("BROKERS").map(|(_, v)| split_brokers(&v)),
            num_partitions: var("NUM_PARTITIONS").map(parse_var).transpose()?,
            replication_factor: var("REPLICATION_FACTOR").map(parse_var).transpose()?,
        })
    }
}

fn parse_var<T: FromStr>((var, value): (String, String)) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}

fn split_brokers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Where each layer comes from.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub default_file: PathBuf,
    pub cli_file: Option<PathBuf>,
    pub use_env: bool,
}

impl LoadOptions {
    /// Standard wiring: the fixed default file, the optional file from the
    /// command line (an empty path counts as none) and the environment.
    pub fn new(cli_file: Option<PathBuf>) -> Self {
        Self {
            default_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            cli_file: cli_file.filter(|p| !p.as_os_str().is_empty()),
            use_env: true,
        }
    }
}

impl AppConfig {
    /// Overwrites fields with the ones present in the TOML file at `path`.
    ///
    /// A missing file yields [`ConfigError::NotFound`] so callers can decide
    /// whether absence matters. The whole document is decoded before any
    /// field is touched, so on error `self` is unchanged.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let overlay: Overlay = toml::from_str(&raw).map_err(|source| ConfigError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        overlay.apply(self);
        Ok(())
    }

    /// Overwrites fields from `OFFSET_TEST_*` variables resolved through
    /// `lookup`. `BROKERS` is comma separated.
    pub fn load_from_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Overlay::from_env(lookup)?.apply(self);
        Ok(())
    }

    /// Resolves the configuration: defaults, default file, command-line file,
    /// environment. Later layers win.
    pub fn load(options: &LoadOptions) -> Result<Self, ConfigError> {
        Self::load_with(options, |name| std::env::var(name).ok())
    }

    pub fn load_with<F>(options: &LoadOptions, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        // The default file is optional; only a broken one stops us.
        match cfg.load_from_file(&options.default_file) {
            Ok(()) => info!(path = ?options.default_file, "loaded default config file"),
            Err(e) if e.is_not_found() => {
                warn!(path = ?options.default_file, "default config file not found, using built-in defaults")
            }
            Err(e) => return Err(e),
        }

        if let Some(path) = &options.cli_file {
            cfg.load_from_file(path)?;
            info!(path = ?path, "loaded config file");
        }

        if options.use_env {
            cfg.load_from_env_with(lookup)?;
        }

        debug!(config = ?cfg, "resolved configuration");
        Ok(cfg)
    }
}
