use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_stdout_level")]
    pub stdout_level: String,
    #[serde(default = "default_file_level")]
    pub file_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Worker threads for the shared executor pool. Defaults to the
    /// platform's available parallelism.
    pub worker_threads: Option<usize>,
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_max_init_group_holder_capacity")]
    pub max_init_group_holder_capacity: usize,
    #[serde(default = "default_num_groups_limit")]
    pub num_groups_limit: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            stdout_level: default_stdout_level(),
            file_level: default_file_level(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            default_timeout_ms: default_timeout_ms(),
            max_init_group_holder_capacity: default_max_init_group_holder_capacity(),
            num_groups_limit: default_num_groups_limit(),
        }
    }
}

impl QueryConfig {
    pub fn worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    /// Holder capacity may never exceed the cross-segment groups limit.
    pub fn effective_group_holder_capacity(&self) -> usize {
        self.max_init_group_holder_capacity
            .min(self.num_groups_limit)
    }
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_stdout_level() -> String {
    "info".to_string()
}

fn default_file_level() -> String {
    "info".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_init_group_holder_capacity() -> usize {
    10_000
}

fn default_num_groups_limit() -> usize {
    100_000
}

use std::env;

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("STRATODB_CONFIG").unwrap_or_else(|_| "config".to_string());

    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(&config_path).required(false))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
