//! Configuration for mutate - using the CLI (clap), env (clap), and configuration file (toml).

mod clap_config;
mod toml_config;

use clap::{parser::ValueSource, ArgMatches, ValueEnum};
use serde::Deserialize;

pub use toml_config::TomlConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("toml config error")]
    TomlConfig(#[from] TomlConfigError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug)]
pub struct Config {
    pub command: Option<MutateCommand>,

    /// Root directory holding the config file and collection definitions
    pub root_dir: String,

    /// Directory of `*.json` collection definitions, `<root-dir>/collections`
    /// when unset
    pub collections_dir: Option<String>,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    pub fn new() -> ConfigResult<Self> {
        Self::from_matches(clap_config::get_matches())
    }

    fn from_matches(matches: ArgMatches) -> ConfigResult<Self> {
        let mut config: Config = matches.clone().into();
        config.merge_toml_core_config(matches)?;
        Ok(config)
    }

    fn was_supplied_by_user(key: &str, matches: &ArgMatches) -> bool {
        !matches!(matches.value_source(key), Some(ValueSource::DefaultValue))
    }

    /// The order of priority is (in decreasing order):
    /// cli -> env -> toml -> default
    ///
    /// Values with a default are only taken from the TOML file when the user
    /// did not supply them. Optional values are taken from the TOML file when
    /// unset.
    fn merge_toml_core_config(&mut self, matches: ArgMatches) -> ConfigResult<()> {
        let Some(mut toml_config) = toml_config::read_config(&self.root_dir)? else {
            return Ok(());
        };

        if self.collections_dir.is_none() && toml_config.core.collections_dir.is_some() {
            self.collections_dir = toml_config.core.collections_dir.take();
        }

        if !Self::was_supplied_by_user("log-level", &matches) {
            if let Some(log_level) = toml_config.core.log_level {
                self.log_level = log_level;
            }
        }

        if !Self::was_supplied_by_user("log-format", &matches) {
            if let Some(log_format) = toml_config.core.log_format {
                self.log_format = log_format;
            }
        }

        Ok(())
    }
}

// `clap` does not provide an automated way to build `Config` in builder mode.
// Every unwrapped argument has a default value or is required.
#[allow(clippy::unwrap_used)]
impl From<ArgMatches> for Config {
    fn from(am: ArgMatches) -> Self {
        Config {
            command: match am.subcommand() {
                Some(("run", sub)) => Some(MutateCommand::Run {
                    script: sub.get_one::<String>("script").unwrap().clone(),
                }),
                Some(("form", sub)) => Some(MutateCommand::Form {
                    collection: sub.get_one::<String>("collection").unwrap().clone(),
                    document_id: sub.get_one::<String>("document-id").cloned(),
                    fields: sub
                        .get_many::<String>("fields")
                        .map(|values| values.map(String::from).collect()),
                    added_fields: sub
                        .get_many::<String>("added-fields")
                        .map(|values| values.map(String::from).collect())
                        .unwrap_or_default(),
                }),
                _ => None,
            },
            root_dir: am.get_one::<String>("root-dir").unwrap().clone(),
            collections_dir: am.get_one::<String>("collections-dir").cloned(),
            log_level: *am.get_one::<LogLevel>("log-level").unwrap(),
            log_format: *am.get_one::<LogFormat>("log-format").unwrap(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutateCommand {
    /// Run a JSON-lines mutation script, `-` reads stdin
    Run { script: String },
    /// Print the composed form for a collection
    Form {
        collection: String,
        document_id: Option<String>,
        fields: Option<Vec<String>>,
        added_fields: Vec<String>,
    },
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, ValueEnum)]
#[clap(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    #[serde(rename = "DEBUG")]
    Debug,
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "ERROR")]
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Deserialize)]
#[clap(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogFormat {
    #[serde(rename = "PRETTY")]
    Pretty,
    #[serde(rename = "JSON")]
    Json,
}
