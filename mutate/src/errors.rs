use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error")]
    Config(#[from] crate::config::ConfigError),

    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("serde_json error")]
    SerdeJson(#[from] serde_json::Error),

    #[error("callback channel error")]
    Channel(#[from] gateway::callbacks::ChannelError),

    #[error("form error")]
    Form(#[from] forms::FormError),

    #[error("tracing filter error")]
    TracingParse(#[from] tracing_subscriber::filter::ParseError),

    #[error("collections directory could not be resolved")]
    CollectionsDir,

    #[error("invalid collection definition {path:?}")]
    Definition {
        path: PathBuf,
        #[source]
        source: schema::Error,
    },

    #[error("collection {name:?} is defined more than once")]
    DuplicateCollection { name: String },

    #[error("collection {0:?} not found")]
    CollectionNotFound(String),

    #[error("invalid script entry on line {line}")]
    ScriptEntry {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
