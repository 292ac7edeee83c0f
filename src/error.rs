use thiserror::Error;

pub type Result<O> = std::result::Result<O, PipelineError>;

/// Configuration validation failure, carrying section/key context the
/// same way the original Python `ConfigError` did.
#[derive(Error, Debug)]
#[error("config error: {message}{}{}",
    section.as_ref().map(|s| format!(" | section={s}")).unwrap_or_default(),
    key.as_ref().map(|k| format!(" | key={k}")).unwrap_or_default())]
pub struct ConfigError {
    pub message: String,
    pub section: Option<String>,
    pub key: Option<String>,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        ConfigError {
            message: message.into(),
            section: None,
            key: None,
        }
    }

    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("io error: '{0}'")]
    Io(#[from] std::io::Error),

    #[error("csv error: '{0}'")]
    Csv(#[from] csv::Error),

    #[error("sqlite failure: '{0}'")]
    Sqlite(#[from] rusqlite::Error),

    #[error("sqlite migration failure: '{0}'")]
    SqliteMigration(#[from] rusqlite_migration::Error),

    /// File-resolution failures at ingestion setup: missing input file,
    /// non-directory input path, or an empty glob match.
    #[error("ingestion setup failed: {0}")]
    Ingestion(String),
}
