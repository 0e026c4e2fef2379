use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Every model in the chain failed; carries the last failure.
    #[error("All {attempts} model(s) failed, last error: {last}")]
    ModelsExhausted { attempts: usize, last: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
