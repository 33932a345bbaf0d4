/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the engine can
/// handle failures consistently (user-facing notice vs. logged-and-apologized).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed input from the user (non-numeric id, missing file, ...).
    /// Always answered with a corrective notice; the FSM state is unchanged.
    #[error("validation: {0}")]
    Validation(String),

    /// A referenced code/id/category is absent from the catalog.
    #[error("not found: {0}")]
    NotFound(String),

    /// A transport send failed after retry exhaustion.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
