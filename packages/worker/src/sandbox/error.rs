use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Sandbox initialization failed: {0}")]
    Initialization(String),

    #[error("Sandbox execution failed: {0}")]
    Execution(String),

    #[error("Sandbox internal error: {0}")]
    Unknown(String),
}
