use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Process did not appear before the launch deadline: {0}")]
    LaunchTimeout(String),

    #[error("Window not found: {0}")]
    WindowNotFound(String),

    #[error("Login field detection failed: {0}")]
    FieldDetectionFailure(String),

    #[error("Attempt failed: {0}")]
    AttemptFailed(String),

    #[error("Input dispatch aborted: {0}")]
    InputAborted(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Termination failed: {0}")]
    TerminationFailure(String),
}
