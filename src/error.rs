//! Application error type shared by the library and the `dives` binary.
//!
//! Every fallible operation returns `Result<_, AppError>`. The exit code tells
//! `main` how the run failed:
//!
//! - `2`: usage, configuration, or local file problems
//! - `3`: data problems (empty frames, unknown columns, mismatched lengths)
//! - `4`: network or numerical failures

#[derive(Clone, PartialEq, Eq)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Bad flags, bad config, unreadable local files.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// Input data that cannot support the requested dive.
    pub fn data(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// Downloads and numerical failures.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
