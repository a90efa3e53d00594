//! CLI error type and exit codes.

use packfetch::catalog::ReferenceError;
use packfetch::manager::ManagerError;

/// Exit code for an operator interruption (128 + SIGINT).
pub const EXIT_CANCELLED: u8 = 130;

/// Exit code for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Errors surfaced to the user by the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Configuration or environment problem.
    Config(String),
    /// The pack argument could not be understood.
    Reference(ReferenceError),
    /// Installation failed.
    Install(ManagerError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Install(e) if e.is_cancelled() => EXIT_CANCELLED,
            _ => EXIT_FAILURE,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "{}", msg),
            Self::Reference(e) => write!(f, "{}", e),
            Self::Install(ManagerError::Cancelled) => write!(f, "Keyboard interrupted."),
            Self::Install(ManagerError::Aborted { .. }) => {
                write!(f, "Failed to download all mods.")
            }
            Self::Install(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Reference(e) => Some(e),
            Self::Install(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<ReferenceError> for CliError {
    fn from(e: ReferenceError) -> Self {
        Self::Reference(e)
    }
}

impl From<ManagerError> for CliError {
    fn from(e: ManagerError) -> Self {
        Self::Install(e)
    }
}
