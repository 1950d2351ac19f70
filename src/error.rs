//! Structured error handling and exit codes.

use serde::Serialize;

use crate::duplicates::FinderError;
use crate::scanner::ScanError;

/// Exit codes for the treedupe binary.
///
/// - 0: Success (completed normally, duplicates found)
/// - 1: General error (unexpected failure, or a read failure during classification)
/// - 2: No duplicates found (completed normally, no duplicates)
/// - 3: Partial success (some paths could not be opened and were skipped)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: duplicates were found.
    Success = 0,
    /// General error: an unexpected error occurred.
    GeneralError = 1,
    /// No duplicates: classification completed without finding any.
    NoDuplicates = 2,
    /// Partial success: some inputs were skipped before classification.
    PartialSuccess = 3,
    /// Interrupted: classification was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "TD000",
            Self::GeneralError => "TD001",
            Self::NoDuplicates => "TD002",
            Self::PartialSuccess => "TD003",
            Self::Interrupted => "TD130",
        }
    }

    /// Pick the exit code for an error returned by [`crate::run_app`].
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let interrupted = err.chain().any(|cause| {
            matches!(cause.downcast_ref::<FinderError>(), Some(FinderError::Interrupted))
                || matches!(cause.downcast_ref::<ScanError>(), Some(ScanError::Interrupted))
        });
        if interrupted {
            Self::Interrupted
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "TD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Input index of the candidate that failed, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<usize>,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        let candidate = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<FinderError>())
            .and_then(FinderError::candidate);

        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            candidate,
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
