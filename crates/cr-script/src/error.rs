//! Script compilation errors.

use thiserror::Error;

/// Result type for script and spectrum operations.
pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Error, Debug)]
pub enum ScriptError {
    /// The configuration references a user spectrum that has not been normalized yet.
    #[error("Configuration is not ready to compile: {reason}")]
    NotReady { reason: &'static str },

    /// No line of the spectrum file held two numeric columns.
    #[error("Spectrum contains no valid rows ({lines} lines read)")]
    EmptySpectrum { lines: usize },

    #[error("Invalid table file name '{name}': {reason}")]
    InvalidTableName { name: String, reason: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ScriptError::EmptySpectrum { lines: 4 };
        assert!(err.to_string().contains("4 lines"));

        let err = ScriptError::NotReady {
            reason: "user spectrum not loaded",
        };
        assert!(err.to_string().contains("user spectrum"));
    }
}
