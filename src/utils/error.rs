use thiserror::Error;

#[derive(Error, Debug)]
pub enum FocusError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("File watcher error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Window probe failed: {message}")]
    WindowProbeError { message: String },

    #[error("LLM response error: {message}")]
    LlmError { message: String },

    #[error("Session error: {message}")]
    SessionError { message: String },

    #[error("Setup step failed: {message}")]
    SetupError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Storage,
    Platform,
    Session,
    Setup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FocusError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FocusError::ConfigError { .. }
            | FocusError::ConfigValidationError { .. }
            | FocusError::InvalidConfigValueError { .. }
            | FocusError::MissingConfigError { .. } => ErrorCategory::Configuration,
            FocusError::HttpError(_) | FocusError::LlmError { .. } => ErrorCategory::Network,
            FocusError::IoError(_)
            | FocusError::DatabaseError(_)
            | FocusError::SerializationError(_) => ErrorCategory::Storage,
            FocusError::WatchError(_)
            | FocusError::WindowProbeError { .. }
            | FocusError::TaskError(_) => ErrorCategory::Platform,
            FocusError::SessionError { .. } => ErrorCategory::Session,
            FocusError::SetupError { .. } => ErrorCategory::Setup,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 可降級處理：LLM 離線時改用規則分類
            FocusError::HttpError(_) | FocusError::LlmError { .. } => ErrorSeverity::Low,
            FocusError::WindowProbeError { .. } | FocusError::SessionError { .. } => {
                ErrorSeverity::Medium
            }
            FocusError::ConfigError { .. }
            | FocusError::ConfigValidationError { .. }
            | FocusError::InvalidConfigValueError { .. }
            | FocusError::MissingConfigError { .. }
            | FocusError::SerializationError(_)
            | FocusError::WatchError(_)
            | FocusError::TaskError(_)
            | FocusError::SetupError { .. } => ErrorSeverity::High,
            FocusError::IoError(_) | FocusError::DatabaseError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check focus-tracker.toml and the command line flags"
            }
            ErrorCategory::Network => {
                "Make sure Ollama is running (`ollama serve`) and the model is pulled (`ollama list`)"
            }
            ErrorCategory::Storage => {
                "Check that the database path is writable and the disk is not full"
            }
            ErrorCategory::Platform => {
                "Run `focus-tracker setup` to install xdotool, or check the watched paths"
            }
            ErrorCategory::Session => "Start a session with the `start` command first",
            ErrorCategory::Setup => "Re-run setup with --verbose and check the package manager output",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            FocusError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting {}: {}", field, reason)
            }
            FocusError::MissingConfigError { field } => format!("Missing setting: {}", field),
            FocusError::DatabaseError(_) => {
                "Could not read or write the focus database".to_string()
            }
            FocusError::HttpError(_) => "Could not reach the local LLM server".to_string(),
            other => other.to_string(),
        }
    }

    /// 依嚴重程度決定的結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, FocusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_maps_to_exit_code() {
        let err = FocusError::LlmError {
            message: "no array".to_string(),
        };
        assert_eq!(err.exit_code(), 0);

        let err = FocusError::MissingConfigError {
            field: "database.path".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.exit_code(), 1);

        let err = FocusError::IoError(std::io::Error::other("disk"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_user_friendly_message() {
        let err = FocusError::InvalidConfigValueError {
            field: "monitor.poll_interval_secs".to_string(),
            value: "0".to_string(),
            reason: "Value must be at least 1".to_string(),
        };
        assert_eq!(
            err.user_friendly_message(),
            "Invalid setting monitor.poll_interval_secs: Value must be at least 1"
        );
    }
}
