use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Input error: {message}")]
    InputError { message: String },

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

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Processing,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InputError { .. } | Self::SerializationError(_) => ErrorCategory::Input,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::ProcessingError { .. } => ErrorCategory::Processing,
            Self::ZipError(_) | Self::CsvError(_) | Self::IoError(_) => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Input => ErrorSeverity::Critical,
            ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Output => ErrorSeverity::Medium,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::InputError { .. } | Self::SerializationError(_) => {
                "Check that the input file exists and contains a top-level 'notices' array".to_string()
            }
            Self::IoError(_) => "Check file paths and permissions".to_string(),
            Self::CsvError(_) | Self::ZipError(_) => {
                "Check that the output directory is writable and has free space".to_string()
            }
            Self::ConfigError { .. } => "Check the --config path and file permissions".to_string(),
            Self::ConfigValidationError { .. } => {
                "Review the TOML configuration file syntax".to_string()
            }
            Self::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}' and try again", field)
            }
            Self::ProcessingError { .. } => "Re-run with --verbose for more details".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Could not read the notice dataset: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
            ErrorCategory::Output => format!("Could not write reports: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
