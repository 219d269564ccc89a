use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Record '{record}': required field '{field}' is missing")]
    MissingFieldError { record: String, field: String },

    #[error("Record '{record}': field '{field}' value '{value}' is not numeric")]
    TypeError {
        record: String,
        field: String,
        value: String,
    },

    #[error("Record '{record}': field '{field}' value {value} is outside [{min}, {max}]")]
    RangeError {
        record: String,
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Record '{record}': identifier already used by row {first_row}")]
    DuplicateRecordError { record: String, first_row: usize },

    #[error("Record '{record}': {message}")]
    ComputationError { record: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    DataValidation,
    Computation,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskError {
    pub fn config(message: impl Into<String>) -> Self {
        RiskError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RiskError::ConfigError { .. }
            | RiskError::ConfigValidationError { .. }
            | RiskError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            RiskError::MissingFieldError { .. }
            | RiskError::TypeError { .. }
            | RiskError::RangeError { .. }
            | RiskError::DuplicateRecordError { .. }
            | RiskError::CsvError(_) => ErrorCategory::DataValidation,
            RiskError::ComputationError { .. } => ErrorCategory::Computation,
            RiskError::IoError(_) | RiskError::SerializationError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::DataValidation | ErrorCategory::Computation => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// Identifier of the offending record, for errors raised while processing a batch.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            RiskError::MissingFieldError { record, .. }
            | RiskError::TypeError { record, .. }
            | RiskError::RangeError { record, .. }
            | RiskError::DuplicateRecordError { record, .. }
            | RiskError::ComputationError { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RiskError::MissingFieldError { .. } => {
                "Fill in the missing value or remove the row from the input file"
            }
            RiskError::TypeError { .. } => "Make sure numeric columns contain only numbers",
            RiskError::RangeError { .. } => {
                "Check the value for data entry errors or widen the [fields] limits in the config"
            }
            RiskError::DuplicateRecordError { .. } => "Give every patient a unique identifier",
            RiskError::ComputationError { .. } => {
                "Check the physiological inputs; they must be positive to compute the metric"
            }
            RiskError::CsvError(_) => "Check the input file is well-formed CSV with a header row",
            RiskError::ConfigError { .. }
            | RiskError::ConfigValidationError { .. }
            | RiskError::InvalidConfigValueError { .. } => {
                "Review the configuration file; thresholds must be strictly increasing"
            }
            RiskError::IoError(_) => "Check the file exists and the path is readable/writable",
            RiskError::SerializationError(_) => "Report this issue; summary serialization failed",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::DataValidation => format!("Input data rejected: {}", self),
            ErrorCategory::Computation => format!("Metric could not be computed: {}", self),
            ErrorCategory::Io => format!("File operation failed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;
