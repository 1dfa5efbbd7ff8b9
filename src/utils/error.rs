use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

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

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Parameter '{name}' is invalid: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Parameter '{name}' has no value")]
    MissingParameter { name: String },

    #[error("Cannot convert from '{from}' to '{to}'")]
    UnitMismatch { from: String, to: String },

    #[error("Malformed {format} data: {message}")]
    DataFormatError { format: String, message: String },

    #[error("Pattern {0} not found")]
    PatternNotFound(u32),

    #[error("Calculator '{stage}' failed: {details}")]
    CalculatorError { stage: String, details: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Io,
    Data,
    Computation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit status for a failed command; never 0.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl SimError {
    pub fn config(message: impl Into<String>) -> Self {
        SimError::ConfigError {
            message: message.into(),
        }
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn data_format(format: impl Into<String>, message: impl Into<String>) -> Self {
        SimError::DataFormatError {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SimError::ConfigError { .. }
            | SimError::ConfigValidationError { .. }
            | SimError::InvalidConfigValueError { .. }
            | SimError::MissingConfigError { .. }
            | SimError::InvalidParameter { .. }
            | SimError::MissingParameter { .. }
            | SimError::UnitMismatch { .. } => ErrorCategory::Configuration,
            SimError::IoError(_) => ErrorCategory::Io,
            SimError::ZipError(_)
            | SimError::CsvError(_)
            | SimError::SerializationError(_)
            | SimError::DataFormatError { .. }
            | SimError::PatternNotFound(_) => ErrorCategory::Data,
            SimError::CalculatorError { .. } => ErrorCategory::Computation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Data => ErrorSeverity::Medium,
            ErrorCategory::Io => ErrorSeverity::Critical,
            ErrorCategory::Computation => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SimError::UnitMismatch { .. } => {
                "Use a unit of the same dimension as the parameter (length, time, energy or angle)"
            }
            SimError::InvalidParameter { .. } | SimError::MissingParameter { .. } => {
                "Run `simex params <kind>` to list parameters with their units and comments"
            }
            SimError::PatternNotFound(_) => "List available pattern indices with `simex diffr <file>`",
            SimError::IoError(_) => "Check that the path exists and is writable",
            SimError::CalculatorError { .. } => "Re-run with --verbose to see the failing stage",
            _ => match self.category() {
                ErrorCategory::Configuration => "Check the instrument TOML file against the documented layout",
                ErrorCategory::Data => "The input file may be truncated or written by an incompatible tool",
                _ => "Re-run with --verbose for details",
            },
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Io => format!("File system problem: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
            ErrorCategory::Computation => format!("Simulation failed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
