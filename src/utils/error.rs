use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    HttpStatusError { url: String, status: u16 },

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

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Request blocked by captcha page: {url}")]
    BlockedError { url: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Parsing,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ScrapeError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
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
            Self::HttpError(_) | Self::HttpStatusError { .. } | Self::BlockedError { .. } => {
                ErrorCategory::Network
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::SerializationError(_) | Self::CsvError(_) => ErrorCategory::Parsing,
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::Storage,
            Self::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Parsing => ErrorSeverity::Low,
            ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// 可重試的錯誤：逾時、連線失敗、429/5xx 與驗證碼頁面
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::HttpStatusError { status, .. } => *status == 429 || *status >= 500,
            Self::BlockedError { .. } => true,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::HttpError(_) => "Check the network connection and the base URL template",
            Self::HttpStatusError { .. } => {
                "The site rejected the request; lower concurrent_requests or raise retry_delay_seconds"
            }
            Self::BlockedError { .. } => {
                "Amazon served a captcha; wait before retrying or change the user agent"
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => {
                "Fix the configuration file and run again"
            }
            Self::MissingConfigError { .. } => "Add the missing key to the configuration file",
            Self::IoError(_) | Self::ZipError(_) => {
                "Check that the target folder exists and is writable"
            }
            Self::CsvError(_) | Self::SerializationError(_) => {
                "Inspect the scraped data for unexpected content"
            }
            Self::ProcessingError { .. } => "Run with --verbose for more details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not load a page: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Parsing => format!("Could not read scraped data: {}", self),
            ErrorCategory::Storage => format!("Could not write output: {}", self),
            ErrorCategory::Processing => format!("Scraping failed: {}", self),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_retryability() {
        let throttled = ScrapeError::HttpStatusError {
            url: "https://www.amazon.com/s".to_string(),
            status: 503,
        };
        assert!(throttled.is_retryable());

        let missing = ScrapeError::HttpStatusError {
            url: "https://www.amazon.com/dp/X".to_string(),
            status: 404,
        };
        assert!(!missing.is_retryable());
        assert_eq!(missing.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_exit_codes_follow_severity() {
        let err = ScrapeError::MissingConfigError {
            field: "payload.target_folder".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_code(), 3);
        assert!(err.user_friendly_message().starts_with("Configuration problem"));

        assert_eq!(ScrapeError::processing("boom").exit_code(), 1);
    }
}
