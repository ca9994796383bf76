use thiserror::Error;

/// 憑證格式錯誤，在任何網路請求之前發生
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid credentials for account '{account}': {reason}")]
pub struct InvalidCredentialError {
    pub account: String,
    pub reason: String,
}

impl InvalidCredentialError {
    pub fn new(account: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            reason: reason.into(),
        }
    }
}

/// 單次 list page 請求失敗的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnumerationCause {
    #[error("network error: {0}")]
    Network(String),

    #[error("authorization failed (HTTP {status}): {message}")]
    Authorization { status: u16, message: String },

    #[error("container not found")]
    ContainerNotFound,

    #[error("service error (HTTP {status}, {code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },
}

/// A failed page request. Ends the enumeration it belongs to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Listing container '{container}' failed on page {page}: {cause}")]
pub struct EnumerationError {
    pub container: String,
    pub page: usize,
    #[source]
    pub cause: EnumerationCause,
}

impl EnumerationError {
    pub fn new(container: impl Into<String>, page: usize, cause: EnumerationCause) -> Self {
        Self {
            container: container.into(),
            page,
            cause,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    #[error(transparent)]
    Credential(#[from] InvalidCredentialError),

    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    #[error("HTTP client error: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Client setup error: {message}")]
    ClientError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Network,
    Service,
}

/// 嚴重程度，由低到高排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 根據錯誤嚴重程度決定退出碼
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl EnumerationError {
    pub fn category(&self) -> ErrorCategory {
        match self.cause {
            EnumerationCause::Network(_) => ErrorCategory::Network,
            EnumerationCause::Authorization { .. } => ErrorCategory::Authentication,
            EnumerationCause::ContainerNotFound | EnumerationCause::Service { .. } => {
                ErrorCategory::Service
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.cause {
            EnumerationCause::Network(_) => {
                "Check network connectivity to the storage endpoint and run again"
            }
            EnumerationCause::Authorization { .. } => {
                "Verify that client_secret holds the current storage account key"
            }
            EnumerationCause::ContainerNotFound => {
                "Create a container named after the storage account, or fix storage_account_name"
            }
            EnumerationCause::Service { .. } => {
                "The storage service rejected the listing; inspect the error code and retry later"
            }
        }
    }
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Config(_) | AppError::ValidationError { .. } => ErrorCategory::Configuration,
            AppError::Credential(_) => ErrorCategory::Authentication,
            AppError::Enumeration(e) => e.category(),
            AppError::ApiError(_) | AppError::ClientError { .. } => ErrorCategory::Network,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Config(_) => ErrorSeverity::Critical,
            AppError::Credential(_)
            | AppError::ValidationError { .. }
            | AppError::ClientError { .. } => ErrorSeverity::High,
            AppError::Enumeration(_) | AppError::ApiError(_) => ErrorSeverity::Medium,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AppError::Config(ConfigLoadError::Read { .. }) => {
                "Make sure the config file exists and is readable (see --config)"
            }
            AppError::Config(ConfigLoadError::Parse(_)) => {
                "Check the YAML syntax: 'global' and 'storage_accounts' sections are required"
            }
            AppError::Config(_) | AppError::ValidationError { .. } => {
                "Fix the reported configuration field and run again"
            }
            AppError::Credential(_) => {
                "client_secret must be the base64 storage account key for that account"
            }
            AppError::Enumeration(e) => e.recovery_suggestion(),
            AppError::ApiError(_) | AppError::ClientError { .. } => {
                "Check the account endpoint and TLS settings"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::Config(e) => format!("Could not load configuration: {}", e),
            AppError::Credential(e) => format!(
                "Storage account '{}' has unusable credentials: {}",
                e.account, e.reason
            ),
            AppError::Enumeration(e) => format!(
                "Listing of container '{}' is incomplete: {}",
                e.container, e.cause
            ),
            other => other.to_string(),
        }
    }
}
