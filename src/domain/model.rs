use crate::utils::error::{AppError, EnumerationError, Result};
use std::fmt;

/// Account name and secret as read from configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountCredential {
    pub account_name: String,
    pub secret: String,
}

impl AccountCredential {
    pub fn new(account_name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            secret: secret.into(),
        }
    }
}

// 不輸出密鑰
impl fmt::Debug for AccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredential")
            .field("account_name", &self.account_name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// The container a listing targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    account_name: String,
    container_name: String,
}

impl ContainerRef {
    pub fn new(account_name: impl Into<String>, container_name: impl Into<String>) -> Result<Self> {
        let account_name = account_name.into();
        let container_name = container_name.into();

        if account_name.trim().is_empty() {
            return Err(AppError::ValidationError {
                message: "container reference needs a non-empty account name".to_string(),
            });
        }
        if container_name.trim().is_empty() {
            return Err(AppError::ValidationError {
                message: format!("account '{}' has an empty container name", account_name),
            });
        }

        Ok(Self {
            account_name,
            container_name,
        })
    }

    /// 每個帳號對應一個同名容器
    pub fn for_account(account_name: &str) -> Result<Self> {
        Self::new(account_name, account_name)
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }
}

/// Server-issued listing cursor. The token inside `More` is echoed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContinuationState {
    #[default]
    Start,
    More(String),
    Done,
}

impl ContinuationState {
    /// Empty or missing `NextMarker` both end the listing.
    pub fn from_next_marker(marker: Option<String>) -> Self {
        match marker {
            Some(token) if !token.is_empty() => ContinuationState::More(token),
            _ => ContinuationState::Done,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            ContinuationState::More(token) => Some(token),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ContinuationState::Done)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRecord {
    pub name: String,
}

impl BlobRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One decoded listing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPage {
    pub blobs: Vec<BlobRecord>,
    pub next: ContinuationState,
}

/// Everything one enumeration produced, plus how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumerationResult {
    pub blobs: Vec<BlobRecord>,
    pub error: Option<EnumerationError>,
}

impl EnumerationResult {
    /// `false` means the inventory is unknown, even if some blobs were delivered.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.is_complete() && self.blobs.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.blobs.iter().map(|b| b.name.as_str()).collect()
    }
}
