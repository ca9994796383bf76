use crate::domain::model::AccountCredential;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::ConfigLoadError;
use crate::utils::validation::{self, Validate, ValidationResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub storage_accounts: Vec<StorageAccountConfig>,
}

/// 全域設定。郵件欄位目前只讀取不使用
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub logfile_directory: String,
    #[serde(default)]
    pub sendgrid_api_key: String,
    #[serde(default)]
    pub to_mail: Vec<String>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageAccountConfig {
    pub storage_account_name: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub client_id: String,
    /// Base64 storage account key used for Shared Key signing.
    pub client_secret: String,
    pub dl_path: String,
    pub endpoint: Option<String>,
    pub max_results: Option<u32>,
}

impl StorageAccountConfig {
    pub fn credential(&self) -> AccountCredential {
        AccountCredential::new(&self.storage_account_name, &self.client_secret)
    }
}

impl AppConfig {
    /// 從 YAML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// 從 YAML 字串解析配置
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigLoadError> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(serde_yaml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${SENDGRID_API_KEY})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<regex::Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var pattern")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn account(&self, name: &str) -> Option<&StorageAccountConfig> {
        self.storage_accounts
            .iter()
            .find(|account| account.storage_account_name == name)
    }
}

impl ConfigProvider for AppConfig {
    fn storage_accounts(&self) -> &[StorageAccountConfig] {
        &self.storage_accounts
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.global.request_timeout_seconds.map(Duration::from_secs)
    }
}

impl Validate for GlobalConfig {
    fn validate(&self) -> ValidationResult {
        if !self.logfile_directory.is_empty() {
            validation::validate_path("global.logfile_directory", &self.logfile_directory)?;
        }
        for address in &self.to_mail {
            validation::validate_email("global.to_mail", address)?;
        }
        if let Some(timeout) = self.request_timeout_seconds {
            validation::validate_positive_number("global.request_timeout_seconds", timeout, 1)?;
        }
        Ok(())
    }
}

impl Validate for StorageAccountConfig {
    fn validate(&self) -> ValidationResult {
        // 密鑰格式交給憑證建立時檢查，單一帳號錯誤不應中止整個流程
        validation::validate_non_empty_string(
            "storage_accounts.storage_account_name",
            &self.storage_account_name,
        )?;
        validation::validate_path("storage_accounts.dl_path", &self.dl_path)?;

        if let Some(endpoint) = &self.endpoint {
            validation::validate_url("storage_accounts.endpoint", endpoint)?;
        }
        if let Some(max_results) = self.max_results {
            validation::validate_positive_number(
                "storage_accounts.max_results",
                u64::from(max_results),
                1,
            )?;
        }
        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> ValidationResult {
        self.global.validate()?;

        if self.storage_accounts.is_empty() {
            return Err(ConfigLoadError::Missing {
                field: "storage_accounts".to_string(),
            });
        }
        for account in &self.storage_accounts {
            account.validate()?;
        }
        Ok(())
    }
}
