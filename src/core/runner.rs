use crate::adapters::azure::{BlobServiceClient, ClientOptions};
use crate::adapters::credential::SharedKeyCredential;
use crate::config::StorageAccountConfig;
use crate::core::enumerator::{collect_all, enumerate};
use crate::domain::model::{ContainerRef, EnumerationResult};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AppError, ErrorSeverity, Result};
use futures::StreamExt;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// 第一個帳號失敗就停止，其餘帳號不處理
    pub fail_fast: bool,
}

#[derive(Debug)]
pub enum AccountStatus {
    /// Listing ran. The result may still carry an error if a page failed.
    Listed(EnumerationResult),
    /// The account never reached the listing step.
    Failed(AppError),
}

#[derive(Debug)]
pub struct AccountOutcome {
    pub account: String,
    pub status: AccountStatus,
}

impl AccountOutcome {
    pub fn is_success(&self) -> bool {
        matches!(&self.status, AccountStatus::Listed(result) if result.is_complete())
    }

    pub fn result(&self) -> Option<&EnumerationResult> {
        match &self.status {
            AccountStatus::Listed(result) => Some(result),
            AccountStatus::Failed(_) => None,
        }
    }

    pub fn blob_count(&self) -> usize {
        self.result().map_or(0, |result| result.blobs.len())
    }

    pub fn severity(&self) -> Option<ErrorSeverity> {
        match &self.status {
            AccountStatus::Listed(result) => listing_error(result).map(|e| e.severity()),
            AccountStatus::Failed(error) => Some(error.severity()),
        }
    }

    pub fn failure_message(&self) -> Option<String> {
        match &self.status {
            AccountStatus::Listed(result) => {
                listing_error(result).map(|e| e.user_friendly_message())
            }
            AccountStatus::Failed(error) => Some(error.user_friendly_message()),
        }
    }
}

/// The error that cut a listing short, if any.
fn listing_error(result: &EnumerationResult) -> Option<AppError> {
    result.error.clone().map(AppError::Enumeration)
}

/// Per-account outcomes in configuration order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<AccountOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn total_blobs(&self) -> usize {
        self.outcomes.iter().map(AccountOutcome::blob_count).sum()
    }

    pub fn outcome(&self, account: &str) -> Option<&AccountOutcome> {
        self.outcomes.iter().find(|o| o.account == account)
    }

    /// 0 when every account listed completely, otherwise the code of the worst failure.
    pub fn exit_code(&self) -> i32 {
        self.outcomes
            .iter()
            .filter_map(AccountOutcome::severity)
            .max()
            .map_or(0, ErrorSeverity::exit_code)
    }
}

pub struct Runner<C: ConfigProvider> {
    config: C,
    options: RunOptions,
}

impl<C: ConfigProvider> Runner<C> {
    pub fn new(config: C) -> Self {
        Self::with_options(config, RunOptions::default())
    }

    pub fn with_options(config: C, options: RunOptions) -> Self {
        Self { config, options }
    }

    pub async fn run(&self) -> RunReport {
        let accounts = self.config.storage_accounts();
        let mut report = RunReport::default();

        tracing::info!("Processing {} storage account(s)", accounts.len());

        for (idx, account) in accounts.iter().enumerate() {
            tracing::info!(
                "📦 Storage account {}/{}: {}",
                idx + 1,
                accounts.len(),
                account.storage_account_name
            );

            let status = match self.list_account(account).await {
                Ok(result) => AccountStatus::Listed(result),
                Err(e) => AccountStatus::Failed(e),
            };
            let outcome = AccountOutcome {
                account: account.storage_account_name.clone(),
                status,
            };
            log_outcome(&outcome);

            let stop = self.options.fail_fast && !outcome.is_success();
            report.outcomes.push(outcome);

            if stop {
                tracing::warn!(
                    "⛔ Fail-fast enabled, skipping {} remaining account(s)",
                    accounts.len() - idx - 1
                );
                break;
            }
        }

        report
    }

    async fn list_account(&self, account: &StorageAccountConfig) -> Result<EnumerationResult> {
        let credential = SharedKeyCredential::try_from(&account.credential())?;
        let container = ContainerRef::for_account(&account.storage_account_name)?;

        let client = BlobServiceClient::new(
            credential,
            ClientOptions {
                endpoint: account.endpoint.clone(),
                timeout: self.config.request_timeout(),
                max_results: account.max_results,
            },
        )?;
        tracing::debug!(
            "Account '{}' using endpoint {}",
            client.account(),
            client.endpoint()
        );

        println!("Blobs in container '{}':", container.container_name());
        let blobs = enumerate(&client, &container).inspect(|item| {
            if let Ok(blob) = item {
                println!("{}", blob.name);
            }
        });

        Ok(collect_all(blobs).await)
    }
}

fn log_outcome(outcome: &AccountOutcome) {
    match &outcome.status {
        AccountStatus::Listed(result) => match &result.error {
            None => tracing::info!(
                "✅ Account '{}' listed {} blob(s)",
                outcome.account,
                result.blobs.len()
            ),
            Some(e) => {
                tracing::error!(
                    "❌ Account '{}' listing incomplete after {} blob(s): {} (Category: {:?})",
                    outcome.account,
                    result.blobs.len(),
                    e,
                    e.category()
                );
                tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            }
        },
        AccountStatus::Failed(e) => {
            tracing::error!(
                "❌ Account '{}' failed: {} (Category: {:?}, Severity: {:?})",
                outcome.account,
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::BlobRecord;
    use crate::utils::error::{EnumerationCause, EnumerationError, InvalidCredentialError};

    fn listed(account: &str, names: &[&str], error: Option<EnumerationError>) -> AccountOutcome {
        AccountOutcome {
            account: account.to_string(),
            status: AccountStatus::Listed(EnumerationResult {
                blobs: names.iter().map(|n| BlobRecord::new(*n)).collect(),
                error,
            }),
        }
    }

    #[test]
    fn test_report_all_successful() {
        let report = RunReport {
            outcomes: vec![listed("acct1", &["a", "b"], None), listed("acct2", &[], None)],
        };

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.total_blobs(), 2);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.outcome("acct2").unwrap().blob_count(), 0);
    }

    #[test]
    fn test_report_exit_code_uses_worst_failure() {
        let partial = listed(
            "acct1",
            &["a"],
            Some(EnumerationError::new(
                "acct1",
                2,
                EnumerationCause::Network("timeout".to_string()),
            )),
        );
        let report = RunReport {
            outcomes: vec![partial, listed("acct2", &["x"], None)],
        };
        assert_eq!(report.failed(), 1);
        assert_eq!(report.total_blobs(), 2);
        assert_eq!(report.exit_code(), 2);
        assert!(report.outcomes[0]
            .failure_message()
            .unwrap()
            .starts_with("Listing of container 'acct1' is incomplete"));

        let bad_credentials = AccountOutcome {
            account: "acct3".to_string(),
            status: AccountStatus::Failed(
                InvalidCredentialError::new("acct3", "secret is empty").into(),
            ),
        };
        assert!(bad_credentials.failure_message().unwrap().contains("acct3"));

        let mut report = report;
        report.outcomes.push(bad_credentials);
        assert_eq!(report.failed(), 2);
        // Credential failures (High) outrank incomplete listings (Medium).
        assert_eq!(report.exit_code(), 1);
    }
}
