//! Shared Key credentials for Azure Blob Storage.
//!
//! A credential is built from the storage account name and the base64
//! account key. Building it never touches the network; a malformed name or
//! key is rejected up front with [`InvalidCredentialError`].

use crate::domain::model::AccountCredential;
use crate::utils::error::InvalidCredentialError;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    mac: HmacSha256,
}

impl SharedKeyCredential {
    pub fn new(account_name: &str, secret: &str) -> Result<Self, InvalidCredentialError> {
        validate_account_name(account_name)?;

        if secret.trim().is_empty() {
            return Err(InvalidCredentialError::new(account_name, "secret is empty"));
        }

        let key_bytes = BASE64_STANDARD.decode(secret.trim()).map_err(|e| {
            InvalidCredentialError::new(account_name, format!("secret is not valid base64: {}", e))
        })?;

        let mac = HmacSha256::new_from_slice(&key_bytes).map_err(|e| {
            InvalidCredentialError::new(account_name, format!("unusable signing key: {}", e))
        })?;

        Ok(Self {
            account: account_name.to_string(),
            mac,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Builds the `Authorization` header value for a request without a body.
    ///
    /// `ms_headers` are the `x-ms-*` headers sent with the request and
    /// `canonicalized_resource` is `/{account}{path}` followed by the sorted
    /// `\nname:value` query parameters.
    pub fn sign(&self, method: &str, ms_headers: &[(&str, &str)], canonicalized_resource: &str) -> String {
        let mut headers: Vec<(String, &str)> = ms_headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
            .collect();
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let canonicalized_headers = headers
            .iter()
            .map(|(name, value)| format!("{}:{}", name, value))
            .collect::<Vec<_>>()
            .join("\n");

        // VERB 之後是 11 個空白的標準標頭欄位
        let string_to_sign = format!(
            "{}\n\n\n\n\n\n\n\n\n\n\n\n{}\n{}",
            method, canonicalized_headers, canonicalized_resource
        );

        let mut mac = self.mac.clone();
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        format!("SharedKey {}:{}", self.account, signature)
    }
}

impl TryFrom<&AccountCredential> for SharedKeyCredential {
    type Error = InvalidCredentialError;

    fn try_from(credential: &AccountCredential) -> Result<Self, Self::Error> {
        Self::new(&credential.account_name, &credential.secret)
    }
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Storage account names are 3-24 lowercase letters and digits.
fn validate_account_name(account_name: &str) -> Result<(), InvalidCredentialError> {
    if account_name.is_empty() {
        return Err(InvalidCredentialError::new(account_name, "account name is empty"));
    }

    let valid_chars = account_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !valid_chars || !(3..=24).contains(&account_name.len()) {
        return Err(InvalidCredentialError::new(
            account_name,
            "account name must be 3-24 lowercase letters or digits",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    // base64("unit-test-account-key")
    const TEST_KEY: &str = "dW5pdC10ZXN0LWFjY291bnQta2V5";

    #[test]
    fn test_empty_secret_is_rejected() {
        let err = SharedKeyCredential::new("acct1", "").unwrap_err();
        assert_eq!(err.account, "acct1");
        assert_eq!(err.reason, "secret is empty");

        assert_err!(SharedKeyCredential::new("acct1", "   "));
    }

    #[test]
    fn test_secret_must_be_base64() {
        let err = SharedKeyCredential::new("acct1", "not base64 at all!").unwrap_err();
        assert!(err.reason.contains("base64"));
    }

    #[test]
    fn test_account_name_rules() {
        assert_ok!(SharedKeyCredential::new("acct1", TEST_KEY));
        assert_ok!(SharedKeyCredential::new("devstoreaccount1", TEST_KEY));
        assert_err!(SharedKeyCredential::new("", TEST_KEY));
        assert_err!(SharedKeyCredential::new("ab", TEST_KEY));
        assert_err!(SharedKeyCredential::new("Acct1", TEST_KEY));
        assert_err!(SharedKeyCredential::new("acct-1", TEST_KEY));
        assert_err!(SharedKeyCredential::new(&"a".repeat(25), TEST_KEY));
    }

    #[test]
    fn test_from_account_credential() {
        let credential = AccountCredential::new("acct1", TEST_KEY);
        let shared = SharedKeyCredential::try_from(&credential).unwrap();
        assert_eq!(shared.account(), "acct1");
        assert!(!format!("{:?}", shared).contains(TEST_KEY));
    }

    #[test]
    fn test_sign_list_request() {
        let credential = SharedKeyCredential::new("acct1", TEST_KEY).unwrap();

        // Headers are sorted and lowercased before signing.
        let header = credential.sign(
            "GET",
            &[
                ("x-ms-version", "2023-11-03"),
                ("X-MS-DATE", "Tue, 01 Sep 2026 10:00:00 GMT"),
            ],
            "/acct1/acct1\ncomp:list\nrestype:container",
        );

        assert_eq!(
            header,
            "SharedKey acct1:VCiGboXdHWYmK3UlS5/IOlYfZ7Iddw4Ia8ZuUmHGb3I="
        );
    }
}
