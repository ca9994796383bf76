//! Azure Blob Storage client for the List Blobs REST call.
//!
//! One [`BlobServiceClient::list_page`] call is one `GET
//! {endpoint}/{container}?restype=container&comp=list` round trip signed with
//! Shared Key. The `NextMarker` returned by the service is handed back as an
//! opaque [`ContinuationState`].

use crate::adapters::credential::SharedKeyCredential;
use crate::domain::model::{BlobPage, BlobRecord, ContainerRef, ContinuationState};
use crate::domain::ports::BlobPageSource;
use crate::utils::error::{AppError, EnumerationCause, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_xml_rs::{EventReader, ParserConfig};
use std::time::Duration;
use url::Url;

/// Azure REST API version used for all requests.
pub const AZURE_API_VERSION: &str = "2023-11-03";

#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Overrides `https://{account}.blob.core.windows.net`, e.g. for Azurite.
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
    /// Page size hint sent as `maxresults`.
    pub max_results: Option<u32>,
}

pub struct BlobServiceClient {
    http: reqwest::Client,
    credential: SharedKeyCredential,
    endpoint: Url,
    max_results: Option<u32>,
}

pub fn default_endpoint(account_name: &str) -> String {
    format!("https://{}.blob.core.windows.net", account_name)
}

impl BlobServiceClient {
    pub fn new(credential: SharedKeyCredential, options: ClientOptions) -> Result<Self> {
        let raw_endpoint = options
            .endpoint
            .unwrap_or_else(|| default_endpoint(credential.account()));

        let endpoint = Url::parse(&raw_endpoint).map_err(|e| AppError::ClientError {
            message: format!("invalid endpoint '{}': {}", raw_endpoint, e),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(AppError::ClientError {
                message: format!("endpoint '{}' cannot address containers", raw_endpoint),
            });
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        tracing::debug!(
            "Blob service client ready: account={} endpoint={}",
            credential.account(),
            endpoint
        );

        Ok(Self {
            http,
            credential,
            endpoint,
            max_results: options.max_results,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn account(&self) -> &str {
        self.credential.account()
    }

    /// Query parameters of a list request, sorted by name.
    fn list_query(&self, state: &ContinuationState) -> Vec<(&'static str, String)> {
        let mut query = vec![("comp", "list".to_string())];
        if let Some(token) = state.token() {
            query.push(("marker", token.to_string()));
        }
        if let Some(max_results) = self.max_results {
            query.push(("maxresults", max_results.to_string()));
        }
        query.push(("restype", "container".to_string()));
        query
    }

    fn container_url(&self, container: &ContainerRef, query: &[(&str, String)]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(container.container_name());
        }
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(name, value)| (*name, value.as_str())));
        url
    }

    fn canonicalized_resource(&self, url: &Url, query: &[(&str, String)]) -> String {
        let mut resource = format!("/{}{}", self.credential.account(), url.path());
        for (name, value) in query {
            resource.push_str(&format!("\n{}:{}", name, value));
        }
        resource
    }
}

#[async_trait]
impl BlobPageSource for BlobServiceClient {
    async fn list_page(
        &self,
        container: &ContainerRef,
        state: &ContinuationState,
    ) -> std::result::Result<BlobPage, EnumerationCause> {
        let query = self.list_query(state);
        let url = self.container_url(container, &query);
        let date = rfc1123_date();

        let authorization = self.credential.sign(
            "GET",
            &[("x-ms-date", date.as_str()), ("x-ms-version", AZURE_API_VERSION)],
            &self.canonicalized_resource(&url, &query),
        );

        tracing::debug!("Listing {} (marker: {:?})", url.path(), state.token());

        let response = self
            .http
            .get(url)
            .header("x-ms-date", &date)
            .header("x-ms-version", AZURE_API_VERSION)
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| EnumerationCause::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let header_code = response
                .headers()
                .get("x-ms-error-code")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_response(status, header_code, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EnumerationCause::Network(e.to_string()))?;

        parse_list_response(&body)
    }
}

fn rfc1123_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResultsXml {
    #[serde(default)]
    blobs: BlobsXml,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobsXml {
    #[serde(rename = "Blob", default)]
    items: Vec<BlobXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobXml {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorXml {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn strip_bom(body: &str) -> &str {
    body.trim_start_matches('\u{feff}').trim()
}

/// Decodes an `EnumerationResults` body, keeping the service's blob order.
///
/// Text content is not trimmed: blob names may begin or end with spaces.
pub fn parse_list_response(body: &str) -> std::result::Result<BlobPage, EnumerationCause> {
    let config = ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(false)
        .cdata_to_characters(true)
        .ignore_comments(true)
        .coalesce_characters(true);
    let reader = EventReader::new_with_config(strip_bom(body).as_bytes(), config);

    let parsed = EnumerationResultsXml::deserialize(&mut serde_xml_rs::Deserializer::new(reader))
        .map_err(|e| EnumerationCause::Service {
            status: StatusCode::OK.as_u16(),
            code: "InvalidXmlResponse".to_string(),
            message: format!("could not decode listing: {}", e),
        })?;

    let blobs = parsed
        .blobs
        .items
        .into_iter()
        .map(|blob| BlobRecord::new(blob.name))
        .collect();

    Ok(BlobPage {
        blobs,
        next: ContinuationState::from_next_marker(parsed.next_marker),
    })
}

pub fn map_error_response(
    status: StatusCode,
    header_code: Option<String>,
    body: &str,
) -> EnumerationCause {
    let error: ErrorXml = if strip_bom(body).is_empty() {
        ErrorXml::default()
    } else {
        serde_xml_rs::from_str(strip_bom(body)).unwrap_or_default()
    };

    let code = error
        .code
        .or(header_code)
        .unwrap_or_else(|| "Unknown".to_string());
    let message = error
        .message
        .map(|m| m.lines().next().unwrap_or_default().to_string())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EnumerationCause::Authorization {
            status: status.as_u16(),
            message: format!("{}: {}", code, message),
        },
        StatusCode::NOT_FOUND => EnumerationCause::ContainerNotFound,
        _ => EnumerationCause::Service {
            status: status.as_u16(),
            code,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "dW5pdC10ZXN0LWFjY291bnQta2V5";

    fn client(options: ClientOptions) -> BlobServiceClient {
        let credential = SharedKeyCredential::new("acct1", TEST_KEY).unwrap();
        BlobServiceClient::new(credential, options).unwrap()
    }

    #[test]
    fn test_parse_page_with_marker() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://acct1.blob.core.windows.net/" ContainerName="acct1">
  <MaxResults>2</MaxResults>
  <Blobs>
    <Blob><Name>b.txt</Name><Properties><Content-Length>3</Content-Length></Properties></Blob>
    <Blob><Name>a.txt</Name><Properties><Content-Length>7</Content-Length></Properties></Blob>
  </Blobs>
  <NextMarker>2!72!MDAwMDA1IWMudHh0</NextMarker>
</EnumerationResults>"#;

        let page = parse_list_response(body).unwrap();

        // Service order is kept, not sorted.
        assert_eq!(
            page.blobs,
            vec![BlobRecord::new("b.txt"), BlobRecord::new("a.txt")]
        );
        assert_eq!(
            page.next,
            ContinuationState::More("2!72!MDAwMDA1IWMudHh0".to_string())
        );
    }

    #[test]
    fn test_parse_last_page() {
        let body = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\
<EnumerationResults ContainerName=\"acct1\"><Blobs><Blob><Name>dir/c &amp; d.txt</Name></Blob></Blobs><NextMarker /></EnumerationResults>";

        let page = parse_list_response(body).unwrap();
        assert_eq!(page.blobs, vec![BlobRecord::new("dir/c & d.txt")]);
        assert!(page.next.is_done());
    }

    #[test]
    fn test_parse_keeps_padding_in_names() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ContainerName="acct1">
  <Blobs>
    <Blob><Name>  padded name.txt </Name></Blob>
    <Blob><Name>padded name.txt</Name></Blob>
  </Blobs>
  <NextMarker />
</EnumerationResults>"#;

        let page = parse_list_response(body).unwrap();
        assert_eq!(
            page.blobs,
            vec![
                BlobRecord::new("  padded name.txt "),
                BlobRecord::new("padded name.txt")
            ]
        );
        assert!(page.next.is_done());
    }

    #[test]
    fn test_parse_empty_container() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?><EnumerationResults ContainerName="acct2"><Blobs /><NextMarker /></EnumerationResults>"#;

        let page = parse_list_response(body).unwrap();
        assert!(page.blobs.is_empty());
        assert!(page.next.is_done());
    }

    #[test]
    fn test_parse_garbage_is_service_error() {
        let cause = parse_list_response("upstream gateway timeout").unwrap_err();
        match cause {
            EnumerationCause::Service { status, code, .. } => {
                assert_eq!(status, 200);
                assert_eq!(code, "InvalidXmlResponse");
            }
            other => panic!("unexpected cause: {:?}", other),
        }
    }

    #[test]
    fn test_map_error_statuses() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?><Error><Code>AuthenticationFailed</Code><Message>Server failed to authenticate the request.
RequestId:abc</Message></Error>"#;

        assert_eq!(
            map_error_response(StatusCode::FORBIDDEN, None, body),
            EnumerationCause::Authorization {
                status: 403,
                message: "AuthenticationFailed: Server failed to authenticate the request."
                    .to_string(),
            }
        );
        assert_eq!(
            map_error_response(
                StatusCode::NOT_FOUND,
                Some("ContainerNotFound".to_string()),
                ""
            ),
            EnumerationCause::ContainerNotFound
        );
        assert_eq!(
            map_error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                Some("ServerBusy".to_string()),
                ""
            ),
            EnumerationCause::Service {
                status: 503,
                code: "ServerBusy".to_string(),
                message: "Service Unavailable".to_string(),
            }
        );
    }

    #[test]
    fn test_default_endpoint_url() {
        let client = client(ClientOptions::default());
        let container = ContainerRef::for_account("acct1").unwrap();
        let query = client.list_query(&ContinuationState::Start);
        let url = client.container_url(&container, &query);

        assert_eq!(
            url.as_str(),
            "https://acct1.blob.core.windows.net/acct1?comp=list&restype=container"
        );
        assert_eq!(
            client.canonicalized_resource(&url, &query),
            "/acct1/acct1\ncomp:list\nrestype:container"
        );
    }

    #[test]
    fn test_marker_and_page_size_in_query() {
        let client = client(ClientOptions {
            endpoint: Some("http://127.0.0.1:10000/acct1".to_string()),
            timeout: None,
            max_results: Some(2),
        });
        let container = ContainerRef::for_account("acct1").unwrap();
        let state = ContinuationState::More("2!72!a/b=".to_string());
        let query = client.list_query(&state);
        let url = client.container_url(&container, &query);

        assert_eq!(url.path(), "/acct1/acct1");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("comp".to_string(), "list".to_string()),
                ("marker".to_string(), "2!72!a/b=".to_string()),
                ("maxresults".to_string(), "2".to_string()),
                ("restype".to_string(), "container".to_string()),
            ]
        );
        assert_eq!(
            client.canonicalized_resource(&url, &query),
            "/acct1/acct1/acct1\ncomp:list\nmarker:2!72!a/b=\nmaxresults:2\nrestype:container"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let credential = SharedKeyCredential::new("acct1", TEST_KEY).unwrap();
        let result = BlobServiceClient::new(
            credential,
            ClientOptions {
                endpoint: Some("not a url".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(AppError::ClientError { .. })));
    }
}
