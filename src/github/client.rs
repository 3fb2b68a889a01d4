//! GitHub REST API client.
//!
//! Every request carries a bearer token (when configured), a `User-Agent`
//! and the API version header. Requests are bounded by the client timeout.
//! Read-only calls go through [`GitHubClient::with_retry`]; the git-data
//! write calls are sent exactly once.

use std::future::Future;
use std::time::Duration;

use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult};
use super::types::{
    BranchHead, CommitResponse, ContentEntry, ContentsResponse, CreateBlobRequest,
    CreateCommitRequest, CreateTreeRequest, ErrorBody, RefResponse, ShaOnly, TreeEntry,
    UpdateRefRequest,
};
use super::GitHost;

/// Base delay for GET retries; doubled per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Upper bound for a single backoff sleep.
const RETRY_MAX_DELAY: Duration = Duration::from_secs(8);

/// Connection settings for [`GitHubClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// REST API root, e.g. `https://api.github.com`.
    pub api_base: String,
    /// Raw content root, e.g. `https://raw.githubusercontent.com`.
    pub raw_base: String,
    pub owner: String,
    pub repo: String,
    pub token: Option<String>,
    pub timeout: Duration,
    /// Extra attempts for idempotent GETs.
    pub max_retries: u32,
}

/// Client for the GitHub REST API.
pub struct GitHubClient {
    client: reqwest::Client,
    settings: ClientSettings,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.settings.api_base)
            .field("owner", &self.settings.owner)
            .field("repo", &self.settings.repo)
            .finish_non_exhaustive()
    }
}

/// User agent sent with every request.
pub const CLIENT_AGENT: &str = concat!("assetsync/", env!("CARGO_PKG_VERSION"));

impl GitHubClient {
    /// Build a client from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// underlying HTTP client cannot be constructed.
    pub fn new(settings: ClientSettings) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));

        if let Some(token) = settings.token.as_deref() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ApiError::Unauthorized {
                    status: 0,
                    message: "token contains characters not allowed in a header".to_string(),
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    /// `{api_base}/repos/{owner}/{repo}/{segments...}`
    fn api_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> ApiResult<Url> {
        let mut url = Url::parse(&self.settings.api_base)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", self.settings.api_base)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.settings.api_base.clone()))?
            .pop_if_empty()
            .extend(["repos", self.settings.owner.as_str(), self.settings.repo.as_str()])
            .extend(segments);
        Ok(url)
    }

    /// Directory contents URL with each path segment percent-encoded.
    fn contents_url(&self, git_ref: &str, path: &str) -> ApiResult<Url> {
        let mut url = self.api_url(
            std::iter::once("contents").chain(path.split('/').filter(|s| !s.is_empty())),
        )?;
        url.query_pairs_mut().append_pair("ref", git_ref);
        Ok(url)
    }

    /// Raw download URL: `{raw_base}/{owner}/{repo}/{ref}/{path}`.
    pub fn raw_url(&self, git_ref: &str, path: &str) -> ApiResult<Url> {
        let mut url = Url::parse(&self.settings.raw_base)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", self.settings.raw_base)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.settings.raw_base.clone()))?
            .pop_if_empty()
            .extend([self.settings.owner.as_str(), self.settings.repo.as_str()])
            .extend(git_ref.split('/').filter(|s| !s.is_empty()))
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    /// Run an idempotent request, retrying transient failures with
    /// exponential backoff.
    async fn with_retry<T, F, Fut>(&self, what: &str, op: F) -> ApiResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.settings.max_retries => {
                    let delay = RETRY_BASE_DELAY
                        .saturating_mul(2u32.saturating_pow(attempt))
                        .min(RETRY_MAX_DELAY);
                    warn!(what, attempt = attempt + 1, error = %e, ?delay, "Retrying request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> ApiResult<T> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        let response = check_status(response, url).await?;
        Ok(response.json().await?)
    }

    async fn send_json<B, T>(&self, method: reqwest::Method, url: &Url, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%method, %url, "write request");
        let response = self
            .client
            .request(method, url.clone())
            .json(body)
            .send()
            .await?;
        let response = check_status(response, url).await?;
        Ok(response.json().await?)
    }
}

/// Map non-success statuses onto [`ApiError`].
async fn check_status(response: Response, url: &Url) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                == Some("0"));
    if rate_limited {
        let reset = response
            .headers()
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(ApiError::RateLimited { reset });
    }

    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(url.path().to_string()));
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or(text);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Unauthorized {
            status: status.as_u16(),
            message,
        });
    }

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

impl GitHost for GitHubClient {
    async fn list_contents(&self, git_ref: &str, path: &str) -> ApiResult<Vec<ContentEntry>> {
        let url = self.contents_url(git_ref, path)?;
        self.with_retry("list contents", || async {
            let response: ContentsResponse = self.get_json(&url).await?;
            Ok(response.into_entries())
        })
        .await
    }

    async fn download_raw(&self, git_ref: &str, path: &str) -> ApiResult<Vec<u8>> {
        let url = self.raw_url(git_ref, path)?;
        self.with_retry("download", || async {
            debug!(%url, "GET raw");
            let response = self.client.get(url.clone()).send().await?;
            let response = check_status(response, &url).await?;
            Ok(response.bytes().await?.to_vec())
        })
        .await
    }

    async fn branch_head(&self, branch: &str) -> ApiResult<BranchHead> {
        let ref_url = self.api_url(
            ["git", "ref", "heads"]
                .into_iter()
                .chain(branch.split('/').filter(|s| !s.is_empty())),
        )?;
        let reference: RefResponse = self
            .with_retry("resolve ref", || self.get_json(&ref_url))
            .await?;

        let commit_url = self.api_url(["git", "commits", reference.object.sha.as_str()])?;
        let commit: CommitResponse = self
            .with_retry("resolve commit", || self.get_json(&commit_url))
            .await?;

        Ok(BranchHead {
            commit_sha: reference.object.sha,
            tree_sha: commit.tree.sha,
        })
    }

    async fn create_blob(&self, content: &[u8]) -> ApiResult<String> {
        let url = self.api_url(["git", "blobs"])?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);
        let body = CreateBlobRequest {
            content: &encoded,
            encoding: "base64",
        };
        let created: ShaOnly = self.send_json(reqwest::Method::POST, &url, &body).await?;
        Ok(created.sha)
    }

    async fn create_tree(&self, base_tree: &str, entries: &[TreeEntry]) -> ApiResult<String> {
        let url = self.api_url(["git", "trees"])?;
        let body = CreateTreeRequest {
            base_tree,
            tree: entries,
        };
        let created: ShaOnly = self.send_json(reqwest::Method::POST, &url, &body).await?;
        Ok(created.sha)
    }

    async fn create_commit(&self, message: &str, tree_sha: &str, parent_sha: &str) -> ApiResult<String> {
        let url = self.api_url(["git", "commits"])?;
        let body = CreateCommitRequest {
            message,
            tree: tree_sha,
            parents: [parent_sha],
        };
        let created: ShaOnly = self.send_json(reqwest::Method::POST, &url, &body).await?;
        Ok(created.sha)
    }

    async fn update_ref(&self, branch: &str, commit_sha: &str) -> ApiResult<()> {
        let url = self.api_url(
            ["git", "refs", "heads"]
                .into_iter()
                .chain(branch.split('/').filter(|s| !s.is_empty())),
        )?;
        let body = UpdateRefRequest {
            sha: commit_sha,
            force: true,
        };
        let _: RefResponse = self.send_json(reqwest::Method::PATCH, &url, &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ClientSettings {
        ClientSettings {
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            owner: "acme".to_string(),
            repo: "game".to_string(),
            token: Some("ghp_test".to_string()),
            timeout: Duration::from_secs(5),
            max_retries: 2,
        }
    }

    #[test]
    fn test_contents_url_encodes_segments() {
        let client = GitHubClient::new(settings()).unwrap();
        let url = client.contents_url("main", "Assets/My Scene/level 1.unity").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/game/contents/Assets/My%20Scene/level%201.unity?ref=main"
        );
    }

    #[test]
    fn test_contents_url_root() {
        let client = GitHubClient::new(settings()).unwrap();
        let url = client.contents_url("dev", "").unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/acme/game/contents?ref=dev");
    }

    #[test]
    fn test_raw_url_layout() {
        let client = GitHubClient::new(settings()).unwrap();
        let url = client.raw_url("main", "Assets/a.txt").unwrap();
        assert_eq!(
            url.as_str(),
            "https://raw.githubusercontent.com/acme/game/main/Assets/a.txt"
        );
    }

    #[test]
    fn test_api_url_tolerates_trailing_slash() {
        let mut s = settings();
        s.api_base = "https://ghe.example.com/api/v3/".to_string();
        let client = GitHubClient::new(s).unwrap();
        let url = client.api_url(["git", "blobs"]).unwrap();
        assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/repos/acme/game/git/blobs");
    }

    #[test]
    fn test_invalid_base_url() {
        let mut s = settings();
        s.api_base = "not a url".to_string();
        let client = GitHubClient::new(s).unwrap();
        assert!(matches!(client.api_url(["git"]), Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = GitHubClient::new(settings()).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("ghp_test"));
    }
}
