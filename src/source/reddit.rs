//! Reddit API client.
//!
//! Authenticates with the OAuth2 password grant (script apps) and reads
//! the `/r/{subreddit}/new` listing. The bearer token is cached and
//! refreshed shortly before it expires, or right after a 401.

use super::PostSource;
use crate::error::{ConfigError, FetchError};
use crate::models::Post;
use futures::future::BoxFuture;
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
pub const ENV_USERNAME: &str = "REDDIT_USERNAME";
pub const ENV_PASSWORD: &str = "REDDIT_PASSWORD";

/// Largest page the listing endpoint will return.
pub const MAX_FETCH_LIMIT: u32 = 100;

/// Refresh the token this long before Reddit says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Script-app credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Read credentials through `lookup`. Missing or blank values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| -> Result<String, ConfigError> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(ConfigError::MissingCredential(key)),
            }
        };

        Ok(Self {
            client_id: require(ENV_CLIENT_ID)?,
            client_secret: require(ENV_CLIENT_SECRET)?,
            username: require(ENV_USERNAME)?,
            password: require(ENV_PASSWORD)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// HTTP settings for the client.
#[derive(Debug, Clone)]
pub struct RedditConfig {
    /// Reddit rejects requests without a descriptive User-Agent.
    pub user_agent: String,
    /// Posts requested per listing call (clamped to 1..=100).
    pub fetch_limit: u32,
    pub timeout_seconds: u64,
    pub auth_url: String,
    pub api_url: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("redditstats/{}", env!("CARGO_PKG_VERSION")),
            fetch_limit: MAX_FETCH_LIMIT,
            timeout_seconds: 30,
            auth_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            api_url: "https://oauth.reddit.com".to_string(),
        }
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: Post,
}

/// Decode a listing body into posts, in listing order.
pub fn parse_listing(body: &str) -> Result<Vec<Post>, FetchError> {
    let listing: Listing =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    Ok(listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .collect())
}

/// Authenticated client for the Reddit API.
pub struct RedditClient {
    config: RedditConfig,
    credentials: Credentials,
    http_client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    /// Create a client. No request is made until the first fetch.
    pub fn new(credentials: Credentials, mut config: RedditConfig) -> Result<Self, FetchError> {
        config.fetch_limit = config.fetch_limit.clamp(1, MAX_FETCH_LIMIT);

        info!(
            "Initializing Reddit client for user {} (limit {})",
            credentials.username, config.fetch_limit
        );

        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            credentials,
            http_client,
            token: Mutex::new(None),
        })
    }

    /// Fetch the newest posts of `subreddit`.
    pub async fn new_posts(&self, subreddit: &str) -> Result<Vec<Post>, FetchError> {
        let subreddit = subreddit.trim();
        if subreddit.is_empty() {
            return Err(FetchError::InvalidSubreddit);
        }

        let mut response = self.get_listing(subreddit).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Access token rejected, requesting a new one");
            *self.token.lock().await = None;
            response = self.get_listing(subreddit).await?;
        }

        log_rate_limit(response.headers());

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                reset_secs: rate_limit_reset(response.headers()),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_listing(&body)
    }

    async fn get_listing(&self, subreddit: &str) -> Result<Response, FetchError> {
        let token = self.access_token().await?;
        let url = format!("{}/r/{}/new", self.config.api_url, subreddit);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("limit", self.config.fetch_limit.to_string()),
                ("raw_json", "1".to_string()),
            ])
            .send()
            .await?;

        Ok(response)
    }

    /// Return the cached token, requesting a new one if it is missing or stale.
    async fn access_token(&self) -> Result<String, FetchError> {
        let mut token = self.token.lock().await;

        if let Some(ref current) = *token {
            if current.is_fresh() {
                return Ok(current.value.clone());
            }
        }

        let fresh = self.request_token().await?;
        let value = fresh.value.clone();
        *token = Some(fresh);

        Ok(value)
    }

    async fn request_token(&self) -> Result<AccessToken, FetchError> {
        debug!("Requesting OAuth token from {}", self.config.auth_url);

        let response = self
            .http_client
            .post(&self.config.auth_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Auth("invalid client id or secret".to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                reset_secs: rate_limit_reset(response.headers()),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_token(&body)
    }
}

impl PostSource for RedditClient {
    fn fetch<'a>(&'a self, subreddit: &'a str) -> BoxFuture<'a, Result<Vec<Post>, FetchError>> {
        Box::pin(self.new_posts(subreddit))
    }
}

fn parse_token(body: &str) -> Result<AccessToken, FetchError> {
    let response: TokenResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    // Bad username/password comes back as 200 with an error field.
    if let Some(error) = response.error {
        return Err(FetchError::Auth(error));
    }

    let value = response
        .access_token
        .ok_or_else(|| FetchError::Decode("token response has no access_token".to_string()))?;
    let expires_in = response.expires_in.unwrap_or(3600);

    Ok(AccessToken {
        value,
        expires_at: Instant::now() + Duration::from_secs(expires_in),
    })
}

fn header_f64(headers: &HeaderMap, name: &str) -> Option<f64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
}

fn rate_limit_reset(headers: &HeaderMap) -> Option<u64> {
    header_f64(headers, "x-ratelimit-reset").map(|secs| secs.max(0.0) as u64)
}

fn log_rate_limit(headers: &HeaderMap) {
    if let Some(remaining) = header_f64(headers, "x-ratelimit-remaining") {
        if remaining < 1.0 {
            warn!(
                "Rate limit exhausted, resets in {}s",
                rate_limit_reset(headers).unwrap_or(0)
            );
        } else {
            debug!("Rate limit remaining: {}", remaining);
        }
    }
}
