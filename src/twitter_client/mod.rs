pub mod api;

use crate::account::Account;
use crate::error::ScrapeError;
use crate::rate_limit::{Endpoint, Quota};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request};
use hyper_tls::HttpsConnector;
use itertools::Itertools;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{AccessToken, AuthUrl, ClientId, ClientSecret, TokenResponse, TokenUrl};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use url::Url;

const API_BASE: &str = "https://api.twitter.com/1.1";

/// Largest page `statuses/user_timeline` will return.
pub const TIMELINE_PAGE_SIZE: u32 = 200;
/// Most ids `statuses/lookup` accepts per call.
pub const LOOKUP_CHUNK_SIZE: usize = 100;
/// Largest page `search/tweets` will return.
pub const SEARCH_PAGE_SIZE: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimelineQuery {
    pub count: u32,
    pub include_rts: bool,
    /// Inclusive upper bound
    pub max_id: Option<u64>,
    /// Exclusive lower bound
    pub since_id: Option<u64>,
}

impl Default for TimelineQuery {
    fn default() -> Self {
        Self {
            count: TIMELINE_PAGE_SIZE,
            include_rts: false,
            max_id: None,
            since_id: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResultType {
    #[default]
    Mixed,
    Recent,
    Popular,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Mixed => "mixed",
            ResultType::Recent => "recent",
            ResultType::Popular => "popular",
        }
    }
}

impl FromStr for ResultType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mixed" => Ok(ResultType::Mixed),
            "recent" => Ok(ResultType::Recent),
            "popular" => Ok(ResultType::Popular),
            _ => Err(anyhow!("Unknown result type {s:?}; expected mixed, recent or popular")),
        }
    }
}

/// The slice of the Twitter API the scraper consumes.
#[async_trait]
pub trait TwitterApi: Send + Sync {
    async fn show_user(&self, account: &Account) -> Result<api::User>;

    async fn user_timeline(&self, account: &Account, query: TimelineQuery)
        -> Result<Vec<api::Tweet>>;

    /// Tweets that no longer exist are silently left out of the result.
    async fn lookup(&self, ids: &[u64]) -> Result<Vec<api::Tweet>>;

    async fn search(
        &self,
        query: &str,
        count: u32,
        result_type: ResultType,
    ) -> Result<api::SearchResponse>;

    async fn quota(&self, endpoint: Endpoint) -> Result<Quota>;
}

#[derive(Debug, Clone)]
pub struct TwitterClient {
    https_client: Client<HttpsConnector<HttpConnector>>,
    app_key: String,
    app_secret: String,
    access_token: Option<AccessToken>,
}

impl TwitterClient {
    pub fn new(app_key: &str, app_secret: &str) -> Self {
        let https = HttpsConnector::new();
        let https_client = Client::builder().build::<_, hyper::Body>(https);
        Self {
            https_client,
            app_key: app_key.to_string(),
            app_secret: app_secret.to_string(),
            access_token: None,
        }
    }

    pub fn save_access_token(&self, path: &Path) -> Result<()> {
        let access_token = self
            .access_token
            .as_ref()
            .ok_or(anyhow!("No token to save"))?;
        let access_token = serde_json::to_string(&access_token)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, access_token)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn load_access_token(&mut self, path: &Path) -> Result<()> {
        let access_token = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let access_token = serde_json::from_str(&access_token)?;
        self.access_token = Some(access_token);
        Ok(())
    }

    /// Application-only auth: trade the app key and secret for a bearer token.
    pub async fn authorize(&mut self) -> Result<()> {
        let oauth_client = BasicClient::new(
            ClientId::new(self.app_key.clone()),
            Some(ClientSecret::new(self.app_secret.clone())),
            AuthUrl::new("https://api.twitter.com/oauth/authorize".to_string())?,
            Some(TokenUrl::new(
                "https://api.twitter.com/oauth2/token".to_string(),
            )?),
        );

        let token_result = oauth_client
            .exchange_client_credentials()
            .request_async(async_http_client)
            .await?;

        self.access_token = Some(token_result.access_token().clone());
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, uri: Url) -> Result<T> {
        let access_token = self.access_token.as_ref().ok_or(anyhow!("Unauthorized"))?;
        let req = Request::builder()
            .method(Method::GET)
            .uri(uri.as_str())
            .header("Authorization", format!("Bearer {}", access_token.secret()))
            .body(Body::empty())?;

        debug!(path = uri.path(), "GET");
        let resp = self.https_client.request(req).await?;
        let status = resp.status();
        let body = hyper::body::to_bytes(resp.into_body()).await?;

        if !status.is_success() {
            return Err(ScrapeError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }
            .into());
        }

        serde_json::from_slice(&body)
            .with_context(|| format!("Failed to decode response from {}", uri.path()))
    }
}

fn endpoint_url(path: &str) -> Result<Url> {
    Ok(Url::parse(&format!("{API_BASE}/{path}.json"))?)
}

fn timeline_url(account: &Account, query: TimelineQuery) -> Result<Url> {
    let mut uri = endpoint_url("statuses/user_timeline")?;
    uri.query_pairs_mut()
        .append_pair("screen_name", account.as_str())
        .append_pair("count", &query.count.to_string())
        .append_pair("include_rts", &query.include_rts.to_string())
        .append_pair("trim_user", "true");

    if let Some(max_id) = query.max_id {
        uri.query_pairs_mut()
            .append_pair("max_id", &max_id.to_string());
    }
    if let Some(since_id) = query.since_id {
        uri.query_pairs_mut()
            .append_pair("since_id", &since_id.to_string());
    }

    Ok(uri)
}

#[async_trait]
impl TwitterApi for TwitterClient {
    async fn show_user(&self, account: &Account) -> Result<api::User> {
        let mut uri = endpoint_url("users/show")?;
        uri.query_pairs_mut()
            .append_pair("screen_name", account.as_str());
        self.get(uri).await
    }

    async fn user_timeline(
        &self,
        account: &Account,
        query: TimelineQuery,
    ) -> Result<Vec<api::Tweet>> {
        self.get(timeline_url(account, query)?).await
    }

    async fn lookup(&self, ids: &[u64]) -> Result<Vec<api::Tweet>> {
        let mut uri = endpoint_url("statuses/lookup")?;
        uri.query_pairs_mut()
            .append_pair("id", &ids.iter().join(","))
            .append_pair("trim_user", "true");
        self.get(uri).await
    }

    async fn search(
        &self,
        query: &str,
        count: u32,
        result_type: ResultType,
    ) -> Result<api::SearchResponse> {
        let mut uri = endpoint_url("search/tweets")?;
        uri.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("count", &count.to_string())
            .append_pair("result_type", result_type.as_str());
        self.get(uri).await
    }

    async fn quota(&self, endpoint: Endpoint) -> Result<Quota> {
        let mut uri = endpoint_url("application/rate_limit_status")?;
        uri.query_pairs_mut()
            .append_pair("resources", endpoint.resource());
        let status: api::RateLimitStatus = self.get(uri).await?;
        Quota::from_status(&status, endpoint)
    }
}
