use crate::error::ScrapeError;
use crate::twitter_client::api::RateLimitStatus;
use crate::twitter_client::TwitterApi;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

/// A (resource, endpoint) pair that Twitter meters separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    UserTimeline,
    Lookup,
}

impl Endpoint {
    pub fn resource(&self) -> &'static str {
        "statuses"
    }

    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::UserTimeline => "user_timeline",
            Endpoint::Lookup => "lookup",
        }
    }

    /// Key used by `application/rate_limit_status`, e.g. `/statuses/lookup`.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.resource(), self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quota {
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl Quota {
    pub fn from_status(status: &RateLimitStatus, endpoint: Endpoint) -> Result<Self> {
        let window = status
            .resources
            .get(endpoint.resource())
            .and_then(|endpoints| endpoints.get(&endpoint.path()))
            .ok_or_else(|| ScrapeError::MissingQuota {
                resource: endpoint.resource().to_string(),
                endpoint: endpoint.path(),
            })?;
        let reset_at = Utc
            .timestamp_opt(window.reset, 0)
            .single()
            .ok_or_else(|| anyhow!("Invalid reset timestamp {}", window.reset))?;
        Ok(Self {
            remaining: window.remaining,
            reset_at,
        })
    }
}

#[async_trait]
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

#[derive(Debug, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        // NB: a deadline already in the past fails [to_std], which is a zero wait
        let wait = (deadline - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
    }
}

/// Local view of the remote quotas, owned by one scraping session.
///
/// The remote count is only queried for the first call and after waiting out an exhausted
/// window; in between, every granted call is charged against the local copy.
#[derive(Debug)]
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    quotas: HashMap<Endpoint, Quota>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            quotas: HashMap::new(),
        }
    }

    pub fn quota(&self, endpoint: Endpoint) -> Option<Quota> {
        self.quotas.get(&endpoint).copied()
    }

    /// Wait until one call against [endpoint] is allowed, and charge it.
    pub async fn acquire<A>(&mut self, api: &A, endpoint: Endpoint) -> Result<()>
    where
        A: TwitterApi + ?Sized,
    {
        let mut quota = match self.quota(endpoint) {
            Some(quota) => quota,
            None => self.check(api, endpoint).await?,
        };

        while quota.remaining == 0 {
            let wake_at = quota.reset_at + Duration::seconds(1);
            info!(
                endpoint = %endpoint.path(),
                reset_at = %quota.reset_at,
                "Rate limit exhausted, waiting for reset"
            );
            self.clock.sleep_until(wake_at).await;
            quota = self.check(api, endpoint).await?;
        }

        quota.remaining -= 1;
        self.quotas.insert(endpoint, quota);
        Ok(())
    }

    async fn check<A>(&mut self, api: &A, endpoint: Endpoint) -> Result<Quota>
    where
        A: TwitterApi + ?Sized,
    {
        let quota = api.quota(endpoint).await?;
        debug!(
            endpoint = %endpoint.path(),
            remaining = quota.remaining,
            reset_at = %quota.reset_at,
            "Checked rate limit"
        );
        self.quotas.insert(endpoint, quota);
        Ok(quota)
    }
}
