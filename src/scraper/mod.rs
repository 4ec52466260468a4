mod analyze;
mod collect;
mod refresh;

pub use analyze::{account_age_days, Analysis, Popularity, RankedTweet};

use crate::account::Account;
use crate::rate_limit::{Clock, RateLimiter, SystemClock};
use crate::store::Store;
use crate::twitter_client::{api, TwitterApi};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// One scraping session: the API it talks to, the cache it maintains and the quotas it has
/// observed so far.
///
/// NB: assumes it is the only writer of the cached artifacts for the accounts it touches.
#[derive(Debug)]
pub struct Scraper<A> {
    api: A,
    store: Store,
    clock: Arc<dyn Clock>,
    rate_limiter: RateLimiter,
}

impl<A: TwitterApi> Scraper<A> {
    pub fn new(api: A, store: Store) -> Self {
        Self::with_clock(api, store, Arc::new(SystemClock))
    }

    pub fn with_clock(api: A, store: Store, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            store,
            rate_limiter: RateLimiter::new(clock.clone()),
            clock,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn fetch_profile(&mut self, account: &Account) -> Result<api::User> {
        let profile = self.api.show_user(account).await?;
        self.store.save_profile(account, &profile)?;
        info!(%account, statuses = profile.statuses_count, "Saved profile");
        Ok(profile)
    }
}
