use super::Scraper;
use crate::account::Account;
use crate::error::ScrapeError;
use crate::rate_limit::Endpoint;
use crate::twitter_client::{api, TwitterApi, LOOKUP_CHUNK_SIZE};
use anyhow::Result;
use std::cmp::Reverse;
use tracing::{debug, info, instrument};

impl<A: TwitterApi> Scraper<A> {
    /// Re-fetch engagement counters for the [count] newest cached tweets (all of them if
    /// `None`) and save them as the refreshed timeline. The cached timeline is not modified.
    #[instrument(skip(self, account), fields(account = %account))]
    pub async fn refresh_timeline(
        &mut self,
        account: &Account,
        count: Option<usize>,
    ) -> Result<Vec<api::Tweet>> {
        let cached = self
            .store
            .load_timeline(account)?
            .ok_or_else(|| ScrapeError::MissingTimeline {
                account: account.to_string(),
            })?;

        let count = count.map_or(cached.len(), |count| count.min(cached.len()));
        let ids: Vec<u64> = cached.iter().take(count).map(|tweet| tweet.id).collect();

        let mut refreshed: Vec<api::Tweet> = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(LOOKUP_CHUNK_SIZE) {
            self.rate_limiter.acquire(&self.api, Endpoint::Lookup).await?;
            let tweets = self.api.lookup(chunk).await?;
            // NB: deleted or protected tweets are just missing from the response
            debug!(requested = chunk.len(), returned = tweets.len(), "Looked up tweets");
            refreshed.extend(tweets);
        }

        refreshed.sort_by_key(|tweet| Reverse(tweet.id));
        refreshed.dedup_by_key(|tweet| tweet.id);

        self.store.save_refreshed_timeline(account, &refreshed)?;
        info!(requested = ids.len(), refreshed = refreshed.len(), "Refreshed timeline");
        Ok(refreshed)
    }
}
