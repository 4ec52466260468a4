use super::Scraper;
use crate::account::Account;
use crate::rate_limit::Endpoint;
use crate::twitter_client::{api, TimelineQuery, TwitterApi};
use anyhow::Result;
use tracing::{debug, info, instrument, warn};

impl<A: TwitterApi> Scraper<A> {
    /// Fetch everything newer than the cached timeline and save the merged result.
    ///
    /// Pages are walked newest to oldest; nothing is written unless every page was fetched.
    #[instrument(skip(self, account), fields(account = %account))]
    pub async fn collect_timeline(&mut self, account: &Account) -> Result<Vec<api::Tweet>> {
        let cached = self.store.load_timeline(account)?.unwrap_or_default();
        let since_id = cached.first().map(|tweet| tweet.id);

        let mut fetched: Vec<api::Tweet> = Vec::new();
        let mut max_id = None;

        loop {
            self.rate_limiter
                .acquire(&self.api, Endpoint::UserTimeline)
                .await?;
            let query = TimelineQuery {
                max_id,
                since_id,
                ..TimelineQuery::default()
            };
            let page = self.api.user_timeline(account, query).await?;
            debug!(count = page.len(), ?max_id, ?since_id, "Fetched timeline page");

            let Some(oldest) = page.iter().map(|tweet| tweet.id).min() else {
                break;
            };
            fetched.extend(page);
            match oldest.checked_sub(1) {
                Some(next_max_id) => max_id = Some(next_max_id),
                None => break,
            }
        }

        let new_tweets = fetched.len();
        let timeline = merge(fetched, cached);
        self.store.save_timeline(account, &timeline)?;
        info!(new_tweets, total = timeline.len(), "Collected timeline");
        Ok(timeline)
    }
}

/// Put freshly fetched tweets in front of the cached ones.
///
/// Fetched tweets that are not strictly newer than the cache would break the ordering, so they
/// are dropped; an upstream that honours `since_id` never sends any.
pub(crate) fn merge(mut fetched: Vec<api::Tweet>, cached: Vec<api::Tweet>) -> Vec<api::Tweet> {
    if let Some(newest_cached) = cached.first().map(|tweet| tweet.id) {
        let before = fetched.len();
        fetched.retain(|tweet| tweet.id > newest_cached);
        if fetched.len() < before {
            warn!(
                dropped = before - fetched.len(),
                newest_cached, "Dropped fetched tweets overlapping the cache"
            );
        }
    }
    fetched.extend(cached);
    fetched
}
