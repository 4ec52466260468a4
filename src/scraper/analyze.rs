use super::Scraper;
use crate::account::Account;
use crate::error::ScrapeError;
use crate::sentiment::{SentimentCounts, SentimentScorer};
use crate::twitter_client::{api, ResultType, TwitterApi, SEARCH_PAGE_SIZE};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use ndarray::Array1;
use ndarray_stats::interpolate::Linear;
use ndarray_stats::Quantile1dExt;
use noisy_float::types::{n64, N64};
use serde::Serialize;
use std::cmp::Reverse;
use std::fmt;
use tracing::{info, instrument};

const POPULAR_PERCENTILE: f64 = 0.9;
const UNPOPULAR_PERCENTILE: f64 = 0.1;
const REPORT_WIDTH: usize = 80;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedTweet {
    pub id: u64,
    pub text: String,
    pub popularity: u64,
}

impl From<&api::Tweet> for RankedTweet {
    fn from(tweet: &api::Tweet) -> Self {
        Self {
            id: tweet.id,
            text: tweet.text.clone(),
            popularity: tweet.popularity(),
        }
    }
}

/// The tweets standing out above the 90th and below the 10th percentile of favorites + retweets.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Popularity {
    pub popular_threshold: f64,
    pub unpopular_threshold: f64,
    /// Most popular first
    pub popular: Vec<RankedTweet>,
    /// Least popular first
    pub unpopular: Vec<RankedTweet>,
}

impl Popularity {
    /// Tweets scoring exactly on a threshold belong to neither list.
    pub fn from_timeline(account: &Account, timeline: &[api::Tweet]) -> Result<Self> {
        if timeline.is_empty() {
            return Err(ScrapeError::EmptyTimeline {
                account: account.to_string(),
            }
            .into());
        }

        let mut scores: Array1<N64> = timeline
            .iter()
            .map(|tweet| n64(tweet.popularity() as f64))
            .collect();
        let popular_threshold = percentile(&mut scores, POPULAR_PERCENTILE)?;
        let unpopular_threshold = percentile(&mut scores, UNPOPULAR_PERCENTILE)?;

        let popular = timeline
            .iter()
            .filter(|tweet| tweet.popularity() as f64 > popular_threshold)
            .map(RankedTweet::from)
            .sorted_by_key(|ranked| Reverse(ranked.popularity))
            .collect();
        let unpopular = timeline
            .iter()
            .filter(|tweet| (tweet.popularity() as f64) < unpopular_threshold)
            .map(RankedTweet::from)
            .sorted_by_key(|ranked| ranked.popularity)
            .collect();

        Ok(Self {
            popular_threshold,
            unpopular_threshold,
            popular,
            unpopular,
        })
    }
}

/// Linear interpolation between the closest ranks, as numpy's default.
fn percentile(scores: &mut Array1<N64>, q: f64) -> Result<f64> {
    let value = scores
        .quantile_mut(n64(q), &Linear)
        .map_err(|err| anyhow!("Failed to compute percentile {q}: {err:?}"))?;
    Ok(value.raw())
}

/// Whole days between [created_at] and [now], regardless of which is earlier.
///
/// The signed difference `created_at - now` is floored to whole days before taking the
/// magnitude, so a partial last day of an account's age counts as a full one.
pub fn account_age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let delta = created_at - now;
    let mut days = delta.num_days();
    if delta < Duration::days(days) {
        days -= 1;
    }
    days.abs()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Analysis {
    pub account: String,
    pub account_age_days: i64,
    pub statuses_count: u64,
    pub popularity: Popularity,
    pub mentions: SentimentCounts,
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Popularity {
            popular_threshold,
            unpopular_threshold,
            popular,
            unpopular,
        } = &self.popularity;

        writeln!(f, "@{}", self.account)?;
        writeln!(f, "days since creation: {}", self.account_age_days)?;
        writeln!(f, "# of tweets: {}", self.statuses_count)?;

        writeln!(f, "\npopular (> {popular_threshold:.1}):")?;
        write_ranked(f, popular)?;
        writeln!(f, "\nunpopular (< {unpopular_threshold:.1}):")?;
        write_ranked(f, unpopular)?;

        let SentimentCounts {
            positive,
            neutral,
            negative,
        } = self.mentions;
        write!(
            f,
            "\nmentions | positive: {positive}, neutral: {neutral}, negative: {negative}"
        )
    }
}

fn write_ranked(f: &mut fmt::Formatter<'_>, tweets: &[RankedTweet]) -> fmt::Result {
    let options = textwrap::Options::new(REPORT_WIDTH)
        .initial_indent("  ")
        .subsequent_indent("          ");
    for tweet in tweets {
        let line = format!("{:>6}  {}", tweet.popularity, tweet.text);
        writeln!(f, "{}", textwrap::fill(&line, &options))?;
    }
    Ok(())
}

impl<A: TwitterApi> Scraper<A> {
    /// Profile and timeline come from the cache when present, and are fetched otherwise. The
    /// mention search always goes to the API and overwrites the previous mentions.
    #[instrument(skip(self, account, scorer), fields(account = %account))]
    pub async fn analyze<S>(
        &mut self,
        account: &Account,
        scorer: &S,
        result_type: ResultType,
    ) -> Result<Analysis>
    where
        S: SentimentScorer + ?Sized,
    {
        let profile = match self.store.load_profile(account)? {
            Some(profile) => profile,
            None => self.fetch_profile(account).await?,
        };
        let timeline = match self.store.load_timeline(account)? {
            Some(timeline) => timeline,
            None => self.collect_timeline(account).await?,
        };

        let popularity = Popularity::from_timeline(account, &timeline)?;

        let mentions = self
            .api
            .search(&account.mention_query(), SEARCH_PAGE_SIZE, result_type)
            .await?;
        self.store.save_mentions(account, &mentions)?;
        let sentiment = SentimentCounts::tally(
            scorer,
            mentions.statuses.iter().map(|tweet| tweet.text.as_str()),
        );
        info!(
            mentions = sentiment.total(),
            popular = popularity.popular.len(),
            unpopular = popularity.unpopular.len(),
            "Analyzed account"
        );

        Ok(Analysis {
            account: account.to_string(),
            account_age_days: account_age_days(profile.created_at, self.clock.now()),
            statuses_count: profile.statuses_count,
            popularity,
            mentions: sentiment,
        })
    }
}
