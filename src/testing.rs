//! In-memory stand-ins for the Twitter API and the wall clock.

use crate::account::Account;
use crate::error::ScrapeError;
use crate::rate_limit::{Clock, Endpoint, Quota};
use crate::twitter_client::api::{SearchResponse, Tweet, User, UserRef};
use crate::twitter_client::{ResultType, TimelineQuery, TwitterApi};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Map};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

const WINDOW_MINUTES: i64 = 15;

pub fn tweet(id: u64, favorite_count: u64, retweet_count: u64) -> Tweet {
    Tweet {
        id,
        id_str: id.to_string(),
        text: format!("tweet #{id}"),
        created_at: Utc.timestamp_opt(1_500_000_000 + id as i64, 0).unwrap(),
        user: UserRef {
            id: 12,
            id_str: String::from("12"),
            extra: Map::new(),
        },
        favorite_count,
        retweet_count,
        extra: Map::new(),
    }
}

/// Newest-first history with ids `1..=count`.
pub fn history(count: u64) -> Vec<Tweet> {
    (1..=count).rev().map(|id| tweet(id, id, 0)).collect()
}

pub fn user(screen_name: &str, created_at: DateTime<Utc>, statuses_count: u64) -> User {
    User {
        id: 12,
        id_str: String::from("12"),
        name: screen_name.to_uppercase(),
        screen_name: screen_name.to_string(),
        created_at,
        statuses_count,
        followers_count: 0,
        friends_count: 0,
        description: None,
        extra: Map::new(),
    }
}

/// Strictly descending ids, which also rules out duplicates.
pub fn is_snapshot(timeline: &[Tweet]) -> bool {
    timeline.windows(2).all(|pair| pair[0].id > pair[1].id)
}

#[derive(Debug)]
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<DateTime<Utc>>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2022, 10, 17, 12, 0, 0).unwrap())
    }
}

impl FakeClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Deadlines of every [Clock::sleep_until] so far.
    pub fn sleeps(&self) -> Vec<DateTime<Utc>> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        self.sleeps.lock().unwrap().push(deadline);
        let mut now = self.now.lock().unwrap();
        if deadline > *now {
            *now = deadline;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ShowUser(String),
    Timeline(TimelineQuery),
    Lookup(Vec<u64>),
    Search(String, ResultType),
    Quota(Endpoint),
}

#[derive(Clone, Copy, Debug)]
struct Window {
    remaining: u32,
    reset_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    profile: Option<User>,
    timeline: Vec<Tweet>,
    deleted: HashSet<u64>,
    engagement_bonus: u64,
    mentions: Vec<Tweet>,
    fail_timeline_after: Option<usize>,
    windows: HashMap<Endpoint, Window>,
    calls: Vec<Call>,
}

/// Serves a fixed account with Twitter's paging semantics (`max_id` inclusive, `since_id`
/// exclusive) and rejects calls made against an exhausted quota window.
#[derive(Debug)]
pub struct FakeTwitter {
    clock: Arc<FakeClock>,
    quota_limit: u32,
    state: Mutex<State>,
}

impl FakeTwitter {
    pub fn new(clock: Arc<FakeClock>) -> Self {
        Self {
            clock,
            quota_limit: 900,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_quota_limit(mut self, quota_limit: u32) -> Self {
        self.quota_limit = quota_limit;
        self
    }

    pub fn with_profile(self, profile: User) -> Self {
        self.state.lock().unwrap().profile = Some(profile);
        self
    }

    pub fn with_timeline(self, timeline: Vec<Tweet>) -> Self {
        self.state.lock().unwrap().timeline = timeline;
        self
    }

    pub fn with_mentions(self, mentions: Vec<Tweet>) -> Self {
        self.state.lock().unwrap().mentions = mentions;
        self
    }

    /// Tweets gone from the remote side; lookups skip them.
    pub fn with_deleted(self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.state.lock().unwrap().deleted.extend(ids);
        self
    }

    /// Favorites gained by every tweet since it was collected.
    pub fn with_engagement_bonus(self, bonus: u64) -> Self {
        self.state.lock().unwrap().engagement_bonus = bonus;
        self
    }

    /// Timeline calls after the first [calls] fail as a transport error would.
    pub fn failing_timeline_after(self, calls: usize) -> Self {
        self.state.lock().unwrap().fail_timeline_after = Some(calls);
        self
    }

    pub fn post(&self, tweet: Tweet) {
        let mut state = self.state.lock().unwrap();
        state.timeline.insert(0, tweet);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn timeline_calls(&self) -> Vec<TimelineQuery> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Timeline(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    pub fn lookup_calls(&self) -> Vec<Vec<u64>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Lookup(ids) => Some(ids),
                _ => None,
            })
            .collect()
    }

    fn window<'s>(&self, state: &'s mut State, endpoint: Endpoint) -> &'s mut Window {
        let now = self.clock.now();
        let fresh = Window {
            remaining: self.quota_limit,
            reset_at: now + Duration::minutes(WINDOW_MINUTES),
        };
        let window = state.windows.entry(endpoint).or_insert(fresh);
        if now > window.reset_at {
            *window = fresh;
        }
        window
    }

    fn charge(&self, state: &mut State, endpoint: Endpoint) -> Result<()> {
        let window = self.window(state, endpoint);
        if window.remaining == 0 {
            return Err(ScrapeError::Api {
                status: 429,
                body: String::from("Rate limit exceeded"),
            }
            .into());
        }
        window.remaining -= 1;
        Ok(())
    }
}

#[async_trait]
impl TwitterApi for FakeTwitter {
    async fn show_user(&self, account: &Account) -> Result<User> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ShowUser(account.to_string()));
        state.profile.clone().ok_or_else(|| {
            ScrapeError::Api {
                status: 404,
                body: String::from("User not found."),
            }
            .into()
        })
    }

    async fn user_timeline(&self, _account: &Account, query: TimelineQuery) -> Result<Vec<Tweet>> {
        let mut state = self.state.lock().unwrap();
        self.charge(&mut state, Endpoint::UserTimeline)?;
        state.calls.push(Call::Timeline(query));

        if let Some(limit) = state.fail_timeline_after {
            let made = state
                .calls
                .iter()
                .filter(|call| matches!(call, Call::Timeline(_)))
                .count();
            if made > limit {
                return Err(anyhow!("connection reset by peer"));
            }
        }

        Ok(state
            .timeline
            .iter()
            .filter(|tweet| query.max_id.map_or(true, |max_id| tweet.id <= max_id))
            .filter(|tweet| query.since_id.map_or(true, |since_id| tweet.id > since_id))
            .take(query.count as usize)
            .cloned()
            .collect())
    }

    async fn lookup(&self, ids: &[u64]) -> Result<Vec<Tweet>> {
        let mut state = self.state.lock().unwrap();
        self.charge(&mut state, Endpoint::Lookup)?;
        state.calls.push(Call::Lookup(ids.to_vec()));

        let wanted: HashSet<u64> = ids.iter().copied().collect();
        let mut found: Vec<Tweet> = state
            .timeline
            .iter()
            .filter(|tweet| wanted.contains(&tweet.id) && !state.deleted.contains(&tweet.id))
            .map(|tweet| Tweet {
                favorite_count: tweet.favorite_count + state.engagement_bonus,
                ..tweet.clone()
            })
            .collect();
        // NB: lookup makes no ordering promise
        found.sort_by_key(|tweet| tweet.id);
        Ok(found)
    }

    async fn search(
        &self,
        query: &str,
        count: u32,
        result_type: ResultType,
    ) -> Result<SearchResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Search(query.to_string(), result_type));

        let mut extra = Map::new();
        extra.insert(
            String::from("search_metadata"),
            json!({ "query": query, "count": count }),
        );
        Ok(SearchResponse {
            statuses: state.mentions.iter().take(count as usize).cloned().collect(),
            extra,
        })
    }

    async fn quota(&self, endpoint: Endpoint) -> Result<Quota> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Quota(endpoint));
        let window = *self.window(&mut state, endpoint);
        Ok(Quota {
            remaining: window.remaining,
            reset_at: window.reset_at,
        })
    }
}
