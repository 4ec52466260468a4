use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub id_str: String,
    pub name: String,
    pub screen_name: String,
    #[serde(with = "twitter_date")]
    pub created_at: DateTime<Utc>,
    pub statuses_count: u64,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub friends_count: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The author of a tweet; only the ids when the request asked for `trim_user`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    pub id_str: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// NB: ids are snowflakes, so ordering by id is ordering by creation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: u64,
    pub id_str: String,
    pub text: String,
    #[serde(with = "twitter_date")]
    pub created_at: DateTime<Utc>,
    pub user: UserRef,
    #[serde(default)]
    pub favorite_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tweet {
    pub fn popularity(&self) -> u64 {
        self.favorite_count + self.retweet_count
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub statuses: Vec<Tweet>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitStatus {
    /// resource -> endpoint path (e.g. `/statuses/lookup`) -> window
    pub resources: HashMap<String, HashMap<String, RateLimitWindow>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub limit: u32,
    pub remaining: u32,
    /// Unix seconds
    pub reset: i64,
}

/// Twitter's v1.1 timestamp format, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
pub mod twitter_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&raw, FORMAT)
            .map(|date| date.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
