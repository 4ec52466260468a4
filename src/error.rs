use thiserror::Error;

/// Failures callers need to tell apart; everything else travels as a plain [anyhow::Error].
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("no cached timeline for @{account}; run `collect` first")]
    MissingTimeline { account: String },

    #[error("cannot compute popularity percentiles: timeline for @{account} is empty")]
    EmptyTimeline { account: String },

    #[error("Twitter API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("rate limit status has no entry for {resource} {endpoint}")]
    MissingQuota { resource: String, endpoint: String },
}
