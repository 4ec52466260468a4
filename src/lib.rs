pub mod account;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod scraper;
pub mod sentiment;
pub mod store;
pub mod twitter_client;

#[cfg(test)]
mod testing;
