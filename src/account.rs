use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static RE_SCREEN_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{1,15}$").unwrap());

/// A Twitter screen name; also the key every cached artifact is stored under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Account(String);

impl Account {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Search query matching tweets that mention this account.
    pub fn mention_query(&self) -> String {
        format!("@{}", self.0)
    }
}

impl FromStr for Account {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().trim_start_matches('@');
        if !RE_SCREEN_NAME.is_match(name) {
            return Err(anyhow!("Invalid screen name: {s:?}"));
        }
        Ok(Self(name.to_string()))
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let account: Account = "@jack".parse().unwrap();
        assert_eq!(account.as_str(), "jack");
        assert_eq!(account.mention_query(), "@jack");
        assert_eq!("nasa_jpl".parse::<Account>().unwrap().to_string(), "nasa_jpl");
    }

    #[test]
    fn test_rejects_path_like_names() {
        assert!("../etc".parse::<Account>().is_err());
        assert!("".parse::<Account>().is_err());
        assert!("a_name_that_is_far_too_long".parse::<Account>().is_err());
    }
}
