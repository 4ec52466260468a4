use crate::account::Account;
use crate::twitter_client::api;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Artifact {
    Profile,
    Timeline,
    /// Point-in-time engagement counters; never merged back into [Artifact::Timeline].
    RefreshedTimeline,
    Mentions,
}

impl Artifact {
    fn relative_path(&self, account: &Account) -> PathBuf {
        match self {
            Artifact::Profile => Path::new("profiles").join(format!("{account}.json")),
            Artifact::Timeline => Path::new("data").join(format!("{account}.json")),
            Artifact::RefreshedTimeline => {
                Path::new("data").join(format!("{account}_updated.json"))
            }
            Artifact::Mentions => Path::new("mentions").join(format!("{account}.json")),
        }
    }
}

/// One JSON document per (artifact, account), each rewritten in full on save.
///
/// NB: there is no locking; two processes scraping the same account will clobber each other.
#[derive(Clone, Debug)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, artifact: Artifact, account: &Account) -> PathBuf {
        self.root.join(artifact.relative_path(account))
    }

    pub fn read<T: DeserializeOwned>(
        &self,
        artifact: Artifact,
        account: &Account,
    ) -> Result<Option<T>> {
        let path = self.path(artifact, account);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let value = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to decode {}", path.display()))?;
        Ok(Some(value))
    }

    pub fn write<T: Serialize + ?Sized>(
        &self,
        artifact: Artifact,
        account: &Account,
        value: &T,
    ) -> Result<()> {
        let path = self.path(artifact, account);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let bytes = serde_json::to_vec(value)?;
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn load_profile(&self, account: &Account) -> Result<Option<api::User>> {
        self.read(Artifact::Profile, account)
    }

    pub fn save_profile(&self, account: &Account, profile: &api::User) -> Result<()> {
        self.write(Artifact::Profile, account, profile)
    }

    pub fn load_timeline(&self, account: &Account) -> Result<Option<Vec<api::Tweet>>> {
        self.read(Artifact::Timeline, account)
    }

    pub fn save_timeline(&self, account: &Account, timeline: &[api::Tweet]) -> Result<()> {
        self.write(Artifact::Timeline, account, timeline)
    }

    pub fn load_refreshed_timeline(&self, account: &Account) -> Result<Option<Vec<api::Tweet>>> {
        self.read(Artifact::RefreshedTimeline, account)
    }

    pub fn save_refreshed_timeline(&self, account: &Account, timeline: &[api::Tweet]) -> Result<()> {
        self.write(Artifact::RefreshedTimeline, account, timeline)
    }

    pub fn save_mentions(&self, account: &Account, mentions: &api::SearchResponse) -> Result<()> {
        self.write(Artifact::Mentions, account, mentions)
    }
}
