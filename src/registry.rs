//! Durable set of member handles seen in the group.
//!
//! The store is a JSON array of strings rewritten in full after every insertion.
//! The registry only grows; there is no removal path.

use std::collections::{BTreeSet, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::seq::{IteratorRandom, SliceRandom};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

pub struct MemberRegistry {
    path: PathBuf,
    members: Mutex<HashSet<String>>,
}

impl MemberRegistry {
    /// Load the registry from `path`. Never fails: a missing or unreadable
    /// store yields an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let members = match read_store(&path) {
            Ok(members) => {
                info!("Loaded {} member(s) from {}", members.len(), path.display());
                members
            }
            Err(e) if is_not_found(&e) => {
                info!("No member file at {}, starting fresh", path.display());
                HashSet::new()
            }
            Err(e) => {
                error!("Failed to load members from {}: {:#}", path.display(), e);
                HashSet::new()
            }
        };

        Self {
            path,
            members: Mutex::new(members),
        }
    }

    /// Add `handle` and flush the whole set to disk. Empty and known handles are ignored.
    /// Returns whether the handle was new. A failed flush is logged and the handle is kept.
    pub async fn record(&self, handle: &str) -> bool {
        if handle.is_empty() {
            return false;
        }

        // held across the write so no reader sees an insertion that was never flushed
        let mut members = self.members.lock().await;
        if !members.insert(handle.to_string()) {
            return false;
        }

        match write_store(&self.path, &members).await {
            Ok(()) => debug!("Saved {} member(s) after adding @{}", members.len(), handle),
            Err(e) => error!(
                "Failed to save members to {}: {:#}",
                self.path.display(),
                e
            ),
        }
        true
    }

    /// Up to `k` distinct handles chosen uniformly at random, in random order.
    pub async fn sample(&self, k: usize) -> Vec<String> {
        let members = self.members.lock().await;
        let mut rng = rand::thread_rng();
        // choose_multiple keeps iteration order
        let mut picked = members.iter().cloned().choose_multiple(&mut rng, k);
        picked.shuffle(&mut rng);
        picked
    }

    pub async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    #[cfg(test)]
    pub async fn snapshot(&self) -> HashSet<String> {
        self.members.lock().await.clone()
    }
}

fn read_store(path: &Path) -> Result<HashSet<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let handles: Vec<String> =
        serde_json::from_str(&content).context("Member file is not a JSON array of strings")?;
    Ok(handles.into_iter().filter(|h| !h.is_empty()).collect())
}

async fn write_store(path: &Path, members: &HashSet<String>) -> Result<()> {
    let sorted: BTreeSet<&String> = members.iter().collect();
    let json = serde_json::to_string_pretty(&sorted).context("Failed to serialize members")?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move {} into place", tmp.display()))?;
    Ok(())
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .is_some_and(|io| io.kind() == ErrorKind::NotFound)
}
