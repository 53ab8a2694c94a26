use std::sync::Arc;

use crate::registry::MemberRegistry;

/// How many members a broadcast pings
pub const MENTION_COUNT: usize = 3;

/// Picks a few known members to @-mention under a broadcast.
pub struct MentionSelector {
    registry: Arc<MemberRegistry>,
    count: usize,
}

impl MentionSelector {
    pub fn new(registry: Arc<MemberRegistry>) -> Self {
        Self {
            registry,
            count: MENTION_COUNT,
        }
    }

    /// `@handle` tokens for a random subset; empty when nobody is registered.
    pub async fn select(&self) -> Vec<String> {
        self.registry
            .sample(self.count)
            .await
            .into_iter()
            .map(|handle| format!("@{handle}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_registry_yields_no_mentions() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(MemberRegistry::load(dir.path().join("users.json")));
        let selector = MentionSelector::new(registry);
        assert!(selector.select().await.is_empty());
    }

    #[tokio::test]
    async fn test_at_most_three_prefixed_mentions() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(MemberRegistry::load(dir.path().join("users.json")));
        for handle in ["maryam", "omid", "neda", "kian", "roya"] {
            registry.record(handle).await;
        }

        let mentions = MentionSelector::new(registry).select().await;
        assert_eq!(mentions.len(), MENTION_COUNT);
        assert!(mentions.iter().all(|m| m.starts_with('@') && m.len() > 1));
    }

    #[tokio::test]
    async fn test_small_registry_mentions_everyone() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(MemberRegistry::load(dir.path().join("users.json")));
        registry.record("solo").await;

        let mentions = MentionSelector::new(registry).select().await;
        assert_eq!(mentions, vec!["@solo".to_string()]);
    }
}
