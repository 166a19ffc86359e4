//! Ranking enrichment: display names and avatars for ranked users.
//!
//! A failed lookup never aborts a report. After the collaborator has spent
//! its own retry budget, the entry falls back to the raw user id and no
//! avatar, and the failure is logged.

use crate::analytics::RankedCount;
use crate::error::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

/// Display name shown for podium places nobody earned.
pub const PLACEHOLDER_NAME: &str = "Nobody yet";

/// Resolves user ids to display names within a group.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn display_name(&self, group_id: &str, user_id: &str) -> Result<String>;
}

/// Fetches avatar image bytes for a user.
#[async_trait]
pub trait AvatarSource: Send + Sync {
    async fn get_avatar(&self, user_id: &str) -> Result<Vec<u8>>;
}

/// One ranked user, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    /// Subject key (user id)
    pub subject: String,
    /// 1-based rank
    pub rank: usize,
    /// Count with its unit, e.g. "12 messages"
    pub count_label: String,
    /// Group card or nickname, the user id if unknown
    pub display_name: String,
    /// Encoded avatar image
    #[serde(skip)]
    pub avatar: Option<Vec<u8>>,
}

impl RankedEntry {
    /// Filler for an empty podium place.
    pub fn placeholder(rank: usize) -> Self {
        Self {
            subject: String::new(),
            rank,
            count_label: String::new(),
            display_name: PLACEHOLDER_NAME.to_string(),
            avatar: None,
        }
    }

    /// Entry without any lookups: the user id stands in for the name.
    fn plain(entry: &RankedCount, unit: &str) -> Self {
        Self {
            subject: entry.subject.clone(),
            rank: entry.rank,
            count_label: count_label(entry, unit),
            display_name: entry.subject.clone(),
            avatar: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.subject.is_empty()
    }
}

fn count_label(entry: &RankedCount, unit: &str) -> String {
    format!("{} {}", entry.value, unit)
}

/// Adds identities and avatars to the top of a ranking.
#[derive(Clone)]
pub struct Enricher {
    directory: Arc<dyn MemberDirectory>,
    avatars: Arc<dyn AvatarSource>,
    depth: usize,
}

impl Enricher {
    /// `depth` is how many leading entries get looked up.
    pub fn new(
        directory: Arc<dyn MemberDirectory>,
        avatars: Arc<dyn AvatarSource>,
        depth: usize,
    ) -> Self {
        Self {
            directory,
            avatars,
            depth,
        }
    }

    /// Convert the whole of `ranking`. The first `depth` entries are looked
    /// up concurrently; the rest keep the user id as name and get no avatar.
    pub async fn enrich(
        &self,
        group_id: &str,
        ranking: &[RankedCount],
        unit: &str,
    ) -> Vec<RankedEntry> {
        let split = self.depth.min(ranking.len());
        let (head, tail) = ranking.split_at(split);

        let lookups = head
            .iter()
            .map(|entry| self.enrich_one(group_id, entry, unit));
        let mut entries = join_all(lookups).await;
        entries.extend(tail.iter().map(|entry| RankedEntry::plain(entry, unit)));
        entries
    }

    async fn enrich_one(&self, group_id: &str, entry: &RankedCount, unit: &str) -> RankedEntry {
        let (name, avatar) = futures::join!(
            self.directory.display_name(group_id, &entry.subject),
            self.avatars.get_avatar(&entry.subject)
        );

        let display_name = name.unwrap_or_else(|e| {
            tracing::warn!(
                group_id,
                user_id = %entry.subject,
                error = %e,
                "Member lookup failed, using user id"
            );
            entry.subject.clone()
        });
        let avatar = match avatar {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(
                    user_id = %entry.subject,
                    error = %e,
                    "Avatar unavailable, using placeholder"
                );
                None
            }
        };

        RankedEntry {
            subject: entry.subject.clone(),
            rank: entry.rank,
            count_label: count_label(entry, unit),
            display_name,
            avatar,
        }
    }
}
