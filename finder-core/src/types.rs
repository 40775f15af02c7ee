use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of permalinks sampled per content type per forum.
pub const EXEMPLAR_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    Submission,
    Comment,
}

/// One submission or comment from a user's history, as returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Platform fullname, e.g. `t3_abc123` or `t1_def456`.
    pub id: String,
    pub forum: String,
    pub score: i64,
    pub kind: ContentKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHandle {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Mention,
    Message,
}

/// An inbound mention or private message that may summon the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxRequest {
    pub id: String,
    pub fullname: String,
    pub kind: RequestKind,
    pub author: Option<String>,
    pub body: String,
}

/// Finalized per-forum statistics for one target user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForumBucket {
    pub forum: String,
    pub submission_count: usize,
    pub comment_count: usize,
    pub total_submission_karma: i64,
    pub total_comment_karma: i64,
    pub submission_permalinks: Vec<String>,
    pub comment_permalinks: Vec<String>,
}

impl ForumBucket {
    pub fn new(forum: impl Into<String>) -> Self {
        Self {
            forum: forum.into(),
            ..Default::default()
        }
    }

    pub fn combined_score(&self) -> i64 {
        self.total_submission_karma + self.total_comment_karma
    }
}

/// Case-normalized set of forums whose participation is tallied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForumAllowList {
    forums: HashSet<String>,
}

impl ForumAllowList {
    pub fn new<I, S>(forums: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            forums: forums
                .into_iter()
                .map(|f| f.as_ref().trim().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    /// `forum` must already be lowercase.
    pub fn contains(&self, forum: &str) -> bool {
        self.forums.contains(forum)
    }

    pub fn len(&self) -> usize {
        self.forums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forums.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_normalizes_names() {
        let list = ForumAllowList::new(["Guns", " firearms ", ""]);
        assert_eq!(list.len(), 2);
        assert!(list.contains("guns"));
        assert!(list.contains("firearms"));
        assert!(!list.contains("Guns"));
    }

    #[test]
    fn test_bucket_combined_score() {
        let mut bucket = ForumBucket::new("guns");
        bucket.total_submission_karma = 13;
        bucket.total_comment_karma = -20;
        assert_eq!(bucket.combined_score(), -7);
        assert!(bucket.submission_permalinks.is_empty());
    }
}
