use finder_core::{
    ContentItem, ContentKind, CoreError, ForumAllowList, Platform, RedditApiError, UserHandle,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Why a user's history could not be tallied.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("user {username} not found")]
    UserNotFound { username: String },

    #[error("history of {username} is not accessible")]
    AccessForbidden { username: String },

    #[error(transparent)]
    Platform(#[from] CoreError),
}

impl HistoryError {
    fn from_platform(error: CoreError, username: &str) -> Self {
        match error {
            CoreError::RedditApi(RedditApiError::UserNotFound { .. }) => HistoryError::UserNotFound {
                username: username.to_string(),
            },
            CoreError::RedditApi(RedditApiError::Forbidden { .. }) => {
                HistoryError::AccessForbidden {
                    username: username.to_string(),
                }
            }
            other => HistoryError::Platform(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredItem {
    pub id: String,
    pub score: i64,
}

/// Raw per-forum accumulation, in fetch order (newest first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForumActivity {
    pub forum: String,
    pub submissions: Vec<ScoredItem>,
    pub comments: Vec<ScoredItem>,
}

/// A user's allow-listed history grouped by forum, in first-encounter order.
#[derive(Debug, Clone)]
pub struct ClassifiedHistory {
    pub user: UserHandle,
    forums: Vec<ForumActivity>,
    index: HashMap<String, usize>,
}

impl ClassifiedHistory {
    pub fn new(user: UserHandle) -> Self {
        Self {
            user,
            forums: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn push(&mut self, forum: String, item: &ContentItem) {
        let slot = match self.index.get(&forum) {
            Some(&slot) => slot,
            None => {
                self.forums.push(ForumActivity {
                    forum: forum.clone(),
                    ..Default::default()
                });
                self.index.insert(forum, self.forums.len() - 1);
                self.forums.len() - 1
            }
        };

        let scored = ScoredItem {
            id: item.id.clone(),
            score: item.score,
        };
        match item.kind {
            ContentKind::Submission => self.forums[slot].submissions.push(scored),
            ContentKind::Comment => self.forums[slot].comments.push(scored),
        }
    }

    pub fn forums(&self) -> &[ForumActivity] {
        &self.forums
    }

    pub fn get(&self, forum: &str) -> Option<&ForumActivity> {
        self.index.get(forum).map(|&slot| &self.forums[slot])
    }

    pub fn is_empty(&self) -> bool {
        self.forums.is_empty()
    }
}

pub struct HistoryClassifier {
    allow_list: ForumAllowList,
    history_limit: usize,
}

impl HistoryClassifier {
    pub fn new(allow_list: ForumAllowList, history_limit: usize) -> Self {
        Self {
            allow_list,
            history_limit,
        }
    }

    /// Fetches `username`'s recent submissions and comments and groups the allow-listed ones.
    pub async fn classify<P: Platform>(
        &self,
        platform: &P,
        username: &str,
    ) -> Result<ClassifiedHistory, HistoryError> {
        let user = platform
            .get_user(username)
            .await
            .map_err(|e| HistoryError::from_platform(e, username))?;

        let submissions = platform
            .fetch_submissions(&user, self.history_limit)
            .await
            .map_err(|e| HistoryError::from_platform(e, username))?;
        let comments = platform
            .fetch_comments(&user, self.history_limit)
            .await
            .map_err(|e| HistoryError::from_platform(e, username))?;

        debug!(
            "Fetched {} submissions and {} comments for {}",
            submissions.len(),
            comments.len(),
            user.name
        );
        Ok(self.partition(user, &submissions, &comments))
    }

    /// Submissions are grouped before comments, so forums first seen in comments come last.
    pub fn partition(
        &self,
        user: UserHandle,
        submissions: &[ContentItem],
        comments: &[ContentItem],
    ) -> ClassifiedHistory {
        let mut history = ClassifiedHistory::new(user);
        for item in submissions.iter().chain(comments) {
            let forum = item.forum.to_lowercase();
            if self.allow_list.contains(&forum) {
                history.push(forum, item);
            }
        }
        history
    }
}
