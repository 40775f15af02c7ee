#![allow(dead_code)]

use database::Database;
use finder_core::{
    ContentItem, ContentKind, CoreError, DatabaseError, ForumAllowList, InboxRequest, Platform,
    RedditApiError, RequestKind, RequestLedger, UserHandle,
};
use finder_engine::{Dispatcher, DispatcherSettings, HistoryClassifier, ReportRenderer};
use std::collections::HashMap;
use std::sync::Mutex;

pub const BOT_NAME: &str = "gunnutfinder";

#[derive(Debug, Clone, Default)]
pub struct FakeUser {
    pub canonical_name: String,
    pub submissions: Vec<ContentItem>,
    pub comments: Vec<ContentItem>,
    pub suspended: bool,
}

/// Scripted platform that records every call it receives.
#[derive(Default)]
pub struct FakePlatform {
    users: HashMap<String, FakeUser>,
    pub refuse_replies: bool,
    pub fail_lookups: bool,
    calls: Mutex<Vec<String>>,
    replies: Mutex<Vec<(String, String)>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: FakeUser) -> Self {
        self.users.insert(user.canonical_name.to_lowercase(), user);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn lookup(&self, name: &str) -> Result<&FakeUser, CoreError> {
        let user = self
            .users
            .get(&name.to_lowercase())
            .ok_or_else(|| RedditApiError::UserNotFound {
                username: name.to_string(),
            })?;
        if user.suspended {
            return Err(RedditApiError::Forbidden {
                resource: format!("/user/{}/about", name),
            }
            .into());
        }
        Ok(user)
    }
}

pub fn permalink_for(id: &str) -> String {
    format!("https://www.reddit.com/comments/{}/", id)
}

impl Platform for FakePlatform {
    async fn get_user(&self, name: &str) -> Result<UserHandle, CoreError> {
        self.record(format!("get_user:{}", name));
        let user = self.lookup(name)?;
        Ok(UserHandle {
            name: user.canonical_name.clone(),
        })
    }

    async fn fetch_submissions(
        &self,
        user: &UserHandle,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CoreError> {
        self.record(format!("fetch_submissions:{}:{}", user.name, limit));
        let user = self.lookup(&user.name)?;
        Ok(user.submissions.iter().take(limit).cloned().collect())
    }

    async fn fetch_comments(
        &self,
        user: &UserHandle,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CoreError> {
        self.record(format!("fetch_comments:{}:{}", user.name, limit));
        let user = self.lookup(&user.name)?;
        Ok(user.comments.iter().take(limit).cloned().collect())
    }

    async fn resolve_permalink(&self, content_id: &str) -> Result<String, CoreError> {
        self.record(format!("resolve_permalink:{}", content_id));
        if self.fail_lookups {
            return Err(RedditApiError::ServerError { status_code: 503 }.into());
        }
        Ok(permalink_for(content_id))
    }

    async fn reply(&self, request: &InboxRequest, text: &str) -> Result<(), CoreError> {
        self.record(format!("reply:{}", request.id));
        if self.refuse_replies {
            return Err(RedditApiError::Forbidden {
                resource: "THREAD_LOCKED: that thread is locked".to_string(),
            }
            .into());
        }
        self.replies
            .lock()
            .unwrap()
            .push((request.id.clone(), text.to_string()));
        Ok(())
    }

    async fn fetch_mentions(&self) -> Result<Vec<InboxRequest>, CoreError> {
        self.record("fetch_mentions".to_string());
        Ok(Vec::new())
    }

    async fn fetch_messages(&self) -> Result<Vec<InboxRequest>, CoreError> {
        self.record("fetch_messages".to_string());
        Ok(Vec::new())
    }
}

/// Ledger whose storage is gone.
pub struct FailingLedger;

impl RequestLedger for FailingLedger {
    async fn has_processed(&self, _request_id: &str) -> Result<bool, CoreError> {
        Err(DatabaseError::ConnectionFailed {
            reason: "storage unavailable".to_string(),
        }
        .into())
    }

    async fn mark_processed(&self, _request_id: &str) -> Result<(), CoreError> {
        Err(DatabaseError::ConnectionFailed {
            reason: "storage unavailable".to_string(),
        }
        .into())
    }
}

pub fn item(id: &str, forum: &str, score: i64, kind: ContentKind) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        forum: forum.to_string(),
        score,
        kind,
    }
}

pub fn submission(id: &str, forum: &str, score: i64) -> ContentItem {
    item(id, forum, score, ContentKind::Submission)
}

pub fn comment(id: &str, forum: &str, score: i64) -> ContentItem {
    item(id, forum, score, ContentKind::Comment)
}

pub fn request(id: &str, body: &str) -> InboxRequest {
    InboxRequest {
        id: id.to_string(),
        fullname: format!("t1_{}", id),
        kind: RequestKind::Mention,
        author: Some("asker".to_string()),
        body: body.to_string(),
    }
}

pub fn allow_list() -> ForumAllowList {
    ForumAllowList::new(["guns", "progun", "ar15", "firearms"])
}

pub fn renderer() -> ReportRenderer {
    ReportRenderer::new("Chance of being a gunnut", "%", None, 1000)
}

pub async fn temp_ledger() -> Database {
    let path = std::env::temp_dir().join(format!("test_engine_{}.db", uuid::Uuid::new_v4()));
    let db = Database::connect(&path).await.expect("open ledger");
    db.run_migrations().await.expect("migrate ledger");
    db
}

pub fn dispatcher<L: RequestLedger>(
    platform: FakePlatform,
    ledger: L,
    record_malformed_requests: bool,
) -> Dispatcher<FakePlatform, L> {
    Dispatcher::new(
        platform,
        ledger,
        HistoryClassifier::new(allow_list(), 1000),
        renderer(),
        DispatcherSettings {
            bot_name: BOT_NAME.to_string(),
            record_malformed_requests,
        },
    )
    .expect("build dispatcher")
}
