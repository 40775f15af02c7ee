use crate::{ContentItem, CoreError, InboxRequest, UserHandle};

/// The social platform as seen by the bot.
///
/// Lookups that fail because the target account does not exist must surface as
/// `RedditApiError::UserNotFound`, and inaccessible (suspended, banned) histories as
/// `RedditApiError::Forbidden`, so callers can tell them apart from transport trouble.
pub trait Platform {
    async fn get_user(&self, name: &str) -> Result<UserHandle, CoreError>;

    /// Most recent submissions first, at most `limit` of them.
    async fn fetch_submissions(
        &self,
        user: &UserHandle,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CoreError>;

    /// Most recent comments first, at most `limit` of them.
    async fn fetch_comments(
        &self,
        user: &UserHandle,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CoreError>;

    async fn resolve_permalink(&self, content_id: &str) -> Result<String, CoreError>;

    async fn reply(&self, request: &InboxRequest, text: &str) -> Result<(), CoreError>;

    async fn fetch_mentions(&self) -> Result<Vec<InboxRequest>, CoreError>;

    async fn fetch_messages(&self) -> Result<Vec<InboxRequest>, CoreError>;
}
