use crate::classifier::{ClassifiedHistory, ScoredItem};
use finder_core::{CoreError, ForumBucket, Platform, EXEMPLAR_LIMIT};
use tracing::debug;

/// Turns the raw per-forum accumulation into finished buckets, in the same forum order.
///
/// Permalinks are looked up only for the first [`EXEMPLAR_LIMIT`] items of each type.
pub async fn summarize<P: Platform>(
    platform: &P,
    history: &ClassifiedHistory,
) -> Result<Vec<ForumBucket>, CoreError> {
    let mut buckets = Vec::with_capacity(history.forums().len());

    for activity in history.forums() {
        let mut bucket = ForumBucket::new(activity.forum.clone());

        bucket.submission_count = activity.submissions.len();
        bucket.total_submission_karma = total_score(&activity.submissions);
        bucket.submission_permalinks = sample_permalinks(platform, &activity.submissions).await?;

        bucket.comment_count = activity.comments.len();
        bucket.total_comment_karma = total_score(&activity.comments);
        bucket.comment_permalinks = sample_permalinks(platform, &activity.comments).await?;

        debug!(
            "/r/{}: {} submissions ({}), {} comments ({})",
            bucket.forum,
            bucket.submission_count,
            bucket.total_submission_karma,
            bucket.comment_count,
            bucket.total_comment_karma
        );
        buckets.push(bucket);
    }

    Ok(buckets)
}

fn total_score(items: &[ScoredItem]) -> i64 {
    items.iter().map(|item| item.score).sum()
}

async fn sample_permalinks<P: Platform>(
    platform: &P,
    items: &[ScoredItem],
) -> Result<Vec<String>, CoreError> {
    let mut permalinks = Vec::with_capacity(items.len().min(EXEMPLAR_LIMIT));
    for item in items.iter().take(EXEMPLAR_LIMIT) {
        permalinks.push(platform.resolve_permalink(&item.id).await?);
    }
    Ok(permalinks)
}
