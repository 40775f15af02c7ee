use finder_core::{BotConfig, ForumBucket};

/// Bucket lines stop once the reply reaches this many characters; Reddit caps replies at 10,000.
pub const REPLY_SOFT_LIMIT: usize = 9500;

pub const SELF_CHECK_REPLY: &str = "Nice try.";

pub fn not_found_message(username: &str) -> String {
    format!("User {} not found.", username)
}

pub fn nothing_found_message(username: &str) -> String {
    format!("Nothing found for {}.", username)
}

/// `(score + 1)^3` for positive scores, otherwise zero. Saturates at `i128::MAX`.
pub fn chance(score: i64) -> i128 {
    if score > 0 {
        (i128::from(score) + 1).checked_pow(3).unwrap_or(i128::MAX)
    } else {
        0
    }
}

#[derive(Debug, Clone)]
pub struct ReportRenderer {
    flavor: String,
    flavor_suffix: String,
    operator: Option<String>,
    history_limit: usize,
}

impl ReportRenderer {
    pub fn new(
        flavor: impl Into<String>,
        flavor_suffix: impl Into<String>,
        operator: Option<String>,
        history_limit: usize,
    ) -> Self {
        Self {
            flavor: flavor.into(),
            flavor_suffix: flavor_suffix.into(),
            operator,
            history_limit,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(
            config.flavor.clone(),
            config.flavor_suffix.clone(),
            config.operator.clone(),
            config.history_limit,
        )
    }

    pub fn render(&self, username: &str, buckets: &[ForumBucket]) -> String {
        if buckets.is_empty() {
            return nothing_found_message(username);
        }

        let mut reply = format!(
            "{} post history contains participation in the following subreddits:\n\n",
            username
        );
        let mut length = reply.chars().count();
        let mut score: i64 = 0;

        for bucket in buckets {
            let line = render_bucket(bucket);
            length += line.chars().count();
            reply.push_str(&line);
            score += bucket.combined_score();
            if length >= REPLY_SOFT_LIMIT {
                break;
            }
        }

        reply.push_str(&self.footer(score));
        reply
    }

    fn footer(&self, score: i64) -> String {
        let mut footer = format!("---\n\n###Total score: {}\n\n", score);
        if !self.flavor.is_empty() {
            footer.push_str(&format!(
                "###{}: {}{}.\n\n",
                self.flavor,
                chance(score),
                self.flavor_suffix
            ));
        }
        footer.push_str(&format!(
            "---\n\nI am a bot. Only the past {} posts and comments are fetched.",
            group_thousands(self.history_limit)
        ));
        if let Some(operator) = &self.operator {
            footer.push_str(&format!(
                " If I am misbehaving send my [Creator](https://np.reddit.com/message/compose/?to={}) a message.",
                operator
            ));
        }
        footer
    }
}

fn render_bucket(bucket: &ForumBucket) -> String {
    let mut clauses = Vec::with_capacity(2);
    if !bucket.submission_permalinks.is_empty() {
        clauses.push(format!(
            "{} posts ({}), **combined score: {}**",
            bucket.submission_count,
            ordinal_links(&bucket.submission_permalinks),
            bucket.total_submission_karma
        ));
    }
    if !bucket.comment_permalinks.is_empty() {
        clauses.push(format!(
            "{} comments ({}), **combined score: {}**",
            bucket.comment_count,
            ordinal_links(&bucket.comment_permalinks),
            bucket.total_comment_karma
        ));
    }
    format!("/r/{}: {}.\n\n", bucket.forum, clauses.join("; "))
}

fn ordinal_links(permalinks: &[String]) -> String {
    permalinks
        .iter()
        .enumerate()
        .map(|(i, link)| format!("[{}]({})", i + 1, link))
        .collect::<Vec<_>>()
        .join(", ")
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
