use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use finder_core::{CoreError, RedditApiError};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
pub const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

/// Reddit's maximum listing page size.
const PAGE_SIZE: usize = 100;
const INBOX_PAGE_SIZE: &str = "25";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// The fields shared by submissions (`t3`) and comments (`t1`) that the bot reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditThingData {
    pub id: String,
    /// Fullname, e.g. `t3_abc123`.
    pub name: String,
    pub subreddit: String,
    pub score: i64,
    #[serde(default)]
    pub permalink: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditUserData {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub is_suspended: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditInboxData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySection {
    Submitted,
    Comments,
}

impl HistorySection {
    fn path(self) -> &'static str {
        match self {
            HistorySection::Submitted => "submitted",
            HistorySection::Comments => "comments",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxFolder {
    Mentions,
    Messages,
}

impl InboxFolder {
    fn endpoint(self) -> &'static str {
        match self {
            InboxFolder::Mentions => "/message/mentions",
            InboxFolder::Messages => "/message/messages",
        }
    }
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: RateLimiter,
    base_url: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        Self::with_base_url(user_agent, REDDIT_API_BASE.to_string())
    }

    pub fn with_base_url(user_agent: String, base_url: String) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(RateLimitConfig::reddit_oauth()),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);

        self.rate_limiter.acquire().await;

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }
        if let Some(fields) = form {
            request_builder = request_builder.form(fields);
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(RedditApiError::RequestTimeout.into());
                }
                return Err(CoreError::Network(e));
            }
        };

        self.observe_quota(&response).await;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        warn!("Request failed with status: {} for {}", status, endpoint);
        let err: CoreError = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                RedditApiError::RateLimitExceeded { retry_after }.into()
            }
            401 => RedditApiError::InvalidToken.into(),
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            }
            .into(),
            404 => CoreError::NotFound {
                resource: endpoint.to_string(),
            },
            code if status.is_server_error() => {
                RedditApiError::ServerError { status_code: code }.into()
            }
            code => RedditApiError::InvalidResponse {
                details: format!("unexpected status {} for {}", code, endpoint),
            }
            .into(),
        };
        Err(err)
    }

    async fn observe_quota(&self, response: &Response) {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
        };
        if let (Some(remaining), Some(reset)) =
            (header("x-ratelimit-remaining"), header("x-ratelimit-reset"))
        {
            self.rate_limiter
                .observe_quota(remaining, Duration::from_secs_f64(reset.max(0.0)))
                .await;
        }
    }

    /// `GET /user/{name}/about`. Suspended accounts come back as `Forbidden`.
    pub async fn get_user_about(
        &self,
        access_token: &str,
        username: &str,
    ) -> Result<RedditUserData, CoreError> {
        let endpoint = format!("/user/{}/about", username);
        let response = self
            .make_request(Method::GET, &endpoint, access_token, None, None)
            .await
            .map_err(|e| user_not_found(e, username))?;

        let about: RedditListingChild<RedditUserData> =
            parse_json(response, &format!("user info for u/{}", username)).await?;

        if about.data.is_suspended {
            info!("u/{} is suspended", about.data.name);
            return Err(RedditApiError::Forbidden { resource: endpoint }.into());
        }

        debug!("Retrieved user info for: {}", about.data.name);
        Ok(about.data)
    }

    /// Walks `/user/{name}/{section}` newest first until `limit` items or the end.
    pub async fn get_user_history(
        &self,
        access_token: &str,
        username: &str,
        section: HistorySection,
        limit: usize,
    ) -> Result<Vec<RedditThingData>, CoreError> {
        let endpoint = format!("/user/{}/{}", username, section.path());
        let mut items = Vec::with_capacity(limit.min(PAGE_SIZE * 10));
        let mut after: Option<String> = None;

        while items.len() < limit {
            let page_size = (limit - items.len()).min(PAGE_SIZE).to_string();
            let response = {
                let mut params = vec![("limit", page_size.as_str()), ("raw_json", "1")];
                if let Some(cursor) = after.as_deref() {
                    params.push(("after", cursor));
                }
                self.make_request(Method::GET, &endpoint, access_token, Some(params.as_slice()), None)
                    .await
                    .map_err(|e| user_not_found(e, username))?
            };

            let listing: RedditListing<RedditThingData> =
                parse_json(response, &format!("{} for u/{}", section.path(), username)).await?;

            let fetched = listing.data.children.len();
            items.extend(listing.data.children.into_iter().map(|child| child.data));
            after = listing.data.after;

            if fetched == 0 || after.is_none() {
                break;
            }
        }

        items.truncate(limit);
        info!(
            "Retrieved {} {} for u/{}",
            items.len(),
            section.path(),
            username
        );
        Ok(items)
    }

    /// `GET /api/info?id=<fullname>`.
    pub async fn get_info(
        &self,
        access_token: &str,
        fullname: &str,
    ) -> Result<RedditThingData, CoreError> {
        let params = [("id", fullname), ("raw_json", "1")];
        let response = self
            .make_request(Method::GET, "/api/info", access_token, Some(&params[..]), None)
            .await?;

        let listing: RedditListing<RedditThingData> =
            parse_json(response, &format!("info for {}", fullname)).await?;

        listing
            .data
            .children
            .into_iter()
            .next()
            .map(|child| child.data)
            .ok_or_else(|| {
                RedditApiError::ThingNotFound {
                    fullname: fullname.to_string(),
                }
                .into()
            })
    }

    /// `POST /api/comment`, replying to the thing named `parent_fullname`.
    pub async fn submit_comment(
        &self,
        access_token: &str,
        parent_fullname: &str,
        text: &str,
    ) -> Result<(), CoreError> {
        let form = [
            ("api_type", "json"),
            ("thing_id", parent_fullname),
            ("text", text),
        ];
        let response = self
            .make_request(Method::POST, "/api/comment", access_token, None, Some(&form[..]))
            .await?;

        let body: serde_json::Value = parse_json(response, "comment submission").await?;
        check_json_errors(&body)?;

        debug!("Replied to {}", parent_fullname);
        Ok(())
    }

    pub async fn get_inbox(
        &self,
        access_token: &str,
        folder: InboxFolder,
    ) -> Result<Vec<RedditInboxData>, CoreError> {
        let params = [("limit", INBOX_PAGE_SIZE), ("raw_json", "1")];
        let response = self
            .make_request(Method::GET, folder.endpoint(), access_token, Some(&params[..]), None)
            .await?;

        let listing: RedditListing<RedditInboxData> =
            parse_json(response, folder.endpoint()).await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .collect())
    }
}

/// Turns a relative permalink into an absolute URL.
pub fn absolute_permalink(permalink: &str) -> String {
    if permalink.starts_with("http://") || permalink.starts_with("https://") {
        permalink.to_string()
    } else {
        format!("{}{}", REDDIT_WEB_BASE, permalink)
    }
}

fn user_not_found(error: CoreError, username: &str) -> CoreError {
    match error {
        CoreError::NotFound { .. } => RedditApiError::UserNotFound {
            username: username.to_string(),
        }
        .into(),
        other => other,
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, CoreError> {
    response.json::<T>().await.map_err(|e| {
        error!("Failed to parse {}: {}", what, e);
        RedditApiError::InvalidResponse {
            details: format!("Failed to parse {}", what),
        }
        .into()
    })
}

/// Reddit reports form errors inside a 200 response as `{"json": {"errors": [[code, msg, field]]}}`.
fn check_json_errors(body: &serde_json::Value) -> Result<(), CoreError> {
    let errors = match body.pointer("/json/errors").and_then(|e| e.as_array()) {
        Some(errors) if !errors.is_empty() => errors,
        _ => return Ok(()),
    };

    let first = &errors[0];
    let code = first.get(0).and_then(|c| c.as_str()).unwrap_or("UNKNOWN");
    let message = first.get(1).and_then(|m| m.as_str()).unwrap_or_default();

    match code {
        "RATELIMIT" => Err(RedditApiError::RateLimitExceeded { retry_after: 60 }.into()),
        "THREAD_LOCKED" | "DELETED_COMMENT" | "DELETED_LINK" | "TOO_OLD" => {
            Err(RedditApiError::Forbidden {
                resource: format!("{}: {}", code, message),
            }
            .into())
        }
        _ => Err(RedditApiError::InvalidResponse {
            details: format!("{}: {}", code, message),
        }
        .into()),
    }
}
