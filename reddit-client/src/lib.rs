pub mod api;
pub mod rate_limiter;


use api::{absolute_permalink, HistorySection, InboxFolder, RedditApiClient, RedditInboxData};
use finder_core::{
    ContentItem, ContentKind, CoreError, InboxRequest, Platform, RedditApiError, RedditConfig,
    RequestKind, UserHandle,
};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RefreshToken, TokenResponse,
    TokenUrl,
};
use std::future::Future;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens are refreshed this long before Reddit says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub user_agent: String,
    pub token_url: String,
}

impl RedditOAuth2Config {
    pub fn new(
        client_id: String,
        client_secret: String,
        refresh_token: String,
        user_agent: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            refresh_token,
            user_agent,
            token_url: REDDIT_TOKEN_URL.to_string(),
        }
    }
}

impl From<&RedditConfig> for RedditOAuth2Config {
    fn from(config: &RedditConfig) -> Self {
        Self::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.refresh_token.clone(),
            config.user_agent.clone(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

/// Authenticated Reddit client acting as the bot's account.
pub struct RedditClient {
    config: RedditOAuth2Config,
    oauth_client: BasicClient,
    api: RedditApiClient,
    token: RwLock<Option<RedditToken>>,
}

impl RedditClient {
    pub fn new(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let api = RedditApiClient::new(config.user_agent.clone())?;
        Self::with_api(config, api)
    }

    pub fn with_api(config: RedditOAuth2Config, api: RedditApiClient) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(auth_error)?;
        let token_url = TokenUrl::new(config.token_url.clone()).map_err(auth_error)?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            config,
            oauth_client,
            api,
            token: RwLock::new(None),
        })
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .await
            .as_ref()
            .map_or(false, |token| !token.is_expired())
    }

    pub async fn set_token(&self, token: RedditToken) {
        *self.token.write().await = Some(token);
    }

    /// Exchanges the configured refresh token for a fresh access token.
    pub async fn authenticate(&self) -> Result<(), CoreError> {
        let user_agent = self.config.user_agent.clone();
        let response = self
            .oauth_client
            .exchange_refresh_token(&RefreshToken::new(self.config.refresh_token.clone()))
            .request_async(|request| token_http_client(user_agent, request))
            .await
            .map_err(|e| RedditApiError::AuthenticationFailed {
                reason: e.to_string(),
            })?;

        let expires_in = response
            .expires_in()
            .unwrap_or_else(|| Duration::from_secs(3600));
        self.set_token(RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + expires_in,
        })
        .await;

        info!("Obtained Reddit access token valid for {:?}", expires_in);
        Ok(())
    }

    async fn access_token(&self) -> Result<String, CoreError> {
        if let Some(token) = self.token.read().await.as_ref() {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
            debug!("Access token expired, refreshing");
        }

        self.authenticate().await?;
        self.token
            .read()
            .await
            .as_ref()
            .map(|token| token.access_token.clone())
            .ok_or_else(|| {
                RedditApiError::AuthenticationFailed {
                    reason: "no token after refresh".to_string(),
                }
                .into()
            })
    }

    /// Runs `call` with the current access token. A token Reddit rejects with 401 is dropped
    /// and the call is made once more with a freshly refreshed one.
    async fn authorized<T, F, Fut>(&self, call: F) -> Result<T, CoreError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let token = self.access_token().await?;
        match call(token).await {
            Err(CoreError::RedditApi(RedditApiError::InvalidToken)) => {
                warn!("Access token was rejected, refreshing");
                self.token.write().await.take();
                let token = self.access_token().await?;
                call(token).await
            }
            other => other,
        }
    }
}

impl Platform for RedditClient {
    async fn get_user(&self, name: &str) -> Result<UserHandle, CoreError> {
        let api = &self.api;
        let about = self
            .authorized(|token| async move { api.get_user_about(&token, name).await })
            .await?;
        Ok(UserHandle { name: about.name })
    }

    async fn fetch_submissions(
        &self,
        user: &UserHandle,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CoreError> {
        self.fetch_history(user, HistorySection::Submitted, ContentKind::Submission, limit)
            .await
    }

    async fn fetch_comments(
        &self,
        user: &UserHandle,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CoreError> {
        self.fetch_history(user, HistorySection::Comments, ContentKind::Comment, limit)
            .await
    }

    async fn resolve_permalink(&self, content_id: &str) -> Result<String, CoreError> {
        let api = &self.api;
        let thing = self
            .authorized(|token| async move { api.get_info(&token, content_id).await })
            .await?;
        let permalink = thing.permalink.ok_or_else(|| RedditApiError::InvalidResponse {
            details: format!("{} has no permalink", content_id),
        })?;
        Ok(absolute_permalink(&permalink))
    }

    async fn reply(&self, request: &InboxRequest, text: &str) -> Result<(), CoreError> {
        let api = &self.api;
        let fullname = request.fullname.as_str();
        self.authorized(|token| async move { api.submit_comment(&token, fullname, text).await })
            .await
    }

    async fn fetch_mentions(&self) -> Result<Vec<InboxRequest>, CoreError> {
        self.fetch_inbox(InboxFolder::Mentions, RequestKind::Mention)
            .await
    }

    async fn fetch_messages(&self) -> Result<Vec<InboxRequest>, CoreError> {
        self.fetch_inbox(InboxFolder::Messages, RequestKind::Message)
            .await
    }
}

impl RedditClient {
    async fn fetch_history(
        &self,
        user: &UserHandle,
        section: HistorySection,
        kind: ContentKind,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CoreError> {
        let api = &self.api;
        let username = user.name.as_str();
        let things = self
            .authorized(|token| async move {
                api.get_user_history(&token, username, section, limit).await
            })
            .await?;
        Ok(things
            .into_iter()
            .map(|thing| ContentItem {
                id: thing.name,
                forum: thing.subreddit,
                score: thing.score,
                kind,
            })
            .collect())
    }

    async fn fetch_inbox(
        &self,
        folder: InboxFolder,
        kind: RequestKind,
    ) -> Result<Vec<InboxRequest>, CoreError> {
        let api = &self.api;
        let items = self
            .authorized(|token| async move { api.get_inbox(&token, folder).await })
            .await?;
        Ok(items
            .into_iter()
            .map(|item| inbox_request(item, kind))
            .collect())
    }
}

fn inbox_request(item: RedditInboxData, kind: RequestKind) -> InboxRequest {
    InboxRequest {
        id: item.id,
        fullname: item.name,
        kind,
        author: item.author,
        body: item.body,
    }
}

fn auth_error(e: impl std::fmt::Display) -> CoreError {
    RedditApiError::AuthenticationFailed {
        reason: e.to_string(),
    }
    .into()
}

/// Token requests go through reqwest directly so Reddit sees the bot's user agent.
async fn token_http_client(
    user_agent: String,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(30))
        .build()?;

    let response = client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
