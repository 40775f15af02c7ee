use crate::classifier::{HistoryClassifier, HistoryError};
use crate::extractor::UsernameExtractor;
use crate::renderer::{not_found_message, ReportRenderer, SELF_CHECK_REPLY};
use crate::summarizer::summarize;
use finder_core::{
    AppConfig, CoreError, InboxRequest, Platform, RedditApiError, RequestLedger,
};
use tracing::{debug, info, warn};

/// What happened to one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    AlreadyProcessed,
    Malformed,
    SelfCheck,
    Replied { username: String },
    UserNotFound { username: String },
    Forbidden { username: String },
}

pub struct DispatcherSettings {
    pub bot_name: String,
    pub record_malformed_requests: bool,
}

/// Answers summoning requests, each at most once.
pub struct Dispatcher<P, L> {
    platform: P,
    ledger: L,
    extractor: UsernameExtractor,
    classifier: HistoryClassifier,
    renderer: ReportRenderer,
    bot_name: String,
    record_malformed_requests: bool,
}

impl<P: Platform, L: RequestLedger> Dispatcher<P, L> {
    pub fn new(
        platform: P,
        ledger: L,
        classifier: HistoryClassifier,
        renderer: ReportRenderer,
        settings: DispatcherSettings,
    ) -> Result<Self, CoreError> {
        let extractor = UsernameExtractor::new(&settings.bot_name)?;
        Ok(Self {
            platform,
            ledger,
            extractor,
            classifier,
            renderer,
            bot_name: settings.bot_name.to_lowercase(),
            record_malformed_requests: settings.record_malformed_requests,
        })
    }

    pub fn from_config(platform: P, ledger: L, config: &AppConfig) -> Result<Self, CoreError> {
        Self::new(
            platform,
            ledger,
            HistoryClassifier::new(config.allow_list(), config.bot.history_limit),
            ReportRenderer::from_config(&config.bot),
            DispatcherSettings {
                bot_name: config.reddit.username.clone(),
                record_malformed_requests: config.bot.record_malformed_requests,
            },
        )
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn into_parts(self) -> (P, L) {
        (self.platform, self.ledger)
    }

    /// Safe to call repeatedly for the same request; after the first recorded outcome it
    /// touches nothing but the ledger.
    pub async fn handle_request(&self, request: &InboxRequest) -> Result<RequestOutcome, CoreError> {
        if self.ledger.has_processed(&request.id).await? {
            debug!("Request {} already processed", request.id);
            return Ok(RequestOutcome::AlreadyProcessed);
        }

        let Some(username) = self.extractor.extract(&request.body) else {
            if self.record_malformed_requests {
                self.ledger.mark_processed(&request.id).await?;
            }
            debug!("Request {} does not name a user, ignoring", request.id);
            return Ok(RequestOutcome::Malformed);
        };

        let outcome = if username == self.bot_name {
            info!("Received request to check self.");
            if self.deliver(request, SELF_CHECK_REPLY).await? {
                RequestOutcome::SelfCheck
            } else {
                RequestOutcome::Forbidden { username }
            }
        } else {
            self.check_user(request, username).await?
        };

        self.ledger.mark_processed(&request.id).await?;
        Ok(outcome)
    }

    async fn check_user(
        &self,
        request: &InboxRequest,
        username: String,
    ) -> Result<RequestOutcome, CoreError> {
        match self.build_report(&username).await {
            Ok(report) => {
                if !self.deliver(request, &report).await? {
                    return Ok(RequestOutcome::Forbidden { username });
                }
                info!(
                    "Received and successfully processed request to check user {}",
                    username
                );
                Ok(RequestOutcome::Replied { username })
            }
            Err(HistoryError::UserNotFound { .. }) => {
                if !self.deliver(request, &not_found_message(&username)).await? {
                    return Ok(RequestOutcome::Forbidden { username });
                }
                info!(
                    "Received request to check user {}. Failed to find user.",
                    username
                );
                Ok(RequestOutcome::UserNotFound { username })
            }
            Err(HistoryError::AccessForbidden { .. }) => {
                info!(
                    "Received request to check user {}. Received 403 (probably banned).",
                    username
                );
                Ok(RequestOutcome::Forbidden { username })
            }
            Err(HistoryError::Platform(e)) => Err(e),
        }
    }

    async fn build_report(&self, username: &str) -> Result<String, HistoryError> {
        let history = self.classifier.classify(&self.platform, username).await?;
        let buckets = summarize(&self.platform, &history).await?;
        Ok(self.renderer.render(&history.user.name, &buckets))
    }

    /// Posts `text` as a reply. `Ok(false)` means the platform refused it (locked thread,
    /// banned from the forum); that still counts as handled.
    async fn deliver(&self, request: &InboxRequest, text: &str) -> Result<bool, CoreError> {
        match self.platform.reply(request, text).await {
            Ok(()) => Ok(true),
            Err(CoreError::RedditApi(RedditApiError::Forbidden { resource })) => {
                warn!(
                    "Reply to request {} was refused ({}), not retrying",
                    request.id, resource
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
