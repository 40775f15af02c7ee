use finder_core::{CoreError, ErrorReporter, InboxRequest, Platform, RequestLedger};
use finder_engine::{Dispatcher, RequestOutcome};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Tally of one pass over the inbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Requests that reached a final outcome during this sweep.
    pub handled: usize,
    /// Requests the ledger already knew about.
    pub skipped: usize,
    /// Requests left for a later sweep.
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: &RequestOutcome) {
        match outcome {
            RequestOutcome::AlreadyProcessed => self.skipped += 1,
            _ => self.handled += 1,
        }
    }
}

/// Polls the bot's inbox and hands every request to the dispatcher.
pub struct PollService<P, L> {
    dispatcher: Dispatcher<P, L>,
    polling_interval: Duration,
    reporter: ErrorReporter,
}

impl<P: Platform, L: RequestLedger> PollService<P, L> {
    pub fn new(dispatcher: Dispatcher<P, L>, polling_interval: Duration) -> Self {
        Self {
            dispatcher,
            polling_interval,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher<P, L> {
        &self.dispatcher
    }

    pub fn into_dispatcher(self) -> Dispatcher<P, L> {
        self.dispatcher
    }

    /// Sweeps until `shutdown` resolves. A sweep in progress is finished first.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Polling inbox every {}s",
            self.polling_interval.as_secs()
        );
        tokio::pin!(shutdown);

        loop {
            let report = self.run_once().await;
            if report != SweepReport::default() {
                info!(
                    "Sweep finished: {} handled, {} skipped, {} failed",
                    report.handled, report.skipped, report.failed
                );
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping poll loop");
                    break;
                }
                _ = tokio::time::sleep(self.polling_interval) => {}
            }
        }
    }

    /// One pass: mentions first, then private messages.
    pub async fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let mentions = match self.dispatcher.platform().fetch_mentions().await {
            Ok(mentions) => mentions,
            Err(e) => {
                self.reporter.report("Fetching mentions", &e);
                return report;
            }
        };
        self.handle_all(&mentions, &mut report).await;

        let messages = match self.dispatcher.platform().fetch_messages().await {
            Ok(messages) => messages,
            Err(e) => {
                self.reporter.report("Fetching messages", &e);
                return report;
            }
        };
        self.handle_all(&messages, &mut report).await;

        report
    }

    async fn handle_all(&self, requests: &[InboxRequest], report: &mut SweepReport) {
        for request in requests {
            match self.handle(request).await {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    report.failed += 1;
                    self.reporter
                        .report(&format!("Handling request {}", request.id), &e);
                }
            }
        }
    }

    async fn handle(&self, request: &InboxRequest) -> Result<RequestOutcome, CoreError> {
        debug!(
            "Handling {:?} request {} from {}",
            request.kind,
            request.id,
            request.author.as_deref().unwrap_or("[deleted]")
        );
        self.dispatcher.handle_request(request).await
    }
}
