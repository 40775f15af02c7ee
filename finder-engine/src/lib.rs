pub mod classifier;
pub mod dispatcher;
pub mod extractor;
pub mod renderer;
pub mod summarizer;

pub use classifier::{ClassifiedHistory, ForumActivity, HistoryClassifier, HistoryError, ScoredItem};
pub use dispatcher::{Dispatcher, DispatcherSettings, RequestOutcome};
pub use extractor::UsernameExtractor;
pub use renderer::ReportRenderer;
pub use summarizer::summarize;
