// src/lib.rs

pub mod config;
pub mod core;
pub mod error;
pub mod oracle;
pub mod persistence;
pub mod stream;
pub mod tally;

pub use crate::config::{OracleConfig, PipelineVariant};
pub use crate::core::dictionary::DictionaryIndex;
pub use crate::core::engine::{ChannelSink, CycleOrchestrator, CycleSink, CycleStage};
pub use crate::core::history::MessageLog;
pub use crate::core::threshold::{LiveThreshold, ThresholdProvider};
pub use crate::core::types::{CycleResult, ScoredWord, SourceType, TaggedWord, WordLevel};
pub use crate::error::{OracleError, Result};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logs to stderr so stdout stays free for cycle output. `RUST_LOG`
/// overrides the level picked by `verbose`.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Loads a word list, or a bincode snapshot when the path ends in `.bin`.
/// With no path the bundled list is used. An empty list is not an error;
/// cycles over it simply find no words.
pub fn load_dictionary(path: Option<&std::path::Path>) -> Result<DictionaryIndex> {
    let Some(path) = path else {
        return Ok(DictionaryIndex::bundled());
    };
    let dictionary = DictionaryIndex::new();
    if path.extension().is_some_and(|ext| ext == "bin") {
        persistence::restore_dictionary(&dictionary, path)?;
    } else {
        dictionary.load_from_path(path)?;
    }
    Ok(dictionary)
}
