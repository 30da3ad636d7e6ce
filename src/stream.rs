// File: src/stream.rs
use crate::core::engine::CycleOrchestrator;
use crate::error::OracleError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Counts of what happened over one `drive` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveSummary {
    pub emitted: usize,
    pub refused: usize,
}

/// Calls `run_once` every `period` until `shutdown` turns true (or its
/// sender is dropped), or until `max_cycles` cycles have been emitted.
///
/// Ticks refused because streaming is stopped are counted and skipped. The
/// cycle running when shutdown arrives completes before this returns.
pub async fn drive(
    orchestrator: Arc<CycleOrchestrator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    max_cycles: Option<usize>,
) -> DriveSummary {
    let mut summary = DriveSummary::default();
    let mut ticker = interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_ms = period.as_millis() as u64, "Stream driver started");

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                match orchestrator.run_once().await {
                    Ok(_) => summary.emitted += 1,
                    Err(err @ (OracleError::Stopped | OracleError::CycleInFlight(_))) => {
                        summary.refused += 1;
                        debug!(reason = %err, "Tick refused");
                    }
                    Err(err) => error!(error = %err, "Tick failed"),
                }
                if max_cycles.is_some_and(|max| summary.emitted >= max) {
                    break;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!(emitted = summary.emitted, refused = summary.refused, "Stream driver finished");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OracleConfig;
    use crate::core::dictionary::DictionaryIndex;
    use crate::oracle::entropy::SeededEntropy;

    fn orchestrator() -> Arc<CycleOrchestrator> {
        let dictionary = DictionaryIndex::new();
        dictionary.load_from(["STAR", "RATE", "TEAR", "ART", "EAT"]);
        Arc::new(
            CycleOrchestrator::builder(OracleConfig::default())
                .dictionary(Arc::new(dictionary))
                .entropy(Arc::new(SeededEntropy::new(11)))
                .build()
                .unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_max_cycles() {
        let orchestrator = orchestrator();
        let (_tx, rx) = watch::channel(false);
        let summary = drive(Arc::clone(&orchestrator), Duration::from_secs(1), rx, Some(3)).await;
        assert_eq!(summary, DriveSummary { emitted: 3, refused: 0 });
        assert_eq!(orchestrator.grid_number(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_signal_ends_the_loop() {
        let orchestrator = orchestrator();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(drive(Arc::clone(&orchestrator), Duration::from_secs(1), rx, None));
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        tx.send(true).unwrap();
        let summary = handle.await.unwrap();
        assert!(summary.emitted >= 2);
        assert_eq!(orchestrator.grid_number() as usize, summary.emitted);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_streaming_refuses_ticks() {
        let orchestrator = orchestrator();
        orchestrator.stop();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(drive(Arc::clone(&orchestrator), Duration::from_secs(1), rx, None));
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        drop(tx);
        let summary = handle.await.unwrap();
        assert_eq!(summary.emitted, 0);
        assert!(summary.refused >= 3);
        assert_eq!(orchestrator.grid_number(), 0);
    }
}
