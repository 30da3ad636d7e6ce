use clap::Parser;
use oracle_core::persistence::save_transcript;
use oracle_core::{
    CycleOrchestrator, CycleResult, LiveThreshold, MessageLog, OracleConfig, OracleError,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Headless oracle driven one tick at a time over stdin/stdout.
///
/// Requests: `RUN_ONCE`, `SET_THRESHOLD n`, `STOP`, `START`,
/// `TRANSCRIPT path`, `EXIT`. Each emitted cycle is written as
/// `CYCLE {json}`; other replies are `OK ...`, `REFUSED ...` or `ERROR ...`.
#[derive(Parser, Debug)]
#[command(name = "oracle_bridge", version, about)]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    dictionary: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

/// Serializes protocol lines from the reader loop and from cycle tasks.
#[derive(Clone)]
struct Reply(Arc<Mutex<io::Stdout>>);

impl Reply {
    fn line(&self, text: &str) {
        let mut out = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!(reply = text, "Bridge ->");
        if writeln!(out, "{}", text).and_then(|_| out.flush()).is_err() {
            warn!("stdout closed");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    oracle_core::init_tracing(cli.verbose);
    info!("Oracle bridge starting");

    let config = OracleConfig::load(cli.config.as_deref())?;
    let dictionary = oracle_core::load_dictionary(cli.dictionary.as_deref())?;
    let threshold = LiveThreshold::new(config.threshold);
    let log = Arc::new(Mutex::new(MessageLog::new(config.log_capacity)));
    let reply = Reply(Arc::new(Mutex::new(io::stdout())));

    let sink = {
        let log = Arc::clone(&log);
        let reply = reply.clone();
        move |result: &CycleResult| {
            log.lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(result.clone());
            match serde_json::to_string(result) {
                Ok(json) => reply.line(&format!("CYCLE {}", json)),
                Err(err) => reply.line(&format!("ERROR encoding cycle: {}", err)),
            }
        }
    };
    let orchestrator = Arc::new(
        CycleOrchestrator::builder(config.clone())
            .dictionary(Arc::new(dictionary))
            .threshold(Arc::new(threshold.clone()))
            .sink(Arc::new(sink))
            .build()?,
    );

    let mut cycles = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(input) = lines.next_line().await? {
        debug!(request = %input, "Bridge <-");
        let mut parts = input.split_whitespace();
        let command = parts.next().unwrap_or("");

        match command {
            "RUN_ONCE" => {
                let orchestrator = Arc::clone(&orchestrator);
                let reply = reply.clone();
                cycles.spawn(async move {
                    match orchestrator.run_once().await {
                        Ok(_) => {}
                        Err(err @ (OracleError::Stopped | OracleError::CycleInFlight(_))) => {
                            reply.line(&format!("REFUSED {}", err))
                        }
                        Err(err) => reply.line(&format!("ERROR {}", err)),
                    }
                });
            }
            "SET_THRESHOLD" => match parts.next().and_then(|n| n.parse::<u32>().ok()) {
                Some(value) => {
                    threshold.set(value);
                    reply.line(&format!("OK THRESHOLD {}", threshold.get()));
                }
                None => reply.line("ERROR SET_THRESHOLD needs a number"),
            },
            "STOP" => {
                orchestrator.stop();
                reply.line("OK STOPPED");
            }
            "START" => {
                orchestrator.start();
                reply.line("OK STARTED");
            }
            "TRANSCRIPT" => match parts.next() {
                Some(path) => {
                    let snapshot = log
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .clone();
                    let path = PathBuf::from(path);
                    match save_transcript(&snapshot, config.attention_threshold, false, &path) {
                        Ok(()) => reply.line(&format!("OK TRANSCRIPT {}", path.display())),
                        Err(err) => reply.line(&format!("ERROR {}", err)),
                    }
                }
                None => reply.line("ERROR TRANSCRIPT needs a path"),
            },
            "EXIT" => break,
            "" => {}
            other => {
                warn!(command = other, "Unknown bridge command");
                reply.line(&format!("ERROR unknown command {}", other));
            }
        }

        while let Some(done) = cycles.try_join_next() {
            if let Err(err) = done {
                warn!(error = %err, "Cycle task failed");
            }
        }
    }

    // cycles already started still emit before the bridge exits
    while let Some(done) = cycles.join_next().await {
        if let Err(err) = done {
            warn!(error = %err, "Cycle task failed");
        }
    }
    info!("Oracle bridge shutting down");
    Ok(())
}
