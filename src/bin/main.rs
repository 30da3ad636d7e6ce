use anyhow::Context;
use clap::Parser;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use oracle_core::persistence::save_transcript;
use oracle_core::{
    stream, ChannelSink, CycleOrchestrator, CycleResult, LiveThreshold, MessageLog, OracleConfig,
    PipelineVariant, WordLevel,
};
use std::io::{stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Streams oracle cycles to the terminal.
#[derive(Parser, Debug)]
#[command(name = "oracle_stream", version, about)]
struct Cli {
    /// Config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Word list, or a `.bin` dictionary snapshot
    #[arg(long)]
    dictionary: Option<PathBuf>,

    /// Word threshold, 0-100
    #[arg(long)]
    threshold: Option<u32>,

    #[arg(long)]
    interval_ms: Option<u64>,

    #[arg(long)]
    variant: Option<PipelineVariant>,

    /// Stop after this many cycles
    #[arg(long)]
    cycles: Option<usize>,

    /// Write the message log here on exit
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Hide cycles that kept no words in the transcript
    #[arg(long)]
    hide_empty: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    oracle_core::init_tracing(cli.verbose);

    let mut config = OracleConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.tick_interval_ms = interval_ms;
    }
    if let Some(variant) = cli.variant {
        config.variant = variant;
    }
    config.validate()?;

    let dictionary = oracle_core::load_dictionary(cli.dictionary.as_deref())
        .context("loading dictionary")?;
    let threshold = LiveThreshold::new(config.threshold);
    let (cycle_tx, mut cycle_rx) = mpsc::unbounded_channel();
    let orchestrator = Arc::new(
        CycleOrchestrator::builder(config.clone())
            .dictionary(Arc::new(dictionary))
            .threshold(Arc::new(threshold.clone()))
            .sink(Arc::new(ChannelSink(cycle_tx)))
            .build()?,
    );

    println!("Strand oracle. Commands: '+' / '-' threshold, 'stop', 'start', 'exit'.");
    println!("---------------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut driver = tokio::spawn(stream::drive(
        Arc::clone(&orchestrator),
        Duration::from_millis(config.tick_interval_ms),
        shutdown_rx,
        cli.cycles,
    ));

    let mut log = MessageLog::new(config.log_capacity);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut out = stdout();

    let summary = loop {
        tokio::select! {
            joined = &mut driver => break joined?,
            Some(result) = cycle_rx.recv() => {
                render(&mut out, &result, threshold.get())?;
                log.push(result);
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(command) => match command.trim() {
                    "+" => println!("threshold {}", threshold.nudge(1)),
                    "-" => println!("threshold {}", threshold.nudge(-1)),
                    "stop" => orchestrator.stop(),
                    "start" => orchestrator.start(),
                    "exit" | "quit" => {
                        // the driver lets the running cycle finish, then returns
                        let _ = shutdown_tx.send(true);
                    }
                    "" => {}
                    other => warn!(command = other, "Unknown command"),
                },
                None => stdin_open = false,
            },
        }
    };

    while let Ok(result) = cycle_rx.try_recv() {
        render(&mut out, &result, threshold.get())?;
        log.push(result);
    }
    info!(emitted = summary.emitted, refused = summary.refused, "Streaming finished");

    if let Some(path) = cli.transcript {
        save_transcript(&log, config.attention_threshold, cli.hide_empty, &path)
            .with_context(|| format!("writing transcript to {}", path.display()))?;
        println!("Transcript saved to '{}'", path.display());
    }
    Ok(())
}

fn render(out: &mut impl Write, result: &CycleResult, threshold: u32) -> std::io::Result<()> {
    queue!(
        out,
        SetForegroundColor(Color::DarkGrey),
        Print(format!("\nGrid #{}", result.grid_number)),
        ResetColor,
        Print(format!(
            "  {}  attention {}/{} ({}%)  threshold {}  evaluated {}\n",
            result.emoji,
            result.attention_score,
            result.attention_samples,
            result.attention_percent(),
            threshold,
            result.total_words_evaluated
        ))
    )?;

    if result.is_empty() {
        queue!(
            out,
            SetForegroundColor(Color::DarkGrey),
            Print("  No words above cosmic threshold to display...\n"),
            ResetColor
        )?;
    }
    for word in &result.words {
        let indent = 2 * usize::from(word.tagged.level.depth());
        let color = match word.tagged.level {
            WordLevel::Primary => Color::Yellow,
            WordLevel::Secondary => Color::Cyan,
            WordLevel::Tertiary => Color::Magenta,
        };
        queue!(
            out,
            SetForegroundColor(color),
            Print(format!("{:indent$}{:<16}", "", word.word(), indent = indent)),
            ResetColor,
            Print(format!("{:>4}  x{}\n", word.score, word.frequency))
        )?;
    }
    out.flush()
}
