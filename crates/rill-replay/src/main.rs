//! # rill-replay
//!
//! Replays a JSONL capture of chat events through the streaming processor
//! and prints the resulting transcript.

#![deny(unsafe_code)]

mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rill_core::{ChatEvent, LogFormat, init_subscriber};
use rill_settings::{RillSettings, load_settings, load_settings_from_path};
use rill_stream::{
    EventProcessor, IntegrationHints, ProcessOptions, ProcessorConfig, SessionDispatcher,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::console::ConsoleHost;

/// Rill event replay.
#[derive(Parser, Debug)]
#[command(name = "rill-replay", about = "Replay a JSONL event capture and print the transcript")]
struct Cli {
    /// JSONL file to read (stdin when omitted).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Deliver events with a sequence at or below this value as replay.
    #[arg(long)]
    replay_through: Option<i64>,

    /// Settings file (defaults to `~/.rill/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level or filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,

    /// Report Supabase as connected.
    #[arg(long)]
    supabase_connected: Option<bool>,

    /// Report GitHub as connected.
    #[arg(long)]
    github_connected: Option<bool>,
}

impl Cli {
    fn load_settings(&self) -> Result<RillSettings> {
        match &self.settings {
            Some(path) => load_settings_from_path(path)
                .with_context(|| format!("Failed to load settings: {}", path.display())),
            None => load_settings().context("Failed to load settings"),
        }
    }

    fn hints(&self) -> IntegrationHints {
        IntegrationHints {
            supabase_connected: self.supabase_connected,
            github_connected: self.github_connected,
        }
    }

    fn options_for(&self, event: &ChatEvent) -> ProcessOptions {
        match self.replay_through {
            Some(limit) if event.sequence <= limit => ProcessOptions::replay(),
            _ => ProcessOptions::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        settings.logging.format
    };
    init_subscriber(level, format);

    let processor = EventProcessor::new(ProcessorConfig::from_settings(&settings))
        .context("Failed to build event processor")?;
    let host = Arc::new(ConsoleHost::new(cli.hints()));
    let dispatcher = SessionDispatcher::new(Arc::new(processor), host.clone(), host.clone());

    let delivered = match &cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input: {}", path.display()))?;
            replay_lines(&cli, &dispatcher, BufReader::new(file)).await?
        }
        None => replay_lines(&cli, &dispatcher, BufReader::new(tokio::io::stdin())).await?,
    };

    let sessions = dispatcher.worker_count();
    dispatcher.shutdown().await;
    info!(events = delivered, sessions, "replay complete");

    print!("{}", host.render());
    Ok(())
}

/// Decode each line and hand it to the dispatcher; malformed lines are skipped.
async fn replay_lines<R>(cli: &Cli, dispatcher: &SessionDispatcher, reader: R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    let mut delivered = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match ChatEvent::from_json(&line) {
            Ok(event) => {
                let options = cli.options_for(&event);
                dispatcher.dispatch(event, options);
                delivered += 1;
            }
            Err(error) => warn!(line = line_no, %error, "skipping malformed event"),
        }
    }
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_threshold_is_inclusive() {
        let cli = Cli::parse_from(["rill-replay", "--replay-through", "2"]);
        let at = ChatEvent::new("s1", 2, "claude.assistant", serde_json::json!({}));
        let after = ChatEvent::new("s1", 3, "claude.assistant", serde_json::json!({}));
        assert!(cli.options_for(&at).replay);
        assert!(!cli.options_for(&after).replay);
    }

    #[test]
    fn hints_pass_through() {
        let cli = Cli::parse_from(["rill-replay", "--github-connected", "true"]);
        let hints = cli.hints();
        assert_eq!(hints.github_connected, Some(true));
        assert_eq!(hints.supabase_connected, None);
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let cli = Cli::parse_from(["rill-replay"]);
        let processor = Arc::new(EventProcessor::new(ProcessorConfig::default()).unwrap());
        let host = Arc::new(ConsoleHost::new(IntegrationHints::default()));
        let dispatcher = SessionDispatcher::new(processor, host.clone(), host.clone());
        let input = concat!(
            r#"{"sessionId":"s1","sequence":1,"event":"claude.assistant","createdAt":"2026-01-01T00:00:00Z","payload":{"raw":{"content":"Hi"}}}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"sessionId":"s1","sequence":2,"event":"claude.result.success","createdAt":"2026-01-01T00:00:01Z","payload":{"raw":{}}}"#,
            "\n",
        );
        let delivered = replay_lines(&cli, &dispatcher, BufReader::new(input.as_bytes()))
            .await
            .unwrap();
        dispatcher.shutdown().await;
        assert_eq!(delivered, 2);
        host.with_transcript(|t| {
            assert_eq!(t.turns, 1);
            assert_eq!(t.entries()[0].text, "Hi");
        });
    }
}
