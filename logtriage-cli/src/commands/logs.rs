//! `logtriage logs` command handler

use std::io::Write;

use serde::Serialize;

use logtriage_core::config::LogTriageConfig;
use logtriage_engine::{LogRecord, LogRules, Verdict, filter_text, split_spam};

use crate::cli::LogsArgs;
use crate::commands::open_database;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, truncate};

/// Execute the `logs` command.
pub async fn execute(
    args: LogsArgs,
    config: &LogTriageConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let db = open_database(config).await?;
    let logs = db.logs().await?;
    let rules = db.rules().await;

    let (ham, spam) = split_spam(&logs, &rules);
    let (selected, hidden) = if args.spam { (spam, ham) } else { (ham, spam) };
    let shown = filter_text(&selected, args.filter.as_deref().unwrap_or(""), args.limit);

    let report = LogListReport {
        total: logs.len(),
        hidden: hidden.len(),
        logs: shown.iter().map(|log| LogEntry::new(log, &rules)).collect(),
    };
    writer.render(&report)
}

#[derive(Serialize)]
pub struct LogListReport {
    /// Buffered logs
    pub total: usize,
    /// Logs in the other half of the ham/spam split
    pub hidden: usize,
    pub logs: Vec<LogEntry>,
}

#[derive(Serialize)]
pub struct LogEntry {
    pub hash: u64,
    pub timestamp: i64,
    pub time: Option<String>,
    pub verdict: Verdict,
    pub rule_id: Option<u64>,
    pub stream: String,
    pub message: String,
}

impl LogEntry {
    fn new(log: &LogRecord, rules: &LogRules) -> Self {
        let rule = rules.match_log(log);
        Self {
            hash: log.hash(),
            timestamp: log.timestamp(),
            time: log.time().map(|t| t.to_rfc3339()),
            verdict: Verdict::of(rule.as_deref()),
            rule_id: rule.map(|r| r.id),
            stream: log.stream_string(),
            message: log.message().to_owned(),
        }
    }
}

impl Render for LogListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Logs ({} shown, {} buffered, {} hidden)",
            self.logs.len().to_string().bold(),
            self.total,
            self.hidden
        )?;
        writeln!(w)?;

        for log in &self.logs {
            let verdict = match log.verdict {
                Verdict::Ham => "ham".green(),
                Verdict::Spam => "spam".red(),
                Verdict::Unknown => "?".normal(),
            };
            let rule = log
                .rule_id
                .map(|id| format!(" rule {id}"))
                .unwrap_or_default();
            writeln!(
                w,
                "{:<20} {} {}{} {}",
                log.hash,
                log.time.as_deref().unwrap_or("-"),
                verdict,
                rule,
                log.stream.dimmed()
            )?;
            writeln!(w, "    {}", truncate(&log.message, 200))?;
        }

        Ok(())
    }
}
