//! `logtriage rules` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use logtriage_core::config::LogTriageConfig;
use logtriage_engine::{Database, LogRule, LogSource, SourceSummary, filter_text};

use crate::cli::{RulesAction, RulesArgs};
use crate::commands::open_database;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, truncate};

/// Execute the `rules` command.
pub async fn execute(
    args: RulesArgs,
    config: &LogTriageConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        RulesAction::List { filter, limit } => execute_list(config, filter, limit, writer).await,
        RulesAction::Delete { id } => execute_delete(config, id, writer).await,
        RulesAction::Stats { top } => execute_stats(config, top, writer).await,
    }
}

async fn execute_list(
    config: &LogTriageConfig,
    filter: Option<String>,
    limit: usize,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let db = open_database(config).await?;
    let rules = db.rules().await;
    let shown = filter_text(rules.reversed(), filter.as_deref().unwrap_or(""), limit);

    let report = RuleListReport {
        total: rules.len(),
        version: rules.version(),
        rules: shown.iter().map(RuleEntry::from_rule).collect(),
    };
    writer.render(&report)
}

async fn execute_delete(
    config: &LogTriageConfig,
    id: u64,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let db = open_database(config).await?;
    db.delete(id).await?;
    info!(rule_id = id, "rule deleted via cli");

    writer.render(&RuleDeleteReport {
        id,
        version: db.rules().await.version(),
    })
}

async fn execute_stats(
    config: &LogTriageConfig,
    top: usize,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let db = open_database(config).await?;
    let report = stats_report(&db, top).await;
    writer.render(&report)
}

/// Polls the source at most once; `logs` is -1 when nothing could be fetched.
async fn stats_report<S: LogSource>(db: &Database<S>, top: usize) -> RuleStatsReport {
    let sources = db.source_summary(top).await;
    let logs = db
        .buffered_log_count()
        .await
        .map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
    RuleStatsReport { logs, sources }
}

#[derive(Serialize)]
pub struct RuleListReport {
    pub total: usize,
    pub version: u64,
    pub rules: Vec<RuleEntry>,
}

#[derive(Serialize)]
pub struct RuleEntry {
    pub id: u64,
    pub ham: bool,
    pub disabled: bool,
    pub version: u64,
    pub matchers: Vec<String>,
    pub comment: String,
}

impl RuleEntry {
    fn from_rule(rule: &Arc<LogRule>) -> Self {
        Self {
            id: rule.id,
            ham: rule.ham,
            disabled: rule.disabled,
            version: rule.version,
            matchers: rule
                .matchers
                .iter()
                .map(|m| format!("{}{}{:?}", m.field, m.op.as_str(), m.value))
                .collect(),
            comment: rule.comment.clone(),
        }
    }
}

impl Render for RuleListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Rules ({} total, version {})",
            self.total.to_string().bold(),
            self.version
        )?;
        writeln!(w)?;
        writeln!(w, "{:<6} {:<5} {:<9} Matchers", "ID", "Kind", "State")?;
        writeln!(w, "{}", "-".repeat(80))?;

        for r in &self.rules {
            let kind = if r.ham { "ham".green() } else { "spam".red() };
            let state = if r.disabled {
                "disabled".yellow()
            } else {
                "enabled".normal()
            };
            writeln!(
                w,
                "{:<6} {:<5} {:<9} {}",
                r.id,
                kind,
                state,
                truncate(&r.matchers.join(" && "), 100)
            )?;
            if !r.comment.is_empty() {
                writeln!(w, "{:<22}# {}", "", r.comment)?;
            }
        }

        Ok(())
    }
}

#[derive(Serialize)]
pub struct RuleDeleteReport {
    pub id: u64,
    pub version: u64,
}

impl Render for RuleDeleteReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Deleted rule {} (ruleset version {})", self.id, self.version)
    }
}

#[derive(Serialize)]
pub struct RuleStatsReport {
    /// Buffered logs, -1 when the source could not be read
    pub logs: i64,
    pub sources: Vec<SourceSummary>,
}

impl Render for RuleStatsReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.logs < 0 {
            writeln!(w, "Logs: {}", "unavailable".yellow())?;
        } else {
            writeln!(w, "Logs: {}", self.logs)?;
        }
        writeln!(w)?;
        writeln!(w, "{:<40} {:>6} {:>8}", "Source", "Rules", "Hits")?;
        writeln!(w, "{}", "-".repeat(56))?;
        for s in &self.sources {
            let source = if s.source.is_empty() {
                "(any)"
            } else {
                s.source.as_str()
            };
            writeln!(
                w,
                "{:<40} {:>6} {:>8}",
                truncate(source, 40),
                s.rule_count,
                s.hits
            )?;
        }
        Ok(())
    }
}
