//! `logtriage classify` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use logtriage_core::config::LogTriageConfig;
use logtriage_engine::Verdict;

use crate::cli::ClassifyArgs;
use crate::commands::open_database;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `classify` command.
///
/// Fetches logs first so the hash can be found in this process's buffer.
pub async fn execute(
    args: ClassifyArgs,
    config: &LogTriageConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let db = open_database(config).await?;
    db.logs().await?;

    let ham = args.ham && !args.spam;
    let rule_id = db.classify_by_hash(args.hash, ham).await?;
    info!(rule_id, hash = args.hash, ham, "classified via cli");

    let rules = db.rules().await;
    let matchers = rules
        .get(rule_id)
        .map(|r| r.matchers.len())
        .unwrap_or_default();

    writer.render(&ClassifyReport {
        hash: args.hash,
        rule_id,
        verdict: if ham { Verdict::Ham } else { Verdict::Spam },
        matchers,
    })
}

#[derive(Serialize)]
pub struct ClassifyReport {
    pub hash: u64,
    pub rule_id: u64,
    pub verdict: Verdict,
    /// Matchers in the new rule
    pub matchers: usize,
}

impl Render for ClassifyReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let verdict = match self.verdict {
            Verdict::Ham => "ham".green(),
            _ => "spam".red(),
        };
        writeln!(
            w,
            "Created rule {} ({verdict}, {} matchers) from log {}",
            self.rule_id.to_string().bold(),
            self.matchers,
            self.hash
        )
    }
}
