//! Rendering of audit results as tables and JSON documents.

use alloy::primitives::{Address, B256};
use chrono::Utc;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use pong_data::types::{PingRecord, PongRecord};
use serde::Serialize;

use crate::matching::{AuditReport, MatchedPair};

/// Ping-to-pong delay statistics over the matched pairs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ResponseStats {
    /// Fastest answer, in blocks.
    pub min_delay_blocks: u64,
    /// Slowest answer, in blocks.
    pub max_delay_blocks: u64,
    /// Mean answer delay, in blocks.
    pub mean_delay_blocks: f64,
}

/// Aggregates delay statistics; `None` when nothing matched.
pub fn response_stats(matched: &[MatchedPair]) -> Option<ResponseStats> {
    if matched.is_empty() {
        return None;
    }

    let mut min = u64::MAX;
    let mut max = 0_u64;
    let mut total = 0_u64;
    for pair in matched {
        min = min.min(pair.delay_blocks);
        max = max.max(pair.delay_blocks);
        total += pair.delay_blocks;
    }

    Some(ResponseStats {
        min_delay_blocks: min,
        max_delay_blocks: max,
        mean_delay_blocks: total as f64 / matched.len() as f64,
    })
}

/// JSON document for one audit run.
#[derive(Debug, Serialize)]
pub struct AuditDocument<'a> {
    /// Candidate bot address (checksummed hex).
    pub candidate: String,
    /// First block of the audited range.
    pub start_block: u64,
    /// Last block of the audited range.
    pub end_block: u64,
    /// RFC 3339 timestamp of report generation.
    pub generated_at: String,
    /// The audit findings.
    pub report: &'a AuditReport,
    /// Delay statistics, when any pair matched.
    pub response_stats: Option<ResponseStats>,
}

/// Builds the serializable audit document, stamped with the current time.
pub fn audit_document<'a>(
    bot: Address,
    start_block: u64,
    end_block: u64,
    report: &'a AuditReport,
    response_stats: Option<ResponseStats>,
) -> AuditDocument<'a> {
    AuditDocument {
        candidate: bot.to_string(),
        start_block,
        end_block,
        generated_at: Utc::now().to_rfc3339(),
        report,
        response_stats,
    }
}

/// Renders the audit summary as a two-column table.
pub fn render_summary_table(
    bot: Address,
    start_block: u64,
    end_block: u64,
    report: &AuditReport,
    stats: Option<&ResponseStats>,
) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);

    table.add_row(vec!["Candidate".to_string(), bot.to_string()]);
    table.add_row(vec![
        "Block Range".to_string(),
        format!("{} - {}", start_block, end_block),
    ]);
    table.add_row(vec!["Pings".to_string(), report.ping_count.to_string()]);
    table.add_row(vec!["Pongs".to_string(), report.pong_count.to_string()]);
    table.add_row(vec![
        "Duplicated Pongs".to_string(),
        report.duplicates.len().to_string(),
    ]);
    table.add_row(vec![
        "Invalid Pongs".to_string(),
        report.invalid_pongs.len().to_string(),
    ]);
    table.add_row(vec![
        "Missing Pings".to_string(),
        format!(
            "{} ({:.2}%)",
            report.missing_pings.len(),
            report.missing_percent()
        ),
    ]);

    if let Some(stats) = stats {
        table.add_row(vec![
            "Answer Delay (blocks)".to_string(),
            format!(
                "min {} / mean {:.1} / max {}",
                stats.min_delay_blocks, stats.mean_delay_blocks, stats.max_delay_blocks
            ),
        ]);
    }

    let verdict = if report.is_clean() {
        "all pings answered".to_string()
    } else {
        "issues found".to_string()
    };
    table.add_row(vec!["Verdict".to_string(), verdict]);

    table
}

/// Renders the raw event stream as a table, ordered by block and log index.
pub fn render_events_table(pings: &[PingRecord], pongs: &[PongRecord]) -> Table {
    let mut rows: Vec<(u64, u64, Vec<String>)> = Vec::with_capacity(pings.len() + pongs.len());

    for ping in pings {
        rows.push((
            ping.block_number,
            ping.log_index,
            vec![
                ping.block_number.to_string(),
                "Ping".to_string(),
                short_hash(&ping.tx_hash),
                "-".to_string(),
                "-".to_string(),
            ],
        ));
    }
    for pong in pongs {
        rows.push((
            pong.block_number,
            pong.log_index,
            vec![
                pong.block_number.to_string(),
                "Pong".to_string(),
                short_hash(&pong.tx_hash),
                short_hash(&pong.ping_hash),
                pong.responder.to_string(),
            ],
        ));
    }
    rows.sort_by_key(|(block, log_index, _)| (*block, *log_index));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Block", "Event", "Tx Hash", "Echoed Ping", "Responder"]);
    for (_, _, row) in rows {
        table.add_row(row);
    }

    table
}

/// Truncated hash for table cells, e.g. `0x1234...abcd`.
pub fn short_hash(hash: &B256) -> String {
    let full = hash.to_string();
    format!("{}...{}", &full[..8], &full[full.len() - 4..])
}
