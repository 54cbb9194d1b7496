//! Integration tests for report rendering and delay statistics.

mod common;

use common::{sample_ping, sample_pong, BOT};
use pong_audit::matching::audit;
use pong_audit::report::{audit_document, render_summary_table, response_stats};

/// Delay statistics over three answers at 1, 3, and 8 blocks.
///
/// Expected: min 1, max 8, mean (1 + 3 + 8) / 3 = 4.
#[test]
fn delay_stats_across_matched_pairs() {
    let pings = vec![
        sample_ping(100, 1),
        sample_ping(200, 2),
        sample_ping(300, 3),
    ];
    let pongs = vec![
        sample_pong(101, 1),
        sample_pong(203, 2),
        sample_pong(308, 3),
    ];

    let report = audit(&pings, &pongs);
    let stats = response_stats(&report.matched).unwrap();
    assert_eq!(stats.min_delay_blocks, 1);
    assert_eq!(stats.max_delay_blocks, 8);
    assert!((stats.mean_delay_blocks - 4.0).abs() < 1e-12);
}

/// The summary table surfaces the failure counts a reviewer scans for.
#[test]
fn summary_table_reports_missing_pings() {
    let pings = vec![sample_ping(100, 1), sample_ping(110, 2)];
    let pongs = vec![sample_pong(101, 1)];

    let report = audit(&pings, &pongs);
    let rendered =
        render_summary_table(BOT, 100, 120, &report, None).to_string();

    assert!(rendered.contains("Missing Pings"));
    assert!(rendered.contains("1 (50.00%)"));
    assert!(rendered.contains("issues found"));
}

/// The JSON document round-trips the findings for downstream tooling.
#[test]
fn json_document_carries_full_findings() {
    let pings = vec![sample_ping(100, 1), sample_ping(110, 2)];
    let pongs = vec![sample_pong(101, 1)];

    let report = audit(&pings, &pongs);
    let stats = response_stats(&report.matched);
    let document = audit_document(BOT, 100, 120, &report, stats);

    let value = serde_json::to_value(&document).unwrap();
    assert_eq!(value["end_block"], 120);
    assert_eq!(value["report"]["ping_count"], 2);
    assert_eq!(value["report"]["pong_count"], 1);
    assert_eq!(value["report"]["missing_pings"].as_array().unwrap().len(), 1);
    assert_eq!(value["response_stats"]["min_delay_blocks"], 1);
    assert!(value["generated_at"].is_string());
}
