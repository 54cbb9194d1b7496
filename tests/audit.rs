//! Integration tests for the pong audit pipeline.

mod common;

use common::{ping_hash, sample_ping, sample_pong, OTHER_BOT};
use pong_audit::matching::audit;

/// A bot that answered every ping exactly once produces a clean report.
///
/// 3 pings at blocks 100/110/120, each answered 1 block later.
#[test]
fn clean_candidate_passes_every_check() {
    let pings = vec![
        sample_ping(100, 1),
        sample_ping(110, 2),
        sample_ping(120, 3),
    ];
    let pongs = vec![
        sample_pong(101, 1),
        sample_pong(111, 2),
        sample_pong(121, 3),
    ];

    let report = audit(&pings, &pongs);
    assert!(report.is_clean());
    assert_eq!(report.ping_count, 3);
    assert_eq!(report.pong_count, 3);
    assert_eq!(report.matched.len(), 3);
    assert!(report.duplicates.is_empty());
    assert!(report.invalid_pongs.is_empty());
    assert!(report.missing_pings.is_empty());
    assert_eq!(report.missing_ratio, 0.0);
}

/// A double answer is flagged as a duplicate without marking the ping missing.
#[test]
fn duplicate_answer_is_flagged() {
    let pings = vec![sample_ping(100, 1), sample_ping(110, 2)];
    let mut late_duplicate = sample_pong(130, 1);
    late_duplicate.tx_hash = alloy::primitives::B256::repeat_byte(0xd0);
    let pongs = vec![sample_pong(101, 1), late_duplicate, sample_pong(111, 2)];

    let report = audit(&pings, &pongs);
    assert!(!report.is_clean());
    assert_eq!(report.duplicates.len(), 1);
    assert_eq!(report.duplicates[0].ping_hash, ping_hash(1));
    assert_eq!(report.duplicates[0].pong_count, 2);
    assert!(report.missing_pings.is_empty());
    // The earliest pong is the one that counts for the delay.
    assert_eq!(report.matched[0].pong.block_number, 101);
}

/// A pong echoing a hash that no ping emitted is invalid, and the real
/// ping stays missing. The fabricated hash still counts as one distinct
/// echoed hash, so the coverage percentage reads 0% here.
#[test]
fn fabricated_hash_is_invalid_and_ping_stays_missing() {
    let pings = vec![sample_ping(100, 1)];
    let mut bogus = sample_pong(105, 9);
    bogus.ping_hash = ping_hash(0x77);
    let pongs = vec![bogus];

    let report = audit(&pings, &pongs);
    assert_eq!(report.invalid_pongs, vec![ping_hash(0x77)]);
    assert_eq!(report.missing_pings, vec![sample_ping(100, 1)]);
    assert_eq!(report.missing_ratio, 0.0);
}

/// Missing percentage follows `(1 - unique_echoed_hashes / pings) * 100`.
///
/// 4 pings, 2 pongs both echoing the same hash: 1 distinct echoed hash,
/// so 1 - 1/4 = 75.00%.
#[test]
fn missing_percentage_counts_unique_echoed_hashes() {
    let pings = vec![
        sample_ping(100, 1),
        sample_ping(110, 2),
        sample_ping(120, 3),
        sample_ping(130, 4),
    ];
    let mut duplicate = sample_pong(125, 3);
    duplicate.tx_hash = alloy::primitives::B256::repeat_byte(0xd1);
    let pongs = vec![sample_pong(121, 3), duplicate];

    let report = audit(&pings, &pongs);
    assert_eq!(report.missing_pings.len(), 3);
    assert_eq!(report.duplicates.len(), 1);
    assert!((report.missing_percent() - 75.0).abs() < 1e-9);
}

/// Sender filtering happens at fetch time; the audit itself treats every
/// supplied pong as the candidate's. A pong from another responder that
/// was let through still matches.
#[test]
fn audit_is_agnostic_to_responder() {
    let pings = vec![sample_ping(100, 1)];
    let mut foreign = sample_pong(101, 1);
    foreign.responder = OTHER_BOT;
    let pongs = vec![foreign];

    let report = audit(&pings, &pongs);
    assert!(report.is_clean());
}
