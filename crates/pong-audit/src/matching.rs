//! Pong-to-ping matching and audit findings.

use std::collections::{HashMap, HashSet};

use alloy::primitives::B256;
use pong_data::types::{PingRecord, PongRecord};
use serde::Serialize;

/// One ping hash answered by more than one pong.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DuplicatePong {
    /// Ping transaction hash echoed by the duplicated pongs.
    pub ping_hash: B256,
    /// How many pongs echoed it.
    pub pong_count: usize,
}

/// A ping paired with the earliest pong that answered it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatchedPair {
    /// The answered ping.
    pub ping: PingRecord,
    /// The earliest pong echoing the ping's transaction hash.
    pub pong: PongRecord,
    /// Blocks between the ping and its pong.
    pub delay_blocks: u64,
}

/// Full audit outcome for one candidate over a block range.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditReport {
    /// Number of pings fetched.
    pub ping_count: usize,
    /// Number of pongs fetched (bot-filtered, duplicates included).
    pub pong_count: usize,
    /// Ping hashes echoed by more than one pong.
    pub duplicates: Vec<DuplicatePong>,
    /// Echoed hashes that match no fetched ping transaction.
    pub invalid_pongs: Vec<B256>,
    /// Pings that no pong answered.
    pub missing_pings: Vec<PingRecord>,
    /// Pings paired with their earliest answering pong.
    pub matched: Vec<MatchedPair>,
    /// `1 - unique_echoed_hashes / pings`, clamped to [0, 1]. Echoed
    /// hashes count whether or not they resolve to a ping; hashes that
    /// do not are still surfaced in `invalid_pongs` and `missing_pings`.
    pub missing_ratio: f64,
}

impl AuditReport {
    /// True when every ping got exactly one valid pong.
    pub fn is_clean(&self) -> bool {
        self.pong_count == self.ping_count
            && self.duplicates.is_empty()
            && self.invalid_pongs.is_empty()
            && self.missing_pings.is_empty()
    }

    /// Missing echoed-hash coverage as a percentage.
    pub fn missing_percent(&self) -> f64 {
        self.missing_ratio * 100.0
    }
}

/// Compares the fetched pong set against the fetched ping set.
///
/// A pong answers the ping whose transaction hash it echoes. When several
/// pongs echo the same hash, the earliest one (block number, then log
/// index) counts as the answer and the group is reported in `duplicates`.
/// Echoed hashes with no corresponding ping are reported in
/// `invalid_pongs`; they never mark a ping as answered, but they do
/// count toward the echoed-hash coverage behind `missing_ratio`.
pub fn audit(pings: &[PingRecord], pongs: &[PongRecord]) -> AuditReport {
    let mut ordered_pongs: Vec<&PongRecord> = pongs.iter().collect();
    ordered_pongs.sort_by_key(|pong| (pong.block_number, pong.log_index));

    let mut pongs_by_hash: HashMap<B256, Vec<&PongRecord>> = HashMap::new();
    for pong in ordered_pongs {
        pongs_by_hash.entry(pong.ping_hash).or_default().push(pong);
    }

    let mut duplicates: Vec<DuplicatePong> = pongs_by_hash
        .iter()
        .filter(|(_, group)| group.len() > 1)
        .map(|(hash, group)| DuplicatePong {
            ping_hash: *hash,
            pong_count: group.len(),
        })
        .collect();
    duplicates.sort_by_key(|duplicate| duplicate.ping_hash);

    let known_pings: HashSet<B256> = pings.iter().map(|ping| ping.tx_hash).collect();
    let mut invalid_pongs: Vec<B256> = pongs_by_hash
        .keys()
        .filter(|hash| !known_pings.contains(*hash))
        .copied()
        .collect();
    invalid_pongs.sort();

    let mut matched = Vec::new();
    let mut missing_pings = Vec::new();
    for ping in pings {
        match pongs_by_hash
            .get(&ping.tx_hash)
            .and_then(|group| group.first())
        {
            Some(pong) => matched.push(MatchedPair {
                ping: ping.clone(),
                pong: (*pong).clone(),
                delay_blocks: pong.block_number.saturating_sub(ping.block_number),
            }),
            None => missing_pings.push(ping.clone()),
        }
    }

    let missing_ratio = if pings.is_empty() {
        0.0
    } else {
        (1.0 - pongs_by_hash.len() as f64 / pings.len() as f64).max(0.0)
    };

    AuditReport {
        ping_count: pings.len(),
        pong_count: pongs.len(),
        duplicates,
        invalid_pongs,
        missing_pings,
        matched,
        missing_ratio,
    }
}
