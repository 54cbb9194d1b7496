//! Shared test helpers and utilities.
//!
//! Provides factory functions for creating ping/pong event records with
//! sensible defaults.

#![allow(dead_code)]

use alloy::primitives::{Address, B256};
use pong_data::types::{PingRecord, PongRecord};

/// Default candidate bot address used across scenario tests.
pub const BOT: Address = Address::repeat_byte(0xbb);

/// Address of an unrelated bot, for sender-filter scenarios.
pub const OTHER_BOT: Address = Address::repeat_byte(0xcc);

/// Creates a PingRecord at the given block.
///
/// The transaction hash is derived from `seed` so that pongs can echo it
/// with `ping_hash(seed)`.
///
/// # Example
/// ```ignore
/// let ping = sample_ping(18_000_000, 1);
/// assert_eq!(ping.tx_hash, ping_hash(1));
/// ```
pub fn sample_ping(block: u64, seed: u8) -> PingRecord {
    PingRecord {
        block_number: block,
        tx_hash: ping_hash(seed),
        log_index: seed as u64,
    }
}

/// Creates a PongRecord from `BOT` at the given block, echoing the ping
/// derived from `seed`.
pub fn sample_pong(block: u64, seed: u8) -> PongRecord {
    PongRecord {
        block_number: block,
        tx_hash: B256::repeat_byte(seed ^ 0xff),
        log_index: seed as u64,
        ping_hash: ping_hash(seed),
        responder: BOT,
    }
}

/// The deterministic ping transaction hash for a seed.
pub fn ping_hash(seed: u8) -> B256 {
    B256::repeat_byte(seed)
}
