//! Type definitions for observed ping/pong events.

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// A `Ping` event observed on chain.
///
/// The identity of a ping is the hash of the transaction that emitted it;
/// a correct bot echoes that hash back in its pong.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRecord {
    /// Block number containing the ping.
    pub block_number: u64,
    /// Hash of the transaction that emitted the ping.
    pub tx_hash: B256,
    /// Log index within the block.
    pub log_index: u64,
}

/// A `Pong` event observed on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongRecord {
    /// Block number containing the pong.
    pub block_number: u64,
    /// Hash of the transaction that emitted the pong.
    pub tx_hash: B256,
    /// Log index within the block.
    pub log_index: u64,
    /// Ping transaction hash carried in the event payload.
    pub ping_hash: B256,
    /// Sender of the pong transaction, recovered from its receipt.
    pub responder: Address,
}
