//! Alloy RPC provider integration for fetching ping/pong contract events.
//!
//! Queries `eth_getLogs` over a block range in fixed-size chunks and maps
//! the raw logs to pong-data record types.

use alloy::network::Ethereum;
use alloy::primitives::{Address, B256};
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::eth::{Filter, Log};
use alloy::sol_types::SolEvent;
use eyre::{eyre, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::contract::ping_pong::IPingPong;
use crate::types::{PingRecord, PongRecord};

type ProviderType = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider<Ethereum>,
>;

/// Widest block span requested per `eth_getLogs` call. Public endpoints
/// reject unbounded ranges.
const LOG_CHUNK_SPAN: u64 = 10_000;

/// Concurrent receipt lookups when resolving pong senders.
const MAX_CONCURRENT_RECEIPTS: usize = 10;

/// Fetches `Ping`/`Pong` events from the monitored contract via an Alloy provider.
pub struct EventFetcher {
    provider: Arc<ProviderType>,
    contract: Address,
}

impl EventFetcher {
    /// Creates a new EventFetcher and tests RPC connectivity.
    ///
    /// Verifies the connection with an `eth_blockNumber` call before any
    /// event query runs.
    ///
    /// # Errors
    /// Returns error if the URL is malformed or the connectivity test fails.
    #[tracing::instrument(skip_all, fields(rpc_url = %rpc_url, contract = %contract))]
    pub async fn new(rpc_url: &str, contract: Address) -> Result<Self> {
        let provider =
            ProviderBuilder::new().on_http(rpc_url.parse().wrap_err("invalid RPC URL format")?);
        let provider = Arc::new(provider);

        let block_number = provider
            .get_block_number()
            .await
            .wrap_err("failed to test RPC connectivity with eth_blockNumber")?;

        tracing::info!(
            contract = %contract,
            latest_block = block_number,
            "RPC connection successful"
        );

        Ok(Self { provider, contract })
    }

    /// Current chain head block number.
    pub async fn latest_block(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .wrap_err("failed to fetch latest block number")
    }

    /// Fetches all `Ping` events emitted by the contract in `[start, end]`.
    ///
    /// # Errors
    /// Returns error if a chunk still fails after the retry budget or a log
    /// arrives without block metadata.
    #[tracing::instrument(skip(self), fields(start, end))]
    pub async fn fetch_pings(&self, start: u64, end: u64) -> Result<Vec<PingRecord>> {
        tracing::info!(start, end, "fetching ping events");

        let logs = self
            .fetch_logs_chunked(IPingPong::Ping::SIGNATURE, start, end)
            .await?;

        let mut pings = Vec::with_capacity(logs.len());
        for log in logs {
            let (block_number, tx_hash, log_index) = log_position(&log, "ping")?;
            pings.push(PingRecord {
                block_number,
                tx_hash,
                log_index,
            });
        }

        Ok(pings)
    }

    /// Fetches all `Pong` events emitted by the contract in `[start, end]`.
    ///
    /// Each pong's sender is resolved from its transaction receipt; when
    /// `bot` is given, only pongs sent by that address are returned. Receipt
    /// lookups run concurrently, capped by a `tokio::sync::Semaphore`.
    ///
    /// # Errors
    /// Returns error if log fetching fails, a pong payload cannot be
    /// decoded, or a receipt is missing.
    #[tracing::instrument(skip(self), fields(start, end))]
    pub async fn fetch_pongs(
        &self,
        start: u64,
        end: u64,
        bot: Option<Address>,
    ) -> Result<Vec<PongRecord>> {
        match bot {
            Some(bot) => tracing::info!(start, end, bot = %bot, "fetching pong events for bot"),
            None => tracing::info!(start, end, "fetching pong events"),
        }

        let logs = self
            .fetch_logs_chunked(IPingPong::Pong::SIGNATURE, start, end)
            .await?;

        let mut raw = Vec::with_capacity(logs.len());
        for log in logs {
            let (block_number, tx_hash, log_index) = log_position(&log, "pong")?;
            let decoded = IPingPong::Pong::decode_log(&log.inner, true)
                .wrap_err_with(|| format!("failed to decode pong payload in tx {}", tx_hash))?;
            raw.push((block_number, tx_hash, log_index, decoded.data.txHash));
        }

        let pb = ProgressBar::new(raw.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pong senders")
                .unwrap(),
        );

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_RECEIPTS));
        let resolved = futures::future::try_join_all(raw.into_iter().map(
            |(block_number, tx_hash, log_index, ping_hash)| {
                let sem = semaphore.clone();
                let pb = pb.clone();
                async move {
                    let _permit = sem.acquire().await.ok();
                    let responder = self
                        .sender_of(tx_hash)
                        .await?
                        .ok_or_else(|| eyre!("receipt not found for pong tx {}", tx_hash))?;
                    pb.inc(1);
                    Ok::<_, eyre::Report>(PongRecord {
                        block_number,
                        tx_hash,
                        log_index,
                        ping_hash,
                        responder,
                    })
                }
            },
        ))
        .await?;
        pb.finish_and_clear();

        let pongs: Vec<PongRecord> = match bot {
            Some(bot) => resolved
                .into_iter()
                .filter(|pong| pong.responder == bot)
                .collect(),
            None => resolved,
        };

        Ok(pongs)
    }

    /// Sender address of a transaction, from its receipt.
    ///
    /// Returns `Ok(None)` if the transaction is unknown to the endpoint.
    pub async fn sender_of(&self, tx_hash: B256) -> Result<Option<Address>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .wrap_err_with(|| format!("failed to fetch receipt {}", tx_hash))?;
        Ok(receipt.map(|receipt| receipt.from))
    }

    /// Block number containing a transaction, from its receipt.
    ///
    /// Returns `Ok(None)` if the transaction is unknown or still pending.
    pub async fn block_number_of(&self, tx_hash: B256) -> Result<Option<u64>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .wrap_err_with(|| format!("failed to fetch receipt {}", tx_hash))?;
        Ok(receipt.and_then(|receipt| receipt.block_number))
    }

    /// Fetches logs for one event signature over `[start, end]` in chunks.
    ///
    /// Each chunk is retried up to 3 times with 500ms exponential backoff
    /// before the whole range fails.
    async fn fetch_logs_chunked(
        &self,
        event_signature: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<Log>> {
        let spans = chunk_spans(start, end, LOG_CHUNK_SPAN);
        let pb = ProgressBar::new(spans.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks")
                .unwrap(),
        );

        let mut logs = Vec::new();
        for (chunk_start, chunk_end) in spans {
            let filter = Filter::new()
                .address(self.contract)
                .event(event_signature)
                .from_block(chunk_start)
                .to_block(chunk_end);

            let mut attempt = 0;
            let chunk = loop {
                match self.provider.get_logs(&filter).await {
                    Ok(chunk) => break chunk,
                    Err(_e) if attempt < 2 => {
                        let backoff_ms = 500 * 2_u64.pow(attempt);
                        tracing::debug!(
                            chunk_start,
                            chunk_end,
                            attempt = attempt + 1,
                            backoff_ms,
                            "retrying failed log fetch"
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        attempt += 1;
                    }
                    Err(e) => {
                        return Err(e).wrap_err_with(|| {
                            format!(
                                "failed to fetch {} logs for blocks {}-{}",
                                event_signature, chunk_start, chunk_end
                            )
                        })
                    }
                }
            };

            logs.extend(chunk);
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(logs)
    }
}

/// Splits `[start, end]` into inclusive spans of at most `span` blocks.
fn chunk_spans(start: u64, end: u64, span: u64) -> Vec<(u64, u64)> {
    let mut spans = Vec::new();
    let mut chunk_start = start;
    while chunk_start <= end {
        let chunk_end = chunk_start.saturating_add(span - 1).min(end);
        spans.push((chunk_start, chunk_end));
        if chunk_end == u64::MAX {
            break;
        }
        chunk_start = chunk_end + 1;
    }
    spans
}

/// Extracts block number, tx hash, and log index from a fetched log.
///
/// Logs from `eth_getLogs` over a bounded range are mined, so missing
/// position metadata is an endpoint bug and surfaces as an error.
fn log_position(log: &Log, kind: &str) -> Result<(u64, B256, u64)> {
    let block_number = log
        .block_number
        .ok_or_else(|| eyre!("{} log missing block number", kind))?;
    let tx_hash = log
        .transaction_hash
        .ok_or_else(|| eyre!("{} log missing transaction hash", kind))?;
    let log_index = log
        .log_index
        .ok_or_else(|| eyre!("{} log missing log index", kind))?;
    Ok((block_number, tx_hash, log_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::addresses;

    #[tokio::test]
    async fn new_requires_valid_url() {
        let result = EventFetcher::new("not a url", addresses::PING_PONG).await;
        assert!(result.is_err(), "should reject malformed URL");
    }

    #[test]
    fn chunk_spans_covers_range_without_overlap() {
        let spans = chunk_spans(0, 25_000, 10_000);
        assert_eq!(spans, vec![(0, 9_999), (10_000, 19_999), (20_000, 25_000)]);
    }

    #[test]
    fn chunk_spans_single_block_range() {
        assert_eq!(chunk_spans(42, 42, 10_000), vec![(42, 42)]);
    }

    #[test]
    fn chunk_spans_exact_multiple() {
        let spans = chunk_spans(100, 299, 100);
        assert_eq!(spans, vec![(100, 199), (200, 299)]);
    }
}
