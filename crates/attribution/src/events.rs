// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Transfer events and log querying utilities.

use alloy::{
    primitives::{Address, B256, U256},
    providers::Provider,
    rpc::types::{BlockNumberOrTag, Filter, Log},
    sol,
    sol_types::SolEvent,
};
use anyhow::Context;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::{AttributionError, LOG_QUERY_CHUNK_SIZE};

sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// A single ERC-20 transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub block_number: u64,
    pub log_index: u64,
    pub from: Address,
    pub to: Address,
    pub token: Address,
    pub amount: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
}

impl TransferEvent {
    /// Position of the event in the chain's total order.
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }

    /// Build a [TransferEvent] from a raw log, returning `None` if the log is not a decodable
    /// `Transfer` or is missing its position.
    pub fn from_log(log: &Log) -> Option<Self> {
        let decoded = log.log_decode::<Transfer>().ok()?;
        Some(Self {
            block_number: log.block_number?,
            log_index: log.log_index?,
            from: decoded.inner.data.from,
            to: decoded.inner.data.to,
            token: decoded.inner.address,
            amount: decoded.inner.data.value,
            transaction_hash: log.transaction_hash,
        })
    }
}

/// Sort events by `(block_number, log_index)` and drop duplicates returned by overlapping
/// queries.
pub fn sort_and_dedup(events: &mut Vec<TransferEvent>) {
    events.sort_by_key(TransferEvent::position);
    events.dedup_by_key(|event| event.position());
}

/// Check that `(block_number, log_index)` is strictly increasing.
pub fn ensure_ordered(events: &[TransferEvent]) -> Result<(), AttributionError> {
    for pair in events.windows(2) {
        if pair[1].position() <= pair[0].position() {
            return Err(AttributionError::UnorderedEvents {
                block_number: pair[1].block_number,
                log_index: pair[1].log_index,
            });
        }
    }
    Ok(())
}

/// Split an inclusive block range into [LOG_QUERY_CHUNK_SIZE] chunks to avoid hitting provider
/// limits.
pub fn block_ranges(from_block: u64, to_block: u64) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    let mut current_from = from_block;
    while current_from <= to_block {
        let current_to = current_from.saturating_add(LOG_QUERY_CHUNK_SIZE - 1).min(to_block);
        ranges.push((current_from, current_to));
        if current_to == u64::MAX {
            break;
        }
        current_from = current_to + 1;
    }
    ranges
}

/// Fetch every transfer of `tokens` sent from or to `filter_address` in the inclusive block range.
///
/// Chunks of the range are queried with at most `max_concurrency` requests in flight. The result
/// is sorted by `(block_number, log_index)` and deduplicated; undecodable logs are skipped.
pub async fn fetch_transfer_events<P: Provider>(
    provider: &P,
    tokens: &[Address],
    from_block: u64,
    to_block: u64,
    filter_address: Address,
    max_concurrency: usize,
) -> anyhow::Result<Vec<TransferEvent>> {
    if tokens.is_empty() || from_block > to_block {
        return Ok(Vec::new());
    }
    tracing::info!(
        "Fetching transfer events for {} tokens ({} blocks)...",
        tokens.len(),
        to_block - from_block + 1
    );

    let base = Filter::new().address(tokens.to_vec()).event_signature(Transfer::SIGNATURE_HASH);
    let outgoing = base.clone().topic1(filter_address.into_word());
    let incoming = base.topic2(filter_address.into_word());

    let queries: Vec<_> = block_ranges(from_block, to_block)
        .into_iter()
        .flat_map(|range| [(&outgoing, range, "outgoing"), (&incoming, range, "incoming")])
        .collect();

    // At most `max_concurrency` requests in flight.
    let mut chunks: Vec<Vec<Log>> = Vec::with_capacity(queries.len());
    for batch in queries.chunks(max_concurrency.max(1)) {
        let futures: Vec<_> = batch
            .iter()
            .map(|(filter, (from, to), direction)| async move {
                let chunk_filter = (*filter)
                    .clone()
                    .from_block(BlockNumberOrTag::Number(*from))
                    .to_block(BlockNumberOrTag::Number(*to));
                provider.get_logs(&chunk_filter).await.with_context(|| {
                    format!("Failed to get {direction} transfer logs {from}..={to}")
                })
            })
            .collect();
        chunks.extend(try_join_all(futures).await?);
    }

    let mut skipped = 0usize;
    let mut events = Vec::new();
    for log in chunks.iter().flatten() {
        match TransferEvent::from_log(log) {
            Some(event) => events.push(event),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!("Skipped {skipped} undecodable transfer logs");
    }

    sort_and_dedup(&mut events);
    tracing::info!("Fetched {} transfer events", events.len());
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    const TOKEN: Address = address!("0x00000000000000000000000000000000000000aa");
    const ALICE: Address = address!("0x0000000000000000000000000000000000000001");
    const BOB: Address = address!("0x0000000000000000000000000000000000000002");

    fn event(block_number: u64, log_index: u64) -> TransferEvent {
        TransferEvent {
            block_number,
            log_index,
            from: ALICE,
            to: BOB,
            token: TOKEN,
            amount: U256::from(1u64),
            transaction_hash: None,
        }
    }

    #[test]
    fn decode_transfer_log() {
        let tx = b256!("0x1111111111111111111111111111111111111111111111111111111111111111");
        let data = Transfer { from: ALICE, to: BOB, value: U256::from(5u64) }.encode_log_data();
        let log = Log {
            inner: alloy::primitives::Log { address: TOKEN, data },
            block_number: Some(10),
            log_index: Some(3),
            transaction_hash: Some(tx),
            ..Default::default()
        };

        let event = TransferEvent::from_log(&log).unwrap();
        assert_eq!(event.block_number, 10);
        assert_eq!(event.log_index, 3);
        assert_eq!(event.from, ALICE);
        assert_eq!(event.to, BOB);
        assert_eq!(event.token, TOKEN);
        assert_eq!(event.amount, U256::from(5u64));
        assert_eq!(event.transaction_hash, Some(tx));
    }

    #[test]
    fn pending_log_is_skipped() {
        let data = Transfer { from: ALICE, to: BOB, value: U256::from(5u64) }.encode_log_data();
        let log = Log {
            inner: alloy::primitives::Log { address: TOKEN, data },
            log_index: Some(3),
            ..Default::default()
        };
        assert!(TransferEvent::from_log(&log).is_none());
    }

    #[test]
    fn sort_and_dedup_orders_events() {
        let mut events = vec![event(2, 0), event(1, 5), event(1, 1), event(2, 0)];
        sort_and_dedup(&mut events);
        let positions: Vec<_> = events.iter().map(TransferEvent::position).collect();
        assert_eq!(positions, vec![(1, 1), (1, 5), (2, 0)]);
        ensure_ordered(&events).unwrap();
    }

    #[test]
    fn unordered_events_rejected() {
        let events = vec![event(1, 1), event(1, 1)];
        assert!(matches!(
            ensure_ordered(&events),
            Err(AttributionError::UnorderedEvents { block_number: 1, log_index: 1 })
        ));
        let events = vec![event(2, 0), event(1, 9)];
        assert!(ensure_ordered(&events).is_err());
    }

    #[test]
    fn block_ranges_cover_the_range_once() {
        assert_eq!(block_ranges(10, 10), vec![(10, 10)]);
        assert!(block_ranges(11, 10).is_empty());

        let ranges = block_ranges(1, 2 * LOG_QUERY_CHUNK_SIZE + 1);
        assert_eq!(
            ranges,
            vec![
                (1, LOG_QUERY_CHUNK_SIZE),
                (LOG_QUERY_CHUNK_SIZE + 1, 2 * LOG_QUERY_CHUNK_SIZE),
                (2 * LOG_QUERY_CHUNK_SIZE + 1, 2 * LOG_QUERY_CHUNK_SIZE + 1),
            ]
        );

        let tail = block_ranges(u64::MAX - 1, u64::MAX);
        assert_eq!(tail, vec![(u64::MAX - 1, u64::MAX)]);
    }

    #[test]
    fn json_amount_accepts_hex() {
        let event: TransferEvent = serde_json::from_str(
            r#"{"block_number":1,"log_index":0,
                "from":"0x0000000000000000000000000000000000000001",
                "to":"0x0000000000000000000000000000000000000002",
                "token":"0x00000000000000000000000000000000000000aa",
                "amount":"0x64"}"#,
        )
        .unwrap();
        assert_eq!(event.amount, U256::from(100u64));
        assert_eq!(event.transaction_hash, None);
    }
}
