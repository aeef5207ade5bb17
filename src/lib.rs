//! ecash-herald: classification and narration engine for eCash blocks.
//!
//! The engine is a straight-line pipeline of pure transforms: indexer
//! record -> transaction classifier -> block aggregator -> message
//! formatter, with a parallel daily summarizer over a 24h transaction
//! window. Network transport, wallet logic, and delivery are external
//! collaborators; the only async boundary (batch token/balance metadata)
//! enters as plain `Option` arguments.

pub mod block;
pub mod chronik;
pub mod classify;
pub mod format;
pub mod markup;
pub mod miner;
pub mod protocols;
pub mod registry;
pub mod summary;
pub mod types;

pub use block::parse_block;
pub use chronik::{block_from_json, tx_from_json};
pub use classify::classify_tx;
pub use format::{block_message, BlockMessageOptions};
pub use miner::{attribute_miner, attribute_staker};
pub use protocols::parse_op_return;
pub use summary::{daily_digest, summarize_window, DailySummary};
