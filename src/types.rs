//! Derived records produced by the classifier and consumed by formatters,
//! plus the batch-metadata side-info types fetched through the indexer.

use std::collections::{BTreeMap, BTreeSet};

use crate::chronik::{TokenTxType, TokenType};

/// Decoded OP_RETURN application data. `stack_array` is the ordered list of
/// decoded pushes including the protocol tag at index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOpReturnInfo {
    pub app: String,
    pub msg: String,
    pub stack_array: Vec<String>,
    pub token_id: Option<String>,
}

/// Token flow of a single send/mint transaction. Amounts are undecimalized
/// atoms; decimalization needs genesis metadata supplied at format time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSendInfo {
    pub token_id: String,
    pub parsed_token_type: TokenType,
    pub tx_type: TokenTxType,
    pub token_change_outputs: BTreeMap<String, u128>,
    pub token_receiving_outputs: BTreeMap<String, u128>,
    pub token_sending_output_scripts: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGenesis {
    pub token_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBurnInfo {
    pub token_id: String,
    pub undecimalized_amount: u128,
}

/// One classified transaction. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTx {
    pub txid: String,
    pub genesis_info: Option<TokenGenesis>,
    pub op_return_info: Option<ParsedOpReturnInfo>,
    pub tx_fee_sats: u64,
    pub xec_sending_output_scripts: BTreeSet<String>,
    pub xec_receiving_outputs: BTreeMap<String, i64>,
    pub total_sats_sent: i64,
    pub token_send_info: Option<TokenSendInfo>,
    pub token_burn_info: Option<TokenBurnInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakerInfo {
    /// Cashaddr of the staking payout, or the raw script when it cannot be
    /// encoded.
    pub staker: String,
    pub reward_sats: i64,
}

/// One classified block, with the indexes used to batch-fetch token and
/// balance metadata before formatting.
#[derive(Debug, Clone)]
pub struct ParsedBlock {
    pub hash: String,
    pub height: u32,
    pub miner: String,
    pub staker: Option<StakerInfo>,
    pub num_txs: usize,
    /// Sorted descending by `total_sats_sent`, original order on ties.
    pub parsed_txs: Vec<ParsedTx>,
    pub token_ids: BTreeSet<String>,
    pub output_scripts: BTreeSet<String>,
}

/// Spot prices. The whole struct is absent when the price lookup failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Prices {
    pub xec_usd: f64,
    pub btc_usd: Option<f64>,
    pub eth_usd: Option<f64>,
}

/// Token genesis metadata from the indexer batch lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGenesisInfo {
    pub token_ticker: String,
    pub token_name: String,
    pub decimals: u32,
    pub url: String,
}

/// Address balance info from the indexer batch lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceInfo {
    pub balance_sats: i64,
    pub emoji: String,
}
