//! Daily rollup: scans an arbitrary time-windowed transaction list and
//! produces ranked digest messages, structurally parallel to the per-block
//! path but aggregating across blocks.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::DateTime;
use itertools::Itertools;
use log::warn;

use crate::chronik::RawTx;
use crate::markup::{escape_html, format_xec, paginate};
use crate::miner::{attribute_miner, attribute_staker};
use crate::protocols::agora::{classify_marketplace, AgoraAction};
use crate::protocols::parse_op_return;
use crate::registry::{AppRegistry, KnownMiners, ReferenceScripts, MEMO_PREFIX};
use crate::types::Prices;

/// Ranked categories show this many entries.
const TOP_N: usize = 3;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarketStats {
    pub buys: usize,
    pub lists: usize,
    pub cancels: usize,
    pub ad_setups: usize,
    pub buy_volume_sats: i64,
}

#[derive(Debug, Default, Clone)]
pub struct DailySummary {
    pub window_start: i64,
    pub window_end: i64,
    pub blocks: usize,
    pub total_txs: usize,
    /// Pool sub-miners are folded into their parent bucket for ranking.
    pub miner_blocks: BTreeMap<String, usize>,
    pub staker_rewards: BTreeMap<String, i64>,
    pub fungible_market: MarketStats,
    pub nft_market: MarketStats,
    pub token_sends: usize,
    pub token_mints: usize,
    pub token_burns: usize,
    pub token_geneses: usize,
    pub nft_mints: usize,
    pub nft_sends: usize,
    pub nft_burns: usize,
    pub nft_by_collection: BTreeMap<String, usize>,
    pub app_txs: BTreeMap<String, usize>,
    pub reward_payouts: usize,
    pub exchange_withdrawals: usize,
    pub exchange_withdrawal_sats: i64,
}

/// Folds "Pool, sub-miner" attributions into the parent pool bucket.
fn fold_miner(name: &str) -> String {
    match name.split_once(',') {
        Some((parent, _)) => parent.trim().to_string(),
        None => name.to_string(),
    }
}

/// Aggregates a time-filtered transaction list (coinbases included) into a
/// [`DailySummary`]. The caller owns the time filtering.
pub fn summarize_window(
    txs: &[RawTx],
    window_start: i64,
    window_end: i64,
    miners: &KnownMiners,
    apps: &AppRegistry,
    refs: &ReferenceScripts,
) -> DailySummary {
    let mut summary = DailySummary {
        window_start,
        window_end,
        ..Default::default()
    };

    for tx in txs {
        if tx.is_coinbase {
            summary.blocks += 1;
            let miner = fold_miner(&attribute_miner(tx, miners));
            *summary.miner_blocks.entry(miner).or_insert(0) += 1;
            if let Some(block) = &tx.block {
                if let Some(staker) = attribute_staker(block.height, &tx.outputs) {
                    *summary.staker_rewards.entry(staker.staker).or_insert(0) +=
                        staker.reward_sats;
                }
            }
            continue;
        }
        summary.total_txs += 1;

        let first_funding = tx
            .inputs
            .first()
            .and_then(|input| input.prev_out_script.as_deref());
        if first_funding == Some(refs.token_server.as_str()) {
            summary.reward_payouts += 1;
        }
        if first_funding == Some(refs.exchange_hot_wallet.as_str()) {
            summary.exchange_withdrawals += 1;
            summary.exchange_withdrawal_sats += tx
                .outputs
                .iter()
                .filter(|output| output.output_script != refs.exchange_hot_wallet)
                .map(|output| output.sats)
                .sum::<i64>();
        }

        if let Some(entry) = tx.token_entries.first() {
            summarize_token_tx(tx, entry.token_type.is_nft_child(), &mut summary);
        } else if let Some(op_return) = tx
            .outputs
            .iter()
            .find(|output| herald_support::script::is_op_return(&output.output_script))
        {
            let info = parse_op_return(&op_return.output_script[2..], apps);
            let label = match info.stack_array.first() {
                Some(tag) if tag.len() == 4 && tag.starts_with(MEMO_PREFIX) => "memo".to_string(),
                Some(tag) => apps
                    .lookup(tag)
                    .map(|spec| spec.label.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                None => "unknown".to_string(),
            };
            *summary.app_txs.entry(label).or_insert(0) += 1;
        }
    }
    summary
}

fn summarize_token_tx(tx: &RawTx, is_nft: bool, summary: &mut DailySummary) {
    use crate::chronik::TokenTxType;

    let entry = &tx.token_entries[0];
    if entry.is_invalid {
        warn!("invalid token entry in tx {}, not summarized", tx.txid);
        return;
    }

    match entry.tx_type {
        TokenTxType::Genesis => {
            if is_nft {
                summary.nft_mints += 1;
                let group = entry
                    .group_token_id
                    .clone()
                    .unwrap_or_else(|| entry.token_id.clone());
                *summary.nft_by_collection.entry(group).or_insert(0) += 1;
            } else {
                summary.token_geneses += 1;
            }
            return;
        }
        TokenTxType::Mint => {
            if is_nft {
                summary.nft_mints += 1;
            } else {
                summary.token_mints += 1;
            }
            return;
        }
        _ => {}
    }

    let Some(market) = classify_marketplace(tx) else {
        return;
    };
    let stats = if is_nft {
        &mut summary.nft_market
    } else {
        &mut summary.fungible_market
    };
    match market.action {
        AgoraAction::Buy { volume_sats } => {
            stats.buys += 1;
            stats.buy_volume_sats += volume_sats;
        }
        AgoraAction::List => stats.lists += 1,
        AgoraAction::Cancel => stats.cancels += 1,
        AgoraAction::AdSetup => stats.ad_setups += 1,
        AgoraAction::Burn => {
            if is_nft {
                summary.nft_burns += 1;
            } else {
                summary.token_burns += 1;
            }
        }
        AgoraAction::Send => {
            if is_nft {
                summary.nft_sends += 1;
            } else {
                summary.token_sends += 1;
            }
        }
    }
    if is_nft {
        *summary
            .nft_by_collection
            .entry(market.group_id)
            .or_insert(0) += 1;
    }
}

fn date_of(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn market_line(label: &str, emoji: &str, stats: &MarketStats) -> Option<String> {
    if *stats == MarketStats::default() {
        return None;
    }
    Some(format!(
        "{emoji} {label}: {} buys ({} XEC) | {} lists | {} cancels | {} ad setups",
        stats.buys,
        format_xec(stats.buy_volume_sats),
        stats.lists,
        stats.cancels,
        stats.ad_setups
    ))
}

/// Renders the ranked daily digest with the same pagination contract as the
/// per-block formatter.
pub fn daily_digest(summary: &DailySummary, prices: Option<&Prices>) -> Result<Vec<String>> {
    let mut sections: Vec<Vec<String>> = Vec::new();

    let mut header = vec![format!(
        "📅 Daily summary | {} | {} blocks, {} txs",
        date_of(summary.window_start),
        summary.blocks,
        summary.total_txs
    )];
    if let Some(prices) = prices {
        header.push(format!(
            "💲 1 XEC = {}",
            crate::markup::format_fiat(100, prices.xec_usd)
        ));
    }
    sections.push(header);

    if !summary.miner_blocks.is_empty() {
        let mut lines = vec!["⛏ Top miners:".to_string()];
        for (name, count) in summary
            .miner_blocks
            .iter()
            .sorted_by(|a, b| b.1.cmp(a.1))
            .take(TOP_N)
        {
            lines.push(format!("   {count} blocks | {}", escape_html(name)));
        }
        sections.push(lines);
    }

    if !summary.staker_rewards.is_empty() {
        let mut lines = vec!["💰 Top stakers:".to_string()];
        for (staker, sats) in summary
            .staker_rewards
            .iter()
            .sorted_by(|a, b| b.1.cmp(a.1))
            .take(TOP_N)
        {
            lines.push(format!(
                "   {} XEC | {}",
                format_xec(*sats),
                escape_html(staker)
            ));
        }
        sections.push(lines);
    }

    let mut market_lines = Vec::new();
    if let Some(line) = market_line("Token market", "🏪", &summary.fungible_market) {
        market_lines.push(line);
    }
    if let Some(line) = market_line("NFT market", "🖼", &summary.nft_market) {
        market_lines.push(line);
    }
    if !market_lines.is_empty() {
        sections.push(market_lines);
    }

    if summary.token_sends + summary.token_mints + summary.token_burns + summary.token_geneses > 0
    {
        sections.push(vec![format!(
            "🎟 Tokens: {} sends | {} mints | {} burns | {} new",
            summary.token_sends, summary.token_mints, summary.token_burns, summary.token_geneses
        )]);
    }

    if summary.nft_sends + summary.nft_mints + summary.nft_burns > 0 {
        let mut lines = vec![format!(
            "🖼 NFTs: {} sends | {} mints | {} burns",
            summary.nft_sends, summary.nft_mints, summary.nft_burns
        )];
        if !summary.nft_by_collection.is_empty() {
            lines.push("   Top collections:".to_string());
            for (group, count) in summary
                .nft_by_collection
                .iter()
                .sorted_by(|a, b| b.1.cmp(a.1))
                .take(TOP_N)
            {
                let short = if group.len() >= 8 { &group[..8] } else { group };
                lines.push(format!("   {count} txs | {short}..."));
            }
        }
        sections.push(lines);
    }

    if !summary.app_txs.is_empty() {
        let mut lines = vec!["📋 App txs:".to_string()];
        for (label, count) in summary
            .app_txs
            .iter()
            .sorted_by(|a, b| b.1.cmp(a.1))
            .take(TOP_N)
        {
            lines.push(format!("   {count} | {}", escape_html(label)));
        }
        sections.push(lines);
    }

    let mut counters = Vec::new();
    if summary.reward_payouts > 0 {
        counters.push(format!(
            "🎁 Cashtab Rewards: {} payouts",
            summary.reward_payouts
        ));
    }
    if summary.exchange_withdrawals > 0 {
        counters.push(format!(
            "🏦 Exchange withdrawals: {} | {} XEC",
            summary.exchange_withdrawals,
            format_xec(summary.exchange_withdrawal_sats)
        ));
    }
    if !counters.is_empty() {
        sections.push(counters);
    }

    let mut lines: Vec<String> = Vec::new();
    for (i, section) in sections.iter().enumerate() {
        if i != 0 {
            lines.push(String::new());
        }
        lines.extend(section.iter().cloned());
    }
    paginate(&lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chronik::{
        BlockRef, TokenAmount, TokenEntry, TokenTxType, TokenType, TxInput, TxOutput,
    };
    use crate::registry::STAKING_ACTIVATION_HEIGHT;

    const ALICE: &str = "76a914231f7087937684790d1049294f3aef9cfb7b05dd88ac";
    const BOB: &str = "76a914a24e2b67689c3753983d3b408bc7690d31b1b74d88ac";
    const P2SH: &str = "a914d37c4c809fe9840e7bfa77b86bd47163f6fb6c6087";

    fn coinbase(height: u32, scriptsig_ascii: &str) -> RawTx {
        RawTx {
            txid: "c".repeat(64),
            version: 1,
            inputs: vec![TxInput {
                prev_out_script: None,
                input_script: hex::encode(scriptsig_ascii),
                sats: 0,
                token: None,
            }],
            outputs: vec![
                TxOutput {
                    sats: 90_000_000,
                    output_script: BOB.to_string(),
                    token: None,
                },
                TxOutput {
                    sats: 10_000_000,
                    output_script: ALICE.to_string(),
                    token: None,
                },
            ],
            token_entries: vec![],
            is_coinbase: true,
            block: Some(BlockRef {
                hash: "b".repeat(64),
                height,
                timestamp: 1_700_000_000,
            }),
            time_first_seen: 1_700_000_000,
        }
    }

    fn plain_tx(from: &str) -> RawTx {
        RawTx {
            txid: "d".repeat(64),
            version: 2,
            inputs: vec![TxInput {
                prev_out_script: Some(from.to_string()),
                input_script: "00".to_string(),
                sats: 10_000,
                token: None,
            }],
            outputs: vec![TxOutput {
                sats: 9_500,
                output_script: ALICE.to_string(),
                token: None,
            }],
            token_entries: vec![],
            is_coinbase: false,
            block: None,
            time_first_seen: 1_700_000_100,
        }
    }

    fn agora_buy(is_nft: bool) -> RawTx {
        let mut tx = plain_tx(BOB);
        tx.inputs[0].prev_out_script = Some(P2SH.to_string());
        tx.inputs[0].input_script = "02abcd02abcd".to_string();
        tx.inputs[0].token = Some(TokenAmount {
            token_id: "ee".repeat(32),
            atoms: 5,
            is_mint_baton: false,
        });
        tx.inputs.push(TxInput {
            prev_out_script: Some(BOB.to_string()),
            input_script: "00".to_string(),
            sats: 80_000,
            token: None,
        });
        tx.outputs.push(TxOutput {
            sats: 75_000,
            output_script: BOB.to_string(),
            token: None,
        });
        tx.token_entries = vec![TokenEntry {
            token_id: "ee".repeat(32),
            token_type: if is_nft {
                TokenType::SlpNft1Child
            } else {
                TokenType::AlpStandard
            },
            tx_type: TokenTxType::Send,
            is_invalid: false,
            actual_burn_atoms: 0,
            intentional_burn_atoms: 0,
            group_token_id: is_nft.then(|| "cc".repeat(32)),
        }];
        tx
    }

    fn summarize(txs: &[RawTx]) -> DailySummary {
        summarize_window(
            txs,
            1_700_000_000,
            1_700_086_400,
            &KnownMiners::default(),
            &AppRegistry::default(),
            &ReferenceScripts::default(),
        )
    }

    #[test]
    fn miners_fold_into_parent_bucket() {
        let txs = vec![
            coinbase(STAKING_ACTIVATION_HEIGHT, "/ViaBTC/Mined by a/"),
            coinbase(STAKING_ACTIVATION_HEIGHT + 1, "/ViaBTC/Mined by b/"),
        ];
        let summary = summarize(&txs);
        assert_eq!(summary.blocks, 2);
        assert_eq!(summary.miner_blocks.get("ViaBTC"), Some(&2));
        // stakers accumulated from both coinbases
        assert_eq!(summary.staker_rewards.values().sum::<i64>(), 20_000_000);
    }

    #[test]
    fn marketplace_split_by_nft() {
        let txs = vec![agora_buy(false), agora_buy(true)];
        let summary = summarize(&txs);
        assert_eq!(summary.fungible_market.buys, 1);
        assert_eq!(summary.fungible_market.buy_volume_sats, 75_000);
        assert_eq!(summary.nft_market.buys, 1);
        assert_eq!(summary.nft_by_collection.get(&"cc".repeat(32)), Some(&1));
    }

    #[test]
    fn app_histogram_and_counters() {
        let msg = hex::encode("hi");
        let mut app_tx = plain_tx(ALICE);
        app_tx.outputs.push(TxOutput {
            sats: 0,
            output_script: format!("6a0400746162{:02x}{}", msg.len() / 2, msg),
            token: None,
        });
        let mut reward_tx = plain_tx(&ReferenceScripts::default().token_server);
        reward_tx.inputs[0].prev_out_script = Some(ReferenceScripts::default().token_server);
        let mut withdrawal = plain_tx(&ReferenceScripts::default().exchange_hot_wallet);
        withdrawal.inputs[0].prev_out_script =
            Some(ReferenceScripts::default().exchange_hot_wallet);

        let summary = summarize(&[app_tx, reward_tx, withdrawal]);
        assert_eq!(summary.app_txs.get("Cashtab Msg"), Some(&1));
        assert_eq!(summary.reward_payouts, 1);
        assert_eq!(summary.exchange_withdrawals, 1);
        assert_eq!(summary.exchange_withdrawal_sats, 9_500);
    }

    #[test]
    fn digest_renders_and_paginates() {
        let mut txs = vec![coinbase(STAKING_ACTIVATION_HEIGHT, "/ViaBTC/x/")];
        txs.push(agora_buy(false));
        let summary = summarize(&txs);
        let batches = daily_digest(&summary, None).unwrap();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].contains("📅 Daily summary | 2023-11-14"));
        assert!(batches[0].contains("⛏ Top miners:"));
        assert!(batches[0].contains("🏪 Token market: 1 buys"));
    }
}
