//! Block message formatter: a parsed block plus optional side-info in,
//! an ordered list of size-bounded message batches out.

use std::collections::HashMap;

use anyhow::Result;

use crate::markup::{decimalize, escape_html, format_fiat, format_xec, paginate};
use crate::registry::{
    AppRegistry, ReferenceScripts, HALVING_COUNTDOWN_WINDOW, HALVING_INTERVAL,
};
use crate::types::{BalanceInfo, ParsedBlock, ParsedTx, Prices, TokenGenesisInfo};

#[derive(Debug, Clone)]
pub struct BlockMessageOptions {
    pub explorer_url: String,
    /// Cap on plain XEC transfer lines before the "...and N more" elision.
    pub max_xec_tx_lines: usize,
}

impl Default for BlockMessageOptions {
    fn default() -> Self {
        Self {
            explorer_url: "https://explorer.e.cash".to_string(),
            max_xec_tx_lines: 10,
        }
    }
}

fn short_id(id: &str) -> String {
    if id.len() >= 8 {
        format!("{}...", &id[..8])
    } else {
        id.to_string()
    }
}

fn is_plain_xec_tx(tx: &ParsedTx) -> bool {
    tx.genesis_info.is_none()
        && tx.token_send_info.is_none()
        && tx.token_burn_info.is_none()
        && tx.op_return_info.is_none()
}

fn token_label(token_id: &str, token_info: Option<&HashMap<String, TokenGenesisInfo>>) -> String {
    match token_info.and_then(|map| map.get(token_id)) {
        Some(info) => escape_html(&info.token_ticker),
        None => format!("token {}", short_id(token_id)),
    }
}

fn token_qty(
    atoms: u128,
    token_id: &str,
    token_info: Option<&HashMap<String, TokenGenesisInfo>>,
) -> String {
    match token_info.and_then(|map| map.get(token_id)) {
        Some(info) => decimalize(atoms, info.decimals),
        None => atoms.to_string(),
    }
}

/// Builds the full block announcement and paginates it into batches no
/// larger than the platform ceiling.
#[allow(clippy::too_many_arguments)]
pub fn block_message(
    parsed: &ParsedBlock,
    prices: Option<&Prices>,
    token_info: Option<&HashMap<String, TokenGenesisInfo>>,
    balances: Option<&HashMap<String, BalanceInfo>>,
    apps: &AppRegistry,
    refs: &ReferenceScripts,
    opts: &BlockMessageOptions,
) -> Result<Vec<String>> {
    let mut sections: Vec<Vec<String>> = Vec::new();

    // Header
    let tx_plural = if parsed.num_txs == 1 { "tx" } else { "txs" };
    sections.push(vec![format!(
        "📦 <a href=\"{}/block/{}\">{}</a> | {} {} | {}",
        opts.explorer_url,
        parsed.hash,
        parsed.height,
        parsed.num_txs,
        tx_plural,
        escape_html(&parsed.miner)
    )]);

    // Halving countdown
    let to_halving = HALVING_INTERVAL - parsed.height % HALVING_INTERVAL;
    if to_halving <= HALVING_COUNTDOWN_WINDOW {
        sections.push(vec![format!(
            "⏳ {to_halving} blocks until the next halving"
        )]);
    }

    // Staker
    if let Some(staker) = &parsed.staker {
        sections.push(vec![format!(
            "💰 Staking reward: {} XEC to {}",
            format_xec(staker.reward_sats),
            escape_html(&staker.staker)
        )]);
    }

    // Prices
    if let Some(prices) = prices {
        let mut line = format!("💲 1 XEC = {}", format_fiat(100, prices.xec_usd));
        if let Some(btc) = prices.btc_usd {
            line.push_str(&format!(" | 1 BTC = ${btc:.0}"));
        }
        if let Some(eth) = prices.eth_usd {
            line.push_str(&format!(" | 1 ETH = ${eth:.0}"));
        }
        sections.push(vec![line]);
    }

    // Token genesis announcements
    let genesis_lines: Vec<String> = parsed
        .parsed_txs
        .iter()
        .filter_map(|tx| tx.genesis_info.as_ref())
        .map(|genesis| {
            match token_info.and_then(|map| map.get(&genesis.token_id)) {
                Some(info) => format!(
                    "🧪 New token: {} ({})",
                    escape_html(&info.token_name),
                    escape_html(&info.token_ticker)
                ),
                None => format!("🧪 New token: {}", short_id(&genesis.token_id)),
            }
        })
        .collect();
    if !genesis_lines.is_empty() {
        sections.push(genesis_lines);
    }

    // Reward-program call-outs
    let reward_count = parsed
        .parsed_txs
        .iter()
        .filter(|tx| tx.xec_sending_output_scripts.contains(&refs.token_server))
        .count();
    if reward_count > 0 {
        let plural = if reward_count == 1 { "" } else { "s" };
        sections.push(vec![format!(
            "🎁 {reward_count} Cashtab Reward{plural} sent"
        )]);
    }

    // Token send rollups, grouped by token id
    let mut send_rollup: std::collections::BTreeMap<&str, (usize, u128)> = Default::default();
    for tx in &parsed.parsed_txs {
        if let Some(send) = &tx.token_send_info {
            let received: u128 = send.token_receiving_outputs.values().sum();
            let change: u128 = send.token_change_outputs.values().sum();
            let moved = if received > 0 { received } else { change };
            let slot = send_rollup.entry(send.token_id.as_str()).or_insert((0, 0));
            slot.0 += 1;
            slot.1 += moved;
        }
    }
    if !send_rollup.is_empty() {
        let lines = send_rollup
            .iter()
            .map(|(token_id, (count, atoms))| {
                let plural = if *count == 1 { "tx" } else { "txs" };
                format!(
                    "🎟 {count} {plural} | {} {}",
                    token_qty(*atoms, token_id, token_info),
                    token_label(token_id, token_info)
                )
            })
            .collect();
        sections.push(lines);
    }

    // Burns
    let burn_lines: Vec<String> = parsed
        .parsed_txs
        .iter()
        .filter_map(|tx| tx.token_burn_info.as_ref())
        .map(|burn| {
            format!(
                "🔥 Burned {} {}",
                token_qty(burn.undecimalized_amount, &burn.token_id, token_info),
                token_label(&burn.token_id, token_info)
            )
        })
        .collect();
    if !burn_lines.is_empty() {
        sections.push(burn_lines);
    }

    // App transactions
    let app_lines: Vec<String> = parsed
        .parsed_txs
        .iter()
        .filter_map(|tx| tx.op_return_info.as_ref())
        .map(|info| {
            let emoji = info
                .stack_array
                .first()
                .and_then(|tag| apps.lookup(tag))
                .map(|spec| spec.emoji.clone())
                .unwrap_or_else(|| "❓".to_string());
            if info.msg.is_empty() {
                format!("{emoji} {}", escape_html(&info.app))
            } else {
                format!("{emoji} {}: {}", escape_html(&info.app), escape_html(&info.msg))
            }
        })
        .collect();
    if !app_lines.is_empty() {
        sections.push(app_lines);
    }

    // Plain XEC transfers, already sorted descending by sats sent
    let plain: Vec<&ParsedTx> = parsed
        .parsed_txs
        .iter()
        .filter(|tx| is_plain_xec_tx(tx))
        .collect();
    if !plain.is_empty() {
        let mut lines = Vec::new();
        for tx in plain.iter().take(opts.max_xec_tx_lines) {
            let whale = balances
                .and_then(|map| {
                    tx.xec_sending_output_scripts
                        .iter()
                        .next()
                        .and_then(|script| map.get(script))
                })
                .map(|balance| format!("{} ", balance.emoji))
                .unwrap_or_default();
            let fiat = prices
                .map(|p| format!(" ({})", format_fiat(tx.total_sats_sent, p.xec_usd)))
                .unwrap_or_default();
            lines.push(format!(
                "💸 {}{} XEC{} | {} sat fee",
                whale,
                format_xec(tx.total_sats_sent),
                fiat,
                tx.tx_fee_sats
            ));
        }
        if plain.len() > opts.max_xec_tx_lines {
            lines.push(format!("...and {} more", plain.len() - opts.max_xec_tx_lines));
        }
        sections.push(lines);
    }

    // Blank-line separation between sections, then the hard paginator.
    let mut lines: Vec<String> = Vec::new();
    for (i, section) in sections.iter().enumerate() {
        if i != 0 {
            lines.push(String::new());
        }
        lines.extend(section.iter().cloned());
    }
    paginate(&lines)
}
