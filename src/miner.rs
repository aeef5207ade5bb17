//! Coinbase attribution: which pool (or solo miner) produced a block, and
//! which output is the staking reward.

use herald_support::address::{script_to_address, ECASH_PREFIX};
use log::debug;

use crate::chronik::{RawTx, TxOutput};
use crate::registry::{KnownMiners, MinerParseRule, STAKING_ACTIVATION_HEIGHT};
use crate::types::StakerInfo;

/// Attributes the miner of a coinbase transaction.
///
/// Matches payout output scripts first, then known scriptsig fragments,
/// then falls back to `"unknown, ...<last4>"` of the first payout address.
pub fn attribute_miner(coinbase: &RawTx, miners: &KnownMiners) -> String {
    let scriptsig = coinbase
        .inputs
        .first()
        .map(|input| input.input_script.to_ascii_lowercase())
        .unwrap_or_default();

    for miner in &miners.miners {
        if let Some(payout) = &miner.payout_script {
            if coinbase
                .outputs
                .iter()
                .any(|output| output.output_script.eq_ignore_ascii_case(payout))
            {
                return refine_name(miner.name.clone(), miner.parse_rule, &scriptsig, miners);
            }
        }
    }
    for miner in &miners.miners {
        if let Some(fragment) = &miner.coinbase_fragment {
            if scriptsig.contains(fragment.as_str()) {
                return refine_name(miner.name.clone(), miner.parse_rule, &scriptsig, miners);
            }
        }
    }

    match coinbase
        .outputs
        .first()
        .map(|output| script_to_address(&output.output_script, ECASH_PREFIX))
    {
        Some(Ok(address)) => {
            let tail = &address[address.len().saturating_sub(4)..];
            format!("unknown, ...{tail}")
        }
        _ => "unknown".to_string(),
    }
}

/// Applies the pool's sub-miner parse rule against the scriptsig.
fn refine_name(
    base: String,
    rule: MinerParseRule,
    scriptsig_hex: &str,
    miners: &KnownMiners,
) -> String {
    if rule != MinerParseRule::SlashDelimited {
        return base;
    }
    let Ok(bytes) = hex::decode(scriptsig_hex) else {
        return base;
    };
    let ascii = String::from_utf8_lossy(&bytes).into_owned();
    // The field immediately after the matched fragment is the sub-miner's
    // self-identification, e.g. "/ViaBTC/Mined by ekkoblock7/".
    let Some(field) = slash_field_after_fragment(&ascii, miners, &base) else {
        return base;
    };
    for (needle, display) in &miners.solo_identities {
        if field.contains(needle.as_str()) {
            return display.clone();
        }
    }
    if field.is_empty() {
        base
    } else {
        format!("{base}, {field}")
    }
}

fn slash_field_after_fragment<'a>(
    ascii: &'a str,
    miners: &KnownMiners,
    base: &str,
) -> Option<&'a str> {
    let fragment_ascii: String = miners
        .miners
        .iter()
        .find(|m| m.name == base)?
        .coinbase_fragment
        .as_deref()
        .and_then(|frag| hex::decode(frag).ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())?;
    let start = ascii.find(&fragment_ascii)? + fragment_ascii.len();
    let rest = ascii[start..].trim_start_matches('/');
    let field = match rest.find('/') {
        Some(end) => &rest[..end],
        None => rest,
    };
    Some(field.trim_matches(char::from(0)).trim())
}

/// Finds the staking reward output: the coinbase output whose value lies in
/// the `[10%, 11%]` band of the total coinbase value. The padding above 10%
/// keeps miner and treasury outputs near the boundary out of the match.
pub fn attribute_staker(height: u32, outputs: &[TxOutput]) -> Option<StakerInfo> {
    if height < STAKING_ACTIVATION_HEIGHT {
        return None;
    }
    let total: i64 = outputs.iter().map(|output| output.sats).sum();
    if total <= 0 {
        return None;
    }
    let staker_output = outputs.iter().find(|output| {
        let scaled = output.sats.checked_mul(100);
        matches!(scaled, Some(scaled) if scaled >= total * 10 && scaled <= total * 11)
    });
    match staker_output {
        Some(output) => {
            let staker = script_to_address(&output.output_script, ECASH_PREFIX)
                .unwrap_or_else(|_| output.output_script.clone());
            Some(StakerInfo {
                staker,
                reward_sats: output.sats,
            })
        }
        None => {
            debug!("no staking output in band at height {height}");
            None
        }
    }
}
