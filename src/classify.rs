//! Per-transaction classification: token entries, XEC flows, OP_RETURN
//! data, and the fee check.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};
use herald_support::script::is_op_return;
use log::warn;

use crate::chronik::{RawTx, TokenTxType};
use crate::protocols::parse_op_return;
use crate::registry::AppRegistry;
use crate::types::{ParsedTx, TokenBurnInfo, TokenGenesis, TokenSendInfo};

/// Classifies one transaction into a [`ParsedTx`].
///
/// Malformed protocol payloads degrade inside the decoders; the only hard
/// error is a negative fee, which indicates corrupt indexer data and must
/// not be clamped away.
pub fn classify_tx(tx: &RawTx, apps: &AppRegistry) -> Result<ParsedTx> {
    let (genesis_info, token_send_info, token_burn_info) = classify_token_entries(tx);

    // XEC flows. Every spent coin's script is a sender; outputs paying a
    // sender script are change, everything else (less OP_RETURN) receives.
    let mut xec_sending_output_scripts: BTreeSet<String> = BTreeSet::new();
    for input in &tx.inputs {
        if let Some(script) = &input.prev_out_script {
            xec_sending_output_scripts.insert(script.to_ascii_lowercase());
        }
    }

    let mut xec_receiving_outputs: BTreeMap<String, i64> = BTreeMap::new();
    let mut change_sats: i64 = 0;
    for output in &tx.outputs {
        let script = output.output_script.to_ascii_lowercase();
        if is_op_return(&script) {
            continue;
        }
        if xec_sending_output_scripts.contains(&script) {
            change_sats += output.sats;
        } else {
            *xec_receiving_outputs.entry(script).or_insert(0) += output.sats;
        }
    }
    let mut total_sats_sent: i64 = xec_receiving_outputs.values().sum();
    if xec_receiving_outputs.is_empty() {
        // Self-send: display the change total instead of under-counting.
        total_sats_sent = change_sats;
    }

    // Token semantics come from indexer metadata, so OP_RETURN decoding is
    // only attempted for non-token transactions.
    let op_return_info = if tx.token_entries.is_empty() {
        tx.outputs
            .iter()
            .find(|output| is_op_return(&output.output_script))
            .map(|output| parse_op_return(&output.output_script[2..], apps))
    } else {
        None
    };

    let tx_fee_sats = if tx.is_coinbase {
        0
    } else {
        let input_sats: i64 = tx.inputs.iter().map(|input| input.sats).sum();
        let output_sats: i64 = tx.outputs.iter().map(|output| output.sats).sum();
        let fee = input_sats - output_sats;
        if fee < 0 {
            bail!(
                "negative fee {fee} for tx {}: inputs {input_sats}, outputs {output_sats}",
                tx.txid
            );
        }
        fee as u64
    };

    Ok(ParsedTx {
        txid: tx.txid.clone(),
        genesis_info,
        op_return_info,
        tx_fee_sats,
        xec_sending_output_scripts,
        xec_receiving_outputs,
        total_sats_sent,
        token_send_info,
        token_burn_info,
    })
}

type TokenClassification = (
    Option<TokenGenesis>,
    Option<TokenSendInfo>,
    Option<TokenBurnInfo>,
);

/// Classifies the first token entry only; multi-entry transactions are a
/// known limitation carried over from the protocol's own tooling.
fn classify_token_entries(tx: &RawTx) -> TokenClassification {
    let Some(entry) = tx.token_entries.first() else {
        return (None, None, None);
    };
    if entry.is_invalid {
        warn!("invalid token entry in tx {}, skipping", tx.txid);
        return (None, None, None);
    }

    if entry.tx_type == TokenTxType::Genesis {
        return (
            Some(TokenGenesis {
                token_id: entry.token_id.clone(),
            }),
            None,
            None,
        );
    }

    if entry.actual_burn_atoms > 0 {
        return (
            None,
            None,
            Some(TokenBurnInfo {
                token_id: entry.token_id.clone(),
                undecimalized_amount: u128::from(entry.actual_burn_atoms),
            }),
        );
    }

    match entry.tx_type {
        TokenTxType::Send | TokenTxType::Mint => {
            let mut token_sending_output_scripts: BTreeSet<String> = BTreeSet::new();
            for input in &tx.inputs {
                let carries_token = input
                    .token
                    .as_ref()
                    .is_some_and(|token| token.token_id == entry.token_id);
                if carries_token {
                    if let Some(script) = &input.prev_out_script {
                        token_sending_output_scripts.insert(script.to_ascii_lowercase());
                    }
                }
            }

            let mut token_change_outputs: BTreeMap<String, u128> = BTreeMap::new();
            let mut token_receiving_outputs: BTreeMap<String, u128> = BTreeMap::new();
            for output in &tx.outputs {
                let Some(token) = &output.token else {
                    continue;
                };
                if token.token_id != entry.token_id || token.is_mint_baton {
                    continue;
                }
                let script = output.output_script.to_ascii_lowercase();
                let bucket = if token_sending_output_scripts.contains(&script) {
                    &mut token_change_outputs
                } else {
                    &mut token_receiving_outputs
                };
                *bucket.entry(script).or_insert(0) += u128::from(token.atoms);
            }

            (
                None,
                Some(TokenSendInfo {
                    token_id: entry.token_id.clone(),
                    parsed_token_type: entry.token_type,
                    tx_type: entry.tx_type,
                    token_change_outputs,
                    token_receiving_outputs,
                    token_sending_output_scripts,
                }),
                None,
            )
        }
        _ => (None, None, None),
    }
}
