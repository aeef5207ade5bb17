//! Marketplace (peer-to-script-hash) action classifier.
//!
//! Token movement through P2SH has no other legitimate use in this
//! ecosystem, so script shape alone separates offer lifecycle actions.
//! The classification is heuristic: script inspection failures fall back to
//! plain Send/Burn rather than propagating.

use herald_support::script::{classify_output_script, opcodes, ScriptOps, ScriptVariant};
use log::{debug, warn};

use crate::chronik::{RawTx, TokenType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgoraAction {
    List,
    Cancel,
    Buy { volume_sats: i64 },
    AdSetup,
    Burn,
    Send,
}

/// A marketplace-classified transaction, grouped by token id for fungible
/// tokens and by parent collection for NFTs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceTx {
    pub action: AgoraAction,
    pub group_id: String,
    pub is_nft: bool,
}

fn is_p2sh(script_hex: &str) -> bool {
    matches!(
        classify_output_script(script_hex),
        Ok(ScriptVariant::P2sh { .. })
    )
}

/// True when the unlocking script's second-to-last opcode is OP_0, the
/// cancel-path flag of the offer covenant.
fn has_cancel_flag(input_script: &str) -> Result<bool, herald_support::script::ScriptError> {
    let ops = ScriptOps::from_hex(input_script)?.collect::<Result<Vec<_>, _>>()?;
    if ops.len() < 2 {
        return Ok(false);
    }
    Ok(ops[ops.len() - 2].opcode == opcodes::OP_0)
}

/// Classifies one transaction's marketplace action, or `None` when the
/// transaction moves no tokens at all.
pub fn classify_marketplace(tx: &RawTx) -> Option<MarketplaceTx> {
    let entry = tx.token_entries.first()?;
    let is_nft = entry.token_type.is_nft_child();
    let group_id = if is_nft {
        entry
            .group_token_id
            .clone()
            .unwrap_or_else(|| entry.token_id.clone())
    } else {
        entry.token_id.clone()
    };

    let plain = |action: AgoraAction| {
        Some(MarketplaceTx {
            action,
            group_id: group_id.clone(),
            is_nft,
        })
    };
    let fallback = if entry.actual_burn_atoms > 0 {
        AgoraAction::Burn
    } else {
        AgoraAction::Send
    };

    let p2sh_token_input = tx.inputs.iter().find(|input| {
        input.token.is_some()
            && input
                .prev_out_script
                .as_deref()
                .is_some_and(is_p2sh)
    });

    if let Some(input) = p2sh_token_input {
        return match has_cancel_flag(&input.input_script) {
            Ok(true) => plain(AgoraAction::Cancel),
            Ok(false) => {
                let token_input_count =
                    tx.inputs.iter().filter(|i| i.token.is_some()).count();
                if tx.inputs.len() == 1 && token_input_count == 1 {
                    plain(AgoraAction::List)
                } else {
                    let volume_sats = match tx.outputs.get(1) {
                        Some(output) => output.sats,
                        None => {
                            warn!(
                                "marketplace buy {} has fewer than 2 outputs",
                                tx.txid
                            );
                            0
                        }
                    };
                    plain(AgoraAction::Buy { volume_sats })
                }
            }
            Err(err) => {
                debug!("unlocking script inspection failed for {}: {err}", tx.txid);
                plain(fallback)
            }
        };
    }

    let has_p2sh_token_output = tx
        .outputs
        .iter()
        .any(|output| output.token.is_some() && is_p2sh(&output.output_script));
    if has_p2sh_token_output {
        return plain(AgoraAction::AdSetup);
    }

    plain(fallback)
}
