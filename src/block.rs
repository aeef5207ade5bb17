//! Block aggregation: classify every transaction, attribute the coinbase,
//! and build the indexes used to batch-fetch metadata before formatting.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use herald_support::script::is_op_return;
use log::warn;

use crate::chronik::{RawBlock, RawTx};
use crate::classify::classify_tx;
use crate::miner::{attribute_miner, attribute_staker};
use crate::registry::{AppRegistry, KnownMiners};
use crate::types::{ParsedBlock, ParsedTx};

/// Parses one block into a [`ParsedBlock`].
pub fn parse_block(
    block: &RawBlock,
    miners: &KnownMiners,
    apps: &AppRegistry,
) -> Result<ParsedBlock> {
    let mut miner = "unknown".to_string();
    let mut staker = None;
    let mut parsed_txs: Vec<ParsedTx> = Vec::with_capacity(block.txs.len().saturating_sub(1));
    let mut token_ids: BTreeSet<String> = BTreeSet::new();
    let mut output_scripts: BTreeSet<String> = BTreeSet::new();

    for (index, tx) in block.txs.iter().enumerate() {
        if index == 0 {
            if !tx.is_coinbase {
                warn!("block {} first tx {} is not coinbase", block.hash, tx.txid);
            }
            miner = attribute_miner(tx, miners);
            staker = attribute_staker(block.height, &tx.outputs);
            continue;
        }
        let parsed = classify_tx(tx, apps)
            .with_context(|| format!("classifying tx {} in block {}", tx.txid, block.hash))?;
        collect_token_ids(&parsed, &mut token_ids);
        collect_output_scripts(tx, &parsed, &mut output_scripts);
        parsed_txs.push(parsed);
    }

    // Stable sort keeps indexer order on ties.
    parsed_txs.sort_by(|a, b| b.total_sats_sent.cmp(&a.total_sats_sent));

    Ok(ParsedBlock {
        hash: block.hash.clone(),
        height: block.height,
        miner,
        staker,
        num_txs: block.txs.len(),
        parsed_txs,
        token_ids,
        output_scripts,
    })
}

fn collect_token_ids(parsed: &ParsedTx, token_ids: &mut BTreeSet<String>) {
    if let Some(genesis) = &parsed.genesis_info {
        token_ids.insert(genesis.token_id.clone());
    }
    if let Some(send) = &parsed.token_send_info {
        token_ids.insert(send.token_id.clone());
    }
    if let Some(burn) = &parsed.token_burn_info {
        token_ids.insert(burn.token_id.clone());
    }
    if let Some(info) = &parsed.op_return_info {
        if let Some(token_id) = &info.token_id {
            token_ids.insert(token_id.clone());
        }
    }
}

/// Sampling policy: per transaction, exactly the first sending output
/// script and the first non-OP_RETURN receiving output script. This bounds
/// the downstream balance-lookup volume; it is not meant to be complete.
fn collect_output_scripts(tx: &RawTx, parsed: &ParsedTx, output_scripts: &mut BTreeSet<String>) {
    if let Some(first_sender) = tx
        .inputs
        .iter()
        .find_map(|input| input.prev_out_script.as_ref())
    {
        output_scripts.insert(first_sender.to_ascii_lowercase());
    }
    let first_receiver = tx.outputs.iter().find(|output| {
        let script = output.output_script.to_ascii_lowercase();
        !is_op_return(&script) && !parsed.xec_sending_output_scripts.contains(&script)
    });
    if let Some(output) = first_receiver {
        output_scripts.insert(output.output_script.to_ascii_lowercase());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chronik::{TxInput, TxOutput};
    use crate::registry::STAKING_ACTIVATION_HEIGHT;

    const ALICE: &str = "76a914231f7087937684790d1049294f3aef9cfb7b05dd88ac";
    const BOB: &str = "76a914a24e2b67689c3753983d3b408bc7690d31b1b74d88ac";
    const CAROL: &str = "76a914637e48a57a3f3d6184f3aaf68b9e2a77400f372c88ac";

    fn coinbase() -> RawTx {
        RawTx {
            txid: "c".repeat(64),
            version: 1,
            inputs: vec![TxInput {
                prev_out_script: None,
                input_script: hex::encode("/ViaBTC/Mined by anyone/"),
                sats: 0,
                token: None,
            }],
            outputs: vec![
                TxOutput {
                    sats: 90_000_000,
                    output_script: CAROL.to_string(),
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
            block: None,
            time_first_seen: 0,
        }
    }

    fn transfer(txid_byte: char, from: &str, to: &str, sats: i64) -> RawTx {
        RawTx {
            txid: txid_byte.to_string().repeat(64),
            version: 2,
            inputs: vec![TxInput {
                prev_out_script: Some(from.to_string()),
                input_script: "00".to_string(),
                sats: sats + 300,
                token: None,
            }],
            outputs: vec![TxOutput {
                sats,
                output_script: to.to_string(),
                token: None,
            }],
            token_entries: vec![],
            is_coinbase: false,
            block: None,
            time_first_seen: 0,
        }
    }

    #[test]
    fn aggregates_sorts_and_indexes() {
        let block = RawBlock {
            hash: "f".repeat(64),
            height: STAKING_ACTIVATION_HEIGHT + 10,
            txs: vec![
                coinbase(),
                transfer('1', ALICE, BOB, 5_000),
                transfer('2', BOB, CAROL, 700_000),
            ],
        };
        let parsed = parse_block(&block, &KnownMiners::default(), &AppRegistry::default()).unwrap();
        assert_eq!(parsed.num_txs, 3);
        assert_eq!(parsed.miner, "ViaBTC, Mined by anyone");
        assert_eq!(parsed.staker.as_ref().unwrap().reward_sats, 10_000_000);
        // sorted descending by sats sent
        assert_eq!(parsed.parsed_txs[0].total_sats_sent, 700_000);
        assert_eq!(parsed.parsed_txs[1].total_sats_sent, 5_000);
        // first sender + first receiver per tx
        assert!(parsed.output_scripts.contains(ALICE));
        assert!(parsed.output_scripts.contains(BOB));
        assert!(parsed.output_scripts.contains(CAROL));
        assert!(parsed.token_ids.is_empty());
    }

    #[test]
    fn stable_order_on_ties() {
        let block = RawBlock {
            hash: "f".repeat(64),
            height: 1000,
            txs: vec![
                coinbase(),
                transfer('1', ALICE, BOB, 5_000),
                transfer('2', BOB, CAROL, 5_000),
            ],
        };
        let parsed = parse_block(&block, &KnownMiners::default(), &AppRegistry::default()).unwrap();
        assert_eq!(parsed.parsed_txs[0].txid, "1".repeat(64));
        assert_eq!(parsed.parsed_txs[1].txid, "2".repeat(64));
    }
}
