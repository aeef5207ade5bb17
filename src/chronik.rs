//! Typed model of the records the chain indexer (chronik) hands us.
//!
//! The indexer speaks loosely-typed JSON; this module is the one validating
//! ingestion boundary. Everything downstream works against these total
//! types — unknown protocol or tx-type strings land in explicit `Unknown`
//! variants instead of being sniffed per call site.

use serde::{Deserialize, Serialize};

/// A block as supplied by the indexer, coinbase transaction first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub hash: String,
    pub height: u32,
    pub txs: Vec<RawTx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRef {
    pub hash: String,
    pub height: u32,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTx {
    pub txid: String,
    #[serde(default)]
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    #[serde(default)]
    pub token_entries: Vec<TokenEntry>,
    #[serde(default)]
    pub is_coinbase: bool,
    #[serde(default)]
    pub block: Option<BlockRef>,
    #[serde(default)]
    pub time_first_seen: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    /// Output script of the coin being spent. Absent on coinbase inputs.
    #[serde(default)]
    pub prev_out_script: Option<String>,
    /// Unlocking script (scriptsig), hex.
    #[serde(default)]
    pub input_script: String,
    #[serde(default)]
    pub sats: i64,
    #[serde(default)]
    pub token: Option<TokenAmount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    pub sats: i64,
    pub output_script: String,
    #[serde(default)]
    pub token: Option<TokenAmount>,
}

/// Token payload attached to an input or output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    pub token_id: String,
    #[serde(default)]
    pub atoms: u64,
    #[serde(default)]
    pub is_mint_baton: bool,
}

/// Per-transaction token metadata as validated by the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEntry {
    pub token_id: String,
    pub token_type: TokenType,
    pub tx_type: TokenTxType,
    #[serde(default)]
    pub is_invalid: bool,
    #[serde(default)]
    pub actual_burn_atoms: u64,
    #[serde(default)]
    pub intentional_burn_atoms: u64,
    /// Parent collection for NFT children.
    #[serde(default)]
    pub group_token_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "SLP_TOKEN_TYPE_FUNGIBLE")]
    SlpFungible,
    #[serde(rename = "SLP_TOKEN_TYPE_MINT_VAULT")]
    SlpMintVault,
    #[serde(rename = "SLP_TOKEN_TYPE_NFT1_GROUP")]
    SlpNft1Group,
    #[serde(rename = "SLP_TOKEN_TYPE_NFT1_CHILD")]
    SlpNft1Child,
    #[serde(rename = "ALP_TOKEN_TYPE_STANDARD")]
    AlpStandard,
    #[serde(other)]
    Unknown,
}

impl TokenType {
    pub fn is_nft_child(self) -> bool {
        self == TokenType::SlpNft1Child
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenTxType {
    Genesis,
    Send,
    Mint,
    Burn,
    None,
    #[serde(other)]
    Unknown,
}

/// Parses one indexer transaction record from its JSON form.
pub fn tx_from_json(json: &str) -> serde_json::Result<RawTx> {
    serde_json::from_str(json)
}

/// Parses one indexer block record from its JSON form.
pub fn block_from_json(json: &str) -> serde_json::Result<RawBlock> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_indexer_tx_json() {
        let json = r#"{
            "txid": "aa", "version": 2,
            "inputs": [{"prevOutScript": "76a914231f7087937684790d1049294f3aef9cfb7b05dd88ac", "inputScript": "00", "sats": 1000}],
            "outputs": [{"sats": 900, "outputScript": "a914d37c4c809fe9840e7bfa77b86bd47163f6fb6c6087"}],
            "tokenEntries": [{
                "tokenId": "bb", "tokenType": "ALP_TOKEN_TYPE_STANDARD",
                "txType": "SEND", "actualBurnAtoms": 0
            }],
            "isCoinbase": false, "timeFirstSeen": 1700000000
        }"#;
        let tx = tx_from_json(json).unwrap();
        assert_eq!(tx.inputs[0].sats, 1000);
        assert_eq!(tx.token_entries[0].token_type, TokenType::AlpStandard);
        assert_eq!(tx.token_entries[0].tx_type, TokenTxType::Send);
    }

    #[test]
    fn unknown_token_type_is_total() {
        let json = r#"{"tokenId": "cc", "tokenType": "SOME_FUTURE_TYPE", "txType": "WAT"}"#;
        let entry: TokenEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.token_type, TokenType::Unknown);
        assert_eq!(entry.tx_type, TokenTxType::Unknown);
    }
}
