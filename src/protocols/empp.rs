//! EMPP multi-push envelope decoder and the ALP sub-decoder it dispatches
//! to.
//!
//! The envelope is `OP_RETURN OP_RESERVED <push>...`; each push is an
//! independent payload. Pushes carrying the `SLP2` prefix are ALP sections;
//! everything else renders as a best-effort ASCII fragment.

use byteorder::{ByteOrder, LittleEndian};
use herald_support::cursor::{CursorError, HexCursor};
use log::debug;

use crate::registry::ALP_LOKAD;
use crate::types::ParsedOpReturnInfo;

/// One decoded ALP section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlpSection {
    Send {
        token_id: String,
        num_amounts: usize,
        total_atoms: u128,
    },
    Mint {
        token_id: String,
        num_amounts: usize,
        total_atoms: u128,
    },
    /// GENESIS and BURN bodies have no decoder; surfacing the gap beats
    /// guessing a grammar.
    Unsupported { section_type: String },
    UnknownTokenType(u8),
}

/// Decodes an EMPP envelope (hex after the OP_RESERVED marker byte).
pub fn parse_empp(payload_hex: &str) -> ParsedOpReturnInfo {
    let stack_array = super::collect_pushes(payload_hex);
    let mut fragments: Vec<String> = Vec::new();
    for push in &stack_array {
        if push.len() >= 8 && push[..8].eq_ignore_ascii_case(ALP_LOKAD) {
            match parse_alp(&push[8..]) {
                Ok(section) => fragments.push(render_alp(&section)),
                Err(err) => {
                    debug!("malformed ALP section: {err}");
                    fragments.push("ALP (malformed section)".to_string());
                }
            }
        } else {
            let bytes = hex::decode(push.as_str()).unwrap_or_default();
            fragments.push(format!(
                "Unknown App|{}",
                String::from_utf8_lossy(&bytes)
            ));
        }
    }
    ParsedOpReturnInfo {
        app: "EMPP".to_string(),
        msg: fragments.join("|"),
        stack_array,
        token_id: None,
    }
}

/// Decodes one ALP payload (hex after the `SLP2` prefix).
pub fn parse_alp(payload_hex: &str) -> Result<AlpSection, CursorError> {
    let mut cursor = HexCursor::new(payload_hex)?;
    let token_type = u8::from_str_radix(&cursor.consume_bytes(1)?, 16).expect("validated hex");
    if token_type != 0x00 {
        return Ok(AlpSection::UnknownTokenType(token_type));
    }
    let section_len = u8::from_str_radix(&cursor.consume_bytes(1)?, 16).expect("validated hex");
    let section_hex = cursor.consume_bytes(section_len as usize)?;
    let section_type = String::from_utf8_lossy(&hex::decode(&section_hex).expect("validated hex"))
        .into_owned();

    match section_type.as_str() {
        "SEND" | "MINT" => {
            // Token id is serialized in reversed byte order.
            let token_id_le = cursor.consume_bytes(32)?;
            let mut id_bytes = hex::decode(&token_id_le).expect("validated hex");
            id_bytes.reverse();
            let token_id = hex::encode(id_bytes);

            let num_amounts =
                u8::from_str_radix(&cursor.consume_bytes(1)?, 16).expect("validated hex") as usize;
            let mut total_atoms: u128 = 0;
            for _ in 0..num_amounts {
                let amount_hex = cursor.consume_bytes(6)?;
                let amount_bytes = hex::decode(&amount_hex).expect("validated hex");
                total_atoms += u128::from(LittleEndian::read_u48(&amount_bytes));
            }
            if section_type == "SEND" {
                Ok(AlpSection::Send {
                    token_id,
                    num_amounts,
                    total_atoms,
                })
            } else {
                Ok(AlpSection::Mint {
                    token_id,
                    num_amounts,
                    total_atoms,
                })
            }
        }
        _ => Ok(AlpSection::Unsupported { section_type }),
    }
}

fn short_id(token_id: &str) -> String {
    if token_id.len() >= 8 {
        format!("{}...", &token_id[..8])
    } else {
        token_id.to_string()
    }
}

fn render_alp(section: &AlpSection) -> String {
    match section {
        AlpSection::Send {
            token_id,
            total_atoms,
            ..
        } => format!("ALP SEND|{}|{} atoms", short_id(token_id), total_atoms),
        AlpSection::Mint {
            token_id,
            total_atoms,
            ..
        } => format!("ALP MINT|{}|{} atoms", short_id(token_id), total_atoms),
        AlpSection::Unsupported { section_type } => {
            format!("ALP {section_type} (unsupported section)")
        }
        AlpSection::UnknownTokenType(token_type) => {
            format!("ALP (unknown token type {token_type:#04x})")
        }
    }
}
