//! Output-script template classification and raw-script opcode iteration.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/// The opcodes this engine needs to recognize by value.
pub mod opcodes {
    pub const OP_0: u8 = 0x00;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    pub const OP_RESERVED: u8 = 0x50;
    pub const OP_RETURN: u8 = 0x6a;
    pub const OP_DUP: u8 = 0x76;
    pub const OP_EQUAL: u8 = 0x87;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_CHECKSIG: u8 = 0xac;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("unrecognized output script: {0}")]
    UnrecognizedScript(String),
    #[error("invalid hex string: {0}")]
    BadHex(String),
    #[error("truncated push at byte offset {0}")]
    TruncatedPush(usize),
    #[error("address encoding failed: {0}")]
    Encoding(String),
}

/// A recognized output-script template. `hash160` is 20 bytes, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptVariant {
    P2pkh { hash160: String },
    P2sh { hash160: String },
}

/// Matches an output script against the standard P2PKH/P2SH templates.
///
/// P2PKH: `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`
/// P2SH:  `OP_HASH160 <20> OP_EQUAL`
pub fn classify_output_script(script_hex: &str) -> Result<ScriptVariant, ScriptError> {
    let script = script_hex.to_ascii_lowercase();
    if script.len() == 50 && script.starts_with("76a914") && script.ends_with("88ac") {
        return Ok(ScriptVariant::P2pkh {
            hash160: script[6..46].to_string(),
        });
    }
    if script.len() == 46 && script.starts_with("a914") && script.ends_with("87") {
        return Ok(ScriptVariant::P2sh {
            hash160: script[4..44].to_string(),
        });
    }
    Err(ScriptError::UnrecognizedScript(script))
}

pub fn is_op_return(script_hex: &str) -> bool {
    script_hex.len() >= 2 && script_hex[..2].eq_ignore_ascii_case("6a")
}

/// One decoded script operation: a bare opcode, or a push with its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOp {
    pub opcode: u8,
    pub data: Option<Vec<u8>>,
}

/// Iterator over the operations of a raw script.
///
/// Handles direct pushes and PUSHDATA1/2/4, which do occur in unlocking
/// scripts (covenant redeem scripts routinely exceed 255 bytes). A
/// truncated push ends iteration with an error item.
pub struct ScriptOps {
    bytes: Vec<u8>,
    pos: usize,
}

impl ScriptOps {
    pub fn from_hex(script_hex: &str) -> Result<Self, ScriptError> {
        let bytes =
            hex::decode(script_hex).map_err(|_| ScriptError::BadHex(script_hex.to_string()))?;
        Ok(Self { bytes, pos: 0 })
    }

    fn take(&mut self, n: usize) -> Option<&[u8]> {
        if self.bytes.len() - self.pos < n {
            return None;
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }
}

impl Iterator for ScriptOps {
    type Item = Result<ScriptOp, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.bytes.len() {
            return None;
        }
        let start = self.pos;
        let opcode = self.bytes[self.pos];
        self.pos += 1;
        let data_len = match opcode {
            1..=0x4b => Some(opcode as usize),
            opcodes::OP_PUSHDATA1 => match self.take(1) {
                Some(b) => Some(b[0] as usize),
                None => return Some(Err(ScriptError::TruncatedPush(start))),
            },
            opcodes::OP_PUSHDATA2 => match self.take(2) {
                Some(b) => Some(LittleEndian::read_u16(b) as usize),
                None => return Some(Err(ScriptError::TruncatedPush(start))),
            },
            opcodes::OP_PUSHDATA4 => match self.take(4) {
                Some(b) => Some(LittleEndian::read_u32(b) as usize),
                None => return Some(Err(ScriptError::TruncatedPush(start))),
            },
            _ => None,
        };
        match data_len {
            None => Some(Ok(ScriptOp { opcode, data: None })),
            Some(len) => match self.take(len) {
                Some(data) => Some(Ok(ScriptOp {
                    opcode,
                    data: Some(data.to_vec()),
                })),
                None => Some(Err(ScriptError::TruncatedPush(start))),
            },
        }
    }
}
