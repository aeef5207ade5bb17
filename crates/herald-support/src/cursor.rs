//! Stateless cursor over a hex-encoded byte string.
//!
//! `consume_push` implements script push-data semantics: a leading byte in
//! the direct-push range (0x00..=0x4b) is itself the data length, while
//! `OP_PUSHDATA1` (0x4c) is followed by an 8-bit length prefix. Larger
//! push encodings never appear in the OP_RETURN payloads this engine reads.

use thiserror::Error;

/// Direct pushes encode their own length in the opcode byte, up to 75.
pub const MAX_DIRECT_PUSH: u8 = 0x4b;
/// One-byte length prefix follows.
pub const OP_PUSHDATA1: u8 = 0x4c;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("out of data: needed {needed} byte(s), {remaining} remaining")]
    OutOfData { needed: usize, remaining: usize },
    #[error("invalid hex string: {0}")]
    BadHex(String),
    #[error("opcode {0:#04x} is not a push")]
    NotAPush(u8),
}

/// Cursor over a hex string. Consuming advances the cursor; no other state.
#[derive(Debug, Clone)]
pub struct HexCursor {
    hex: String,
    pos: usize,
}

impl HexCursor {
    /// Validates and lowercases the input. Odd-length or non-hex input is
    /// rejected up front so consumers only ever see whole bytes.
    pub fn new(hex: &str) -> Result<Self, CursorError> {
        if hex.len() % 2 != 0 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CursorError::BadHex(hex.to_string()));
        }
        Ok(Self {
            hex: hex.to_ascii_lowercase(),
            pos: 0,
        })
    }

    /// Bytes left to consume.
    pub fn remaining(&self) -> usize {
        (self.hex.len() - self.pos) / 2
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.hex.len()
    }

    /// Returns the next `n` bytes as hex and advances the cursor.
    pub fn consume_bytes(&mut self, n: usize) -> Result<String, CursorError> {
        if self.remaining() < n {
            return Err(CursorError::OutOfData {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = self.hex[self.pos..self.pos + 2 * n].to_string();
        self.pos += 2 * n;
        Ok(out)
    }

    fn consume_u8(&mut self) -> Result<u8, CursorError> {
        let byte = self.consume_bytes(1)?;
        // Cannot fail: `new` validated the hex.
        Ok(u8::from_str_radix(&byte, 16).expect("validated hex"))
    }

    /// Reads one script push and returns its data bytes as hex. The data
    /// may be empty (a 0x00 direct push); callers decide whether to keep it.
    pub fn consume_push(&mut self) -> Result<String, CursorError> {
        let opcode = self.consume_u8()?;
        let len = match opcode {
            0..=MAX_DIRECT_PUSH => opcode as usize,
            OP_PUSHDATA1 => self.consume_u8()? as usize,
            other => return Err(CursorError::NotAPush(other)),
        };
        self.consume_bytes(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_bytes_advances_and_bounds() {
        let mut cursor = HexCursor::new("DEADBEEF").unwrap();
        assert_eq!(cursor.consume_bytes(2).unwrap(), "dead");
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(
            cursor.consume_bytes(3),
            Err(CursorError::OutOfData {
                needed: 3,
                remaining: 2
            })
        );
        assert_eq!(cursor.consume_bytes(2).unwrap(), "beef");
        assert!(cursor.is_empty());
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(matches!(HexCursor::new("abc"), Err(CursorError::BadHex(_))));
        assert!(matches!(HexCursor::new("zz"), Err(CursorError::BadHex(_))));
    }

    #[test]
    fn direct_push() {
        let mut cursor = HexCursor::new("0474657374").unwrap();
        assert_eq!(cursor.consume_push().unwrap(), "74657374");
        assert!(cursor.is_empty());
    }

    #[test]
    fn pushdata1_push() {
        // 0x4c 0x02 0xab 0xcd
        let mut cursor = HexCursor::new("4c02abcd").unwrap();
        assert_eq!(cursor.consume_push().unwrap(), "abcd");
    }

    #[test]
    fn zero_length_push() {
        let mut cursor = HexCursor::new("0004abababab").unwrap();
        assert_eq!(cursor.consume_push().unwrap(), "");
        assert_eq!(cursor.consume_push().unwrap(), "abababab");
    }

    #[test]
    fn non_push_opcode_rejected() {
        let mut cursor = HexCursor::new("6a").unwrap();
        assert_eq!(cursor.consume_push(), Err(CursorError::NotAPush(0x6a)));
    }

    #[test]
    fn truncated_push_is_out_of_data() {
        let mut cursor = HexCursor::new("04abab").unwrap();
        assert_eq!(
            cursor.consume_push(),
            Err(CursorError::OutOfData {
                needed: 4,
                remaining: 2
            })
        );
    }

    /// Round-trip: encode N pushes (direct and PUSHDATA1), decode them back.
    #[test]
    fn push_round_trip() {
        let payloads: Vec<Vec<u8>> = vec![
            vec![0xaa; 1],
            vec![0xbb; 75],
            vec![0xcc; 76],
            vec![0xdd; 255],
            b"hello world".to_vec(),
        ];
        let mut script = String::new();
        for p in &payloads {
            if p.len() <= MAX_DIRECT_PUSH as usize {
                script.push_str(&format!("{:02x}", p.len()));
            } else {
                script.push_str(&format!("{:02x}{:02x}", OP_PUSHDATA1, p.len()));
            }
            script.push_str(&hex::encode(p));
        }
        let mut cursor = HexCursor::new(&script).unwrap();
        for p in &payloads {
            assert_eq!(cursor.consume_push().unwrap(), hex::encode(p));
        }
        assert!(cursor.is_empty());
    }
}
