//! Cashaddr encoding for P2PKH/P2SH payloads.
//!
//! Cashaddr is base32 over 5-bit groups with a 40-bit BCH polymod checksum;
//! it is not bech32, so it is implemented here rather than borrowed from a
//! bech32 crate.

use crate::script::{classify_output_script, ScriptError, ScriptVariant};

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Default network prefix.
pub const ECASH_PREFIX: &str = "ecash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    P2pkh,
    P2sh,
}

impl AddressType {
    /// Version byte: type bits shifted past the three size bits, which are
    /// zero for a 160-bit hash.
    fn version_byte(self) -> u8 {
        match self {
            AddressType::P2pkh => 0x00,
            AddressType::P2sh => 0x08,
        }
    }
}

fn polymod(values: &[u8]) -> u64 {
    let mut c: u64 = 1;
    for &d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x0007_ffff_ffff) << 5) ^ u64::from(d);
        if c0 & 0x01 != 0 {
            c ^= 0x98_f2bc_8e61;
        }
        if c0 & 0x02 != 0 {
            c ^= 0x79_b76d_99e2;
        }
        if c0 & 0x04 != 0 {
            c ^= 0xf3_3e5f_b3c4;
        }
        if c0 & 0x08 != 0 {
            c ^= 0xae_2eab_e2a8;
        }
        if c0 & 0x10 != 0 {
            c ^= 0x1e_4f43_e470;
        }
    }
    c ^ 1
}

/// Regroups 8-bit bytes into 5-bit groups, zero-padding the tail.
fn to_five_bit_groups(bytes: &[u8]) -> Vec<u8> {
    let mut groups = Vec::with_capacity(bytes.len() * 8 / 5 + 1);
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for &b in bytes {
        acc = (acc << 8) | u32::from(b);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            groups.push(((acc >> bits) & 0x1f) as u8);
        }
    }
    if bits > 0 {
        groups.push(((acc << (5 - bits)) & 0x1f) as u8);
    }
    groups
}

/// Encodes a 20-byte hash as a cashaddr string, e.g. `ecash:qq...`.
pub fn encode_cashaddr(
    prefix: &str,
    addr_type: AddressType,
    hash160_hex: &str,
) -> Result<String, ScriptError> {
    let hash = hex::decode(hash160_hex)
        .map_err(|_| ScriptError::Encoding(format!("bad hash hex: {hash160_hex}")))?;
    if hash.len() != 20 {
        return Err(ScriptError::Encoding(format!(
            "hash must be 20 bytes, got {}",
            hash.len()
        )));
    }

    let mut payload = Vec::with_capacity(21);
    payload.push(addr_type.version_byte());
    payload.extend_from_slice(&hash);
    let payload5 = to_five_bit_groups(&payload);

    // Checksum covers the lower 5 bits of each prefix char, a zero
    // separator, the payload groups, and 8 zero sentinel groups.
    let mut checksum_input: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    checksum_input.push(0);
    checksum_input.extend_from_slice(&payload5);
    checksum_input.extend_from_slice(&[0u8; 8]);
    let checksum = polymod(&checksum_input);

    let mut out = String::with_capacity(prefix.len() + 1 + payload5.len() + 8);
    out.push_str(prefix);
    out.push(':');
    for g in &payload5 {
        out.push(CHARSET[*g as usize] as char);
    }
    for i in (0..8).rev() {
        out.push(CHARSET[((checksum >> (5 * i)) & 0x1f) as usize] as char);
    }
    Ok(out)
}

/// Classifies an output script and encodes it as a cashaddr. Callers catch
/// the error and fall back to displaying the raw script hex.
pub fn script_to_address(script_hex: &str, prefix: &str) -> Result<String, ScriptError> {
    match classify_output_script(script_hex)? {
        ScriptVariant::P2pkh { hash160 } => encode_cashaddr(prefix, AddressType::P2pkh, &hash160),
        ScriptVariant::P2sh { hash160 } => encode_cashaddr(prefix, AddressType::P2sh, &hash160),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference vector from the cashaddr specification.
    #[test]
    fn spec_vector_p2pkh() {
        let addr = encode_cashaddr(
            "bitcoincash",
            AddressType::P2pkh,
            "f5bf48b397dae70be82b3cca4793f8eb2b6cdac9",
        )
        .unwrap();
        assert_eq!(addr, "bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2");
    }

    #[test]
    fn ecash_prefix_shape() {
        let addr = encode_cashaddr(
            ECASH_PREFIX,
            AddressType::P2pkh,
            "231f7087937684790d1049294f3aef9cfb7b05dd",
        )
        .unwrap();
        assert!(addr.starts_with("ecash:q"));
        // 34 payload groups + 8 checksum groups
        assert_eq!(addr.len(), "ecash:".len() + 42);
        assert!(addr
            .bytes()
            .skip(6)
            .all(|b| CHARSET.contains(&b)));
    }

    #[test]
    fn p2sh_version_byte_differs() {
        let hash = "d37c4c809fe9840e7bfa77b86bd47163f6fb6c60";
        let p2pkh = encode_cashaddr(ECASH_PREFIX, AddressType::P2pkh, hash).unwrap();
        let p2sh = encode_cashaddr(ECASH_PREFIX, AddressType::P2sh, hash).unwrap();
        assert_ne!(p2pkh, p2sh);
        assert!(p2sh.starts_with("ecash:p"));
    }

    #[test]
    fn script_to_address_round() {
        let addr =
            script_to_address("76a914231f7087937684790d1049294f3aef9cfb7b05dd88ac", ECASH_PREFIX)
                .unwrap();
        assert!(addr.starts_with("ecash:q"));
        assert!(script_to_address("6a0401020304", ECASH_PREFIX).is_err());
    }

    #[test]
    fn rejects_short_hash() {
        assert!(matches!(
            encode_cashaddr(ECASH_PREFIX, AddressType::P2pkh, "abcd"),
            Err(ScriptError::Encoding(_))
        ));
    }
}
