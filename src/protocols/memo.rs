//! Memo-protocol decoder.
//!
//! Tag pushes are two bytes: the `6d` prefix plus an action code. Each
//! action code has a fixed arity and byte layout. Twenty-byte hash pushes
//! are rendered as P2PKH cashaddrs, 32-byte pushes as shortened tx ids.

use herald_support::address::{encode_cashaddr, AddressType, ECASH_PREFIX};

use super::decode_utf8;
use crate::types::ParsedOpReturnInfo;

/// Replaces any memo message carrying content for the foreign chain.
const CROSS_CHAIN_REDACTION: &str = "[cross-chain memo redacted]";

const FOREIGN_TICKER: &str = "BCH";

fn short_txid(push: &str) -> String {
    if push.len() >= 8 {
        format!("{}...", &push[..8])
    } else {
        push.to_string()
    }
}

fn hash_to_address(push: &str) -> String {
    if push.len() == 40 {
        if let Ok(addr) = encode_cashaddr(ECASH_PREFIX, AddressType::P2pkh, push) {
            return addr;
        }
    }
    push.to_string()
}

fn part(stack: &[String], index: usize) -> Option<&String> {
    stack.get(index).filter(|push| !push.is_empty())
}

/// Decodes a memo stack array (tag push included at index 0).
pub fn parse_memo(stack: &[String]) -> ParsedOpReturnInfo {
    let action = stack[0][2..].to_ascii_lowercase();
    let mut parts: Vec<String> = Vec::new();

    match action.as_str() {
        "01" => {
            parts.push("Set name".to_string());
            if let Some(name) = part(stack, 1) {
                parts.push(decode_utf8(name));
            }
        }
        "02" => {
            parts.push("Post memo".to_string());
            if let Some(msg) = part(stack, 1) {
                parts.push(decode_utf8(msg));
            }
        }
        "03" => {
            parts.push("Reply to memo".to_string());
            if let Some(txid) = part(stack, 1) {
                parts.push(short_txid(txid));
            }
            if let Some(msg) = part(stack, 2) {
                parts.push(decode_utf8(msg));
            }
        }
        "04" => {
            parts.push("Like / tip memo".to_string());
            if let Some(txid) = part(stack, 1) {
                parts.push(short_txid(txid));
            }
        }
        "05" => {
            parts.push("Set profile text".to_string());
            if let Some(text) = part(stack, 1) {
                parts.push(decode_utf8(text));
            }
        }
        "06" => {
            parts.push("Follow user".to_string());
            if let Some(hash) = part(stack, 1) {
                parts.push(hash_to_address(hash));
            }
        }
        "07" => {
            parts.push("Unfollow user".to_string());
            if let Some(hash) = part(stack, 1) {
                parts.push(hash_to_address(hash));
            }
        }
        "0a" => {
            parts.push("Set profile picture".to_string());
            if let Some(url) = part(stack, 1) {
                parts.push(decode_utf8(url));
            }
        }
        "0b" => {
            parts.push("Repost memo".to_string());
            if let Some(txid) = part(stack, 1) {
                parts.push(short_txid(txid));
            }
            if let Some(msg) = part(stack, 2) {
                parts.push(decode_utf8(msg));
            }
        }
        "0c" => {
            parts.push("Post topic message".to_string());
            if let Some(topic) = part(stack, 1) {
                parts.push(decode_utf8(topic));
            }
            if let Some(msg) = part(stack, 2) {
                parts.push(decode_utf8(msg));
            }
        }
        "0d" => {
            parts.push("Follow topic".to_string());
            if let Some(topic) = part(stack, 1) {
                parts.push(decode_utf8(topic));
            }
        }
        "0e" => {
            parts.push("Unfollow topic".to_string());
            if let Some(topic) = part(stack, 1) {
                parts.push(decode_utf8(topic));
            }
        }
        "10" => {
            parts.push("Create poll".to_string());
            if let Some(question) = stack.last().filter(|_| stack.len() > 1) {
                parts.push(decode_utf8(question));
            }
        }
        "13" => {
            parts.push("Add poll option".to_string());
            if let Some(txid) = part(stack, 1) {
                parts.push(short_txid(txid));
            }
            if let Some(option) = part(stack, 2) {
                parts.push(decode_utf8(option));
            }
        }
        "14" => {
            parts.push("Poll vote".to_string());
            if let Some(txid) = part(stack, 1) {
                parts.push(short_txid(txid));
            }
            if let Some(comment) = part(stack, 2) {
                parts.push(decode_utf8(comment));
            }
        }
        "16" => {
            parts.push("Mute user".to_string());
            if let Some(hash) = part(stack, 1) {
                parts.push(hash_to_address(hash));
            }
        }
        "17" => {
            parts.push("Unmute user".to_string());
            if let Some(hash) = part(stack, 1) {
                parts.push(hash_to_address(hash));
            }
        }
        "24" => {
            parts.push("Send money".to_string());
            if let Some(hash) = part(stack, 1) {
                parts.push(hash_to_address(hash));
            }
            if let Some(msg) = part(stack, 2) {
                parts.push(decode_utf8(msg));
            }
        }
        "30" => {
            parts.push("Sell token".to_string());
            if let Some(txid) = part(stack, 1) {
                parts.push(short_txid(txid));
            }
        }
        "31" => {
            parts.push("Token buy offer".to_string());
            if let Some(txid) = part(stack, 1) {
                parts.push(short_txid(txid));
            }
        }
        "32" => {
            parts.push("Accept token buy offer".to_string());
            if let Some(txid) = part(stack, 1) {
                parts.push(short_txid(txid));
            }
        }
        "35" => {
            parts.push("Link request".to_string());
            if let Some(hash) = part(stack, 1) {
                parts.push(hash_to_address(hash));
            }
            if let Some(msg) = part(stack, 2) {
                parts.push(decode_utf8(msg));
            }
        }
        "36" => {
            parts.push("Link accept".to_string());
            if let Some(txid) = part(stack, 1) {
                parts.push(short_txid(txid));
            }
        }
        "37" => {
            parts.push("Link revoke".to_string());
            if let Some(txid) = part(stack, 1) {
                parts.push(short_txid(txid));
            }
        }
        _ => {
            parts.push("Unknown memo action".to_string());
        }
    }

    let mut msg = parts.join("|");
    if msg.contains(FOREIGN_TICKER) {
        msg = CROSS_CHAIN_REDACTION.to_string();
    }

    ParsedOpReturnInfo {
        app: "memo".to_string(),
        msg,
        stack_array: stack.to_vec(),
        token_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(pushes: &[&str]) -> Vec<String> {
        pushes.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn post_memo() {
        let info = parse_memo(&stack(&["6d02", &hex::encode("gm world")]));
        assert_eq!(info.app, "memo");
        assert_eq!(info.msg, "Post memo|gm world");
    }

    #[test]
    fn reply_carries_txid_and_message() {
        let txid = "ab".repeat(32);
        let info = parse_memo(&stack(&["6d03", &txid, &hex::encode("agreed")]));
        assert_eq!(info.msg, "Reply to memo|abababab...|agreed");
    }

    #[test]
    fn follow_renders_p2pkh_address() {
        let hash = "231f7087937684790d1049294f3aef9cfb7b05dd";
        let info = parse_memo(&stack(&["6d06", hash]));
        assert!(info.msg.starts_with("Follow user|ecash:q"));
    }

    #[test]
    fn unknown_action_code() {
        let info = parse_memo(&stack(&["6dff", &hex::encode("whatever")]));
        assert_eq!(info.msg, "Unknown memo action");
    }

    #[test]
    fn cross_chain_content_is_redacted() {
        let info = parse_memo(&stack(&["6d02", &hex::encode("send me BCH please")]));
        assert_eq!(info.msg, "[cross-chain memo redacted]");
    }

    #[test]
    fn missing_arity_degrades_to_label() {
        let info = parse_memo(&stack(&["6d03"]));
        assert_eq!(info.msg, "Reply to memo");
    }
}
