//! OP_RETURN decoding: push-stream extraction and application-tag dispatch.
//!
//! The entry point is [`parse_op_return`], which receives the output script
//! hex with the OP_RETURN opcode already stripped. Per-application grammars
//! degrade to documented "Invalid ..."/"off-spec" messages at the smallest
//! possible scope; a malformed payload never fails the caller.

pub mod agora;
pub mod empp;
pub mod memo;

use herald_support::cursor::HexCursor;
use log::debug;

use crate::registry::{
    AppRegistry, AIRDROP_LOKAD, ALIAS_LOKAD, AUTHENTICATION_LOKAD, CASHTAB_MSG_LOKAD,
    ENCRYPTED_CASHTAB_MSG_LOKAD, FUSION_LEGACY_LOKAD, FUSION_LOKAD, MEMO_PREFIX, PAYBUTTON_LOKAD,
    PAYWALL_LOKAD, SWAP_LOKAD,
};
use crate::types::ParsedOpReturnInfo;

/// OP_RESERVED, the EMPP envelope marker.
const EMPP_MARKER: &str = "50";

/// Bounded display length for unrecognized hex payloads.
const UNKNOWN_HEX_DISPLAY_LEN: usize = 20;

/// Decodes one OP_RETURN payload (hex after the `6a` opcode byte).
pub fn parse_op_return(payload_hex: &str, registry: &AppRegistry) -> ParsedOpReturnInfo {
    if payload_hex.len() >= 2 && payload_hex[..2].eq_ignore_ascii_case(EMPP_MARKER) {
        return empp::parse_empp(&payload_hex[2..]);
    }

    let stack_array = collect_pushes(payload_hex);
    let Some(tag) = stack_array.first().cloned() else {
        return unknown_app(stack_array);
    };

    if tag.len() == 4 && tag[..2].eq_ignore_ascii_case(MEMO_PREFIX) {
        return memo::parse_memo(&stack_array);
    }

    let (app, msg, token_id) = match tag.as_str() {
        ALIAS_LOKAD => parse_alias(&stack_array),
        AIRDROP_LOKAD => parse_airdrop(&stack_array),
        CASHTAB_MSG_LOKAD => parse_cashtab_msg(&stack_array),
        ENCRYPTED_CASHTAB_MSG_LOKAD => ("Encrypted Cashtab Msg".to_string(), String::new(), None),
        FUSION_LOKAD | FUSION_LEGACY_LOKAD => ("CashFusion".to_string(), String::new(), None),
        SWAP_LOKAD => parse_swap(&stack_array),
        PAYBUTTON_LOKAD => parse_paybutton(&stack_array),
        PAYWALL_LOKAD => parse_paywall(&stack_array),
        AUTHENTICATION_LOKAD => parse_authentication(&stack_array),
        _ => return unknown_app(stack_array),
    };
    // Registry labels win so operators can rename apps without touching the
    // grammar code.
    let app = registry
        .lookup(&tag)
        .map(|spec| spec.label.clone())
        .unwrap_or(app);
    ParsedOpReturnInfo {
        app,
        msg,
        stack_array,
        token_id,
    }
}

/// Reads pushes until the stream is exhausted, skipping zero-length pushes.
/// A malformed tail ends collection with whatever decoded cleanly.
fn collect_pushes(payload_hex: &str) -> Vec<String> {
    let mut cursor = match HexCursor::new(payload_hex) {
        Ok(cursor) => cursor,
        Err(err) => {
            debug!("unparseable OP_RETURN payload: {err}");
            return Vec::new();
        }
    };
    let mut stack = Vec::new();
    while !cursor.is_empty() {
        match cursor.consume_push() {
            Ok(push) if push.is_empty() => continue,
            Ok(push) => stack.push(push),
            Err(err) => {
                debug!("truncated OP_RETURN push stream: {err}");
                break;
            }
        }
    }
    stack
}

pub(crate) fn decode_utf8(push_hex: &str) -> String {
    match hex::decode(push_hex) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => push_hex.to_string(),
    }
}

fn parse_alias(stack: &[String]) -> (String, String, Option<String>) {
    let app = "alias".to_string();
    if stack.len() == 4 && stack[1] == "00" {
        (app, decode_utf8(&stack[2]), None)
    } else {
        (app, "Invalid alias registration".to_string(), None)
    }
}

fn parse_airdrop(stack: &[String]) -> (String, String, Option<String>) {
    let app = "Airdrop".to_string();
    if stack.len() < 2 || stack[1].len() != 64 {
        return (app, "Invalid airdrop".to_string(), None);
    }
    let token_id = Some(stack[1].clone());
    // An airdrop may carry a trailing Cashtab message.
    let msg = if stack.len() >= 4 && stack[2] == CASHTAB_MSG_LOKAD {
        decode_utf8(&stack[3])
    } else {
        String::new()
    };
    (app, msg, token_id)
}

fn parse_cashtab_msg(stack: &[String]) -> (String, String, Option<String>) {
    let app = "Cashtab Msg".to_string();
    if stack.len() >= 2 {
        (app, decode_utf8(&stack[1]), None)
    } else {
        (app, "Invalid Cashtab Msg".to_string(), None)
    }
}

fn parse_swap(stack: &[String]) -> (String, String, Option<String>) {
    let app = "SWaP".to_string();
    if stack.len() < 3 {
        return (app, "Invalid SWaP".to_string(), None);
    }
    // Only a buy/sell rate announcement for a specific token records the
    // token id.
    let token_id = if stack[1] == "01" && stack[2] == "01" && stack.len() >= 4 && stack[3].len() == 64
    {
        Some(stack[3].clone())
    } else {
        None
    };
    let msg = match stack[1].as_str() {
        "01" => "Signal".to_string(),
        "02" => "Payment".to_string(),
        _ => String::new(),
    };
    (app, msg, token_id)
}

fn parse_paybutton(stack: &[String]) -> (String, String, Option<String>) {
    let app = "PayButton".to_string();
    if stack.len() < 3 {
        return (app, "(PayButton, off spec)".to_string(), None);
    }
    if stack[1] != "00" {
        return (app, "(PayButton, unsupported version)".to_string(), None);
    }
    let msg = if stack[2] == "00" {
        String::new()
    } else {
        decode_utf8(&stack[2])
    };
    (app, msg, None)
}

fn parse_paywall(stack: &[String]) -> (String, String, Option<String>) {
    let app = "Paywall".to_string();
    if stack.len() != 2 {
        return (app, "Invalid paywall".to_string(), None);
    }
    if stack[1].len() != 64 {
        return (app, "(Paywall, off spec)".to_string(), None);
    }
    (app, stack[1].clone(), None)
}

fn parse_authentication(stack: &[String]) -> (String, String, Option<String>) {
    let app = "Authentication".to_string();
    if stack.len() != 2 {
        return (app, "Invalid authentication".to_string(), None);
    }
    if stack[1].is_empty() {
        return (app, "(Authentication, off spec)".to_string(), None);
    }
    (app, String::new(), None)
}

/// Fallback for unrecognized tags: ASCII when the whole payload is
/// printable, otherwise hex octet groups bounded for display.
fn unknown_app(stack_array: Vec<String>) -> ParsedOpReturnInfo {
    let joined_hex = stack_array.join("");
    let bytes = hex::decode(&joined_hex).unwrap_or_default();
    let msg = if !bytes.is_empty()
        && bytes
            .iter()
            .all(|&b| (0x20..=0x7e).contains(&b))
    {
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        let grouped = stack_array.join(" ");
        if grouped.len() > UNKNOWN_HEX_DISPLAY_LEN {
            format!("{}...", &grouped[..UNKNOWN_HEX_DISPLAY_LEN])
        } else {
            grouped
        }
    };
    ParsedOpReturnInfo {
        app: "unknown".to_string(),
        msg,
        stack_array,
        token_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AppRegistry;

    fn parse(payload: &str) -> ParsedOpReturnInfo {
        parse_op_return(payload, &AppRegistry::default())
    }

    /// Push-encodes a list of hex payloads.
    fn script_of(pushes: &[&str]) -> String {
        let mut out = String::new();
        for push in pushes {
            out.push_str(&format!("{:02x}", push.len() / 2));
            out.push_str(push);
        }
        out
    }

    #[test]
    fn alias_registration_decodes_name() {
        let payload = script_of(&[
            "2e786563",
            "00",
            "74657374",
            "00231f7087937684790d1049294f3aef9cfb7b05dd",
        ]);
        let info = parse(&payload);
        assert_eq!(info.app, "alias");
        assert_eq!(info.msg, "test");
        assert_eq!(info.stack_array[0], "2e786563");
    }

    #[test]
    fn alias_with_three_pushes_is_invalid() {
        let payload = script_of(&["2e786563", "00", "74657374"]);
        let info = parse(&payload);
        assert_eq!(info.msg, "Invalid alias registration");
    }

    #[test]
    fn airdrop_records_token_and_trailing_msg() {
        let token = "ab".repeat(32);
        let payload = script_of(&[
            "64726f70",
            &token,
            "00746162",
            &hex::encode("gm"),
        ]);
        let info = parse(&payload);
        assert_eq!(info.app, "Airdrop");
        assert_eq!(info.token_id.as_deref(), Some(token.as_str()));
        assert_eq!(info.msg, "gm");
    }

    #[test]
    fn cashtab_msg_requires_two_pushes() {
        let info = parse(&script_of(&["00746162"]));
        assert_eq!(info.msg, "Invalid Cashtab Msg");
        let info = parse(&script_of(&["00746162", &hex::encode("hello")]));
        assert_eq!(info.msg, "hello");
    }

    #[test]
    fn swap_signal_records_token_id() {
        let token = "cd".repeat(32);
        let payload = script_of(&["53575000", "01", "01", &token]);
        let info = parse(&payload);
        assert_eq!(info.app, "SWaP");
        assert_eq!(info.msg, "Signal");
        assert_eq!(info.token_id.as_deref(), Some(token.as_str()));

        let info = parse(&script_of(&["53575000", "01"]));
        assert_eq!(info.msg, "Invalid SWaP");
    }

    #[test]
    fn paybutton_rules() {
        let info = parse(&script_of(&["50415900", "00", &hex::encode("order-44")]));
        assert_eq!(info.msg, "order-44");
        let info = parse(&script_of(&["50415900", "00", "00"]));
        assert_eq!(info.msg, "");
        let info = parse(&script_of(&["50415900", "01", "00"]));
        assert_eq!(info.msg, "(PayButton, unsupported version)");
    }

    #[test]
    fn unknown_tag_ascii_fallback() {
        let info = parse(&script_of(&[&hex::encode("wxyz"), &hex::encode("hi there")]));
        assert_eq!(info.app, "unknown");
        assert_eq!(info.msg, "wxyzhi there");
    }

    #[test]
    fn unknown_tag_hex_fallback_is_bounded() {
        let payload = script_of(&["deadbeef", &"ff".repeat(30)]);
        let info = parse(&payload);
        assert_eq!(info.app, "unknown");
        assert!(info.msg.ends_with("..."));
        // 20 chars + ellipsis
        assert_eq!(info.msg.len(), 23);
    }

    #[test]
    fn zero_length_pushes_are_skipped() {
        // 0x00 push between tag and message
        let payload = format!("{}00{}", script_of(&["00746162"]), {
            let msg = hex::encode("gm");
            format!("{:02x}{}", msg.len() / 2, msg)
        });
        let info = parse(&payload);
        assert_eq!(info.msg, "gm");
        assert_eq!(info.stack_array.len(), 2);
    }
}
