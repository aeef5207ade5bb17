//! Immutable reference data: OP_RETURN application tags, known miners, and
//! the fixed reference scripts used by the daily summary counters.
//!
//! All of it is injected configuration — constructed once (usually via
//! `Default`) and passed by reference, so tests can swap registries without
//! touching process-wide state.

use once_cell::sync::Lazy;

/// Height at which staking rewards activated on mainnet.
pub const STAKING_ACTIVATION_HEIGHT: u32 = 818_670;

/// Blocks between block-reward halvings.
pub const HALVING_INTERVAL: u32 = 210_000;

/// The halving countdown appears during the final retarget period before a
/// halving boundary.
pub const HALVING_COUNTDOWN_WINDOW: u32 = 2_016;

/// Satoshis per XEC.
pub const SATS_PER_XEC: i64 = 100;

// OP_RETURN application tags (lokad ids), lowercase hex.
pub const ALIAS_LOKAD: &str = "2e786563";
pub const AIRDROP_LOKAD: &str = "64726f70";
pub const CASHTAB_MSG_LOKAD: &str = "00746162";
pub const ENCRYPTED_CASHTAB_MSG_LOKAD: &str = "65746162";
pub const FUSION_LOKAD: &str = "46555a00";
pub const FUSION_LEGACY_LOKAD: &str = "46555a02";
pub const SWAP_LOKAD: &str = "53575000";
pub const PAYBUTTON_LOKAD: &str = "50415900";
pub const PAYWALL_LOKAD: &str = "70617977";
pub const AUTHENTICATION_LOKAD: &str = "61757468";

/// First byte of every memo-protocol tag push.
pub const MEMO_PREFIX: &str = "6d";

/// Prefix of ALP payloads inside an EMPP envelope ("SLP2").
pub const ALP_LOKAD: &str = "534c5032";

#[derive(Debug, Clone)]
pub struct AppSpec {
    pub lokad: String,
    pub label: String,
    pub emoji: String,
}

/// Registry of recognized OP_RETURN application tags.
#[derive(Debug, Clone)]
pub struct AppRegistry {
    apps: Vec<AppSpec>,
}

impl AppRegistry {
    pub fn new(apps: Vec<AppSpec>) -> Self {
        Self { apps }
    }

    pub fn lookup(&self, lokad: &str) -> Option<&AppSpec> {
        self.apps.iter().find(|a| a.lokad == lokad)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppSpec> {
        self.apps.iter()
    }
}

impl Default for AppRegistry {
    fn default() -> Self {
        let spec = |lokad: &str, label: &str, emoji: &str| AppSpec {
            lokad: lokad.to_string(),
            label: label.to_string(),
            emoji: emoji.to_string(),
        };
        Self::new(vec![
            spec(ALIAS_LOKAD, "alias", "👾"),
            spec(AIRDROP_LOKAD, "Airdrop", "🪂"),
            spec(CASHTAB_MSG_LOKAD, "Cashtab Msg", "🖋"),
            spec(ENCRYPTED_CASHTAB_MSG_LOKAD, "Encrypted Cashtab Msg", "🔏"),
            spec(FUSION_LOKAD, "CashFusion", "⚛️"),
            spec(FUSION_LEGACY_LOKAD, "CashFusion", "⚛️"),
            spec(SWAP_LOKAD, "SWaP", "🤳"),
            spec(PAYBUTTON_LOKAD, "PayButton", "🛒"),
            spec(PAYWALL_LOKAD, "Paywall", "💸"),
            spec(AUTHENTICATION_LOKAD, "Authentication", "🔓"),
        ])
    }
}

/// How to refine a matched miner's name from its coinbase scriptsig.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinerParseRule {
    /// The registry name is final.
    None,
    /// The pool software writes `/`-delimited fields; the field immediately
    /// after the known fragment names the sub-miner.
    SlashDelimited,
}

#[derive(Debug, Clone)]
pub struct KnownMiner {
    pub name: String,
    /// Exact payout output script, lowercase hex.
    pub payout_script: Option<String>,
    /// Scriptsig substring, lowercase hex.
    pub coinbase_fragment: Option<String>,
    pub parse_rule: MinerParseRule,
}

/// Known-miner registry plus the solo-miner self-identification strings
/// recognized inside slash-delimited pool fields.
#[derive(Debug, Clone)]
pub struct KnownMiners {
    pub miners: Vec<KnownMiner>,
    /// `(matched text, display name)` pairs.
    pub solo_identities: Vec<(String, String)>,
}

impl Default for KnownMiners {
    fn default() -> Self {
        let fragment = |name: &str, frag_ascii: &str, rule: MinerParseRule| KnownMiner {
            name: name.to_string(),
            payout_script: None,
            coinbase_fragment: Some(hex::encode(frag_ascii.as_bytes())),
            parse_rule: rule,
        };
        let payout = |name: &str, script: &str| KnownMiner {
            name: name.to_string(),
            payout_script: Some(script.to_string()),
            coinbase_fragment: None,
            parse_rule: MinerParseRule::None,
        };
        Self {
            miners: vec![
                fragment("ViaBTC", "/ViaBTC", MinerParseRule::SlashDelimited),
                fragment("CK Pool", "ckpool", MinerParseRule::SlashDelimited),
                fragment("solopool.org", "solopool.org", MinerParseRule::None),
                fragment("Zulu Pool", "ZULUPooL", MinerParseRule::None),
                payout(
                    "Mining-Dutch",
                    "76a914a24e2b67689c3753983d3b408bc7690d31b1b74d88ac",
                ),
                payout(
                    "Molepool",
                    "76a914637e48a57a3f3d6184f3aaf68b9e2a77400f372c88ac",
                ),
            ],
            solo_identities: vec![
                ("IceBerg".to_string(), "IceBerg".to_string()),
                ("iceberg2".to_string(), "IceBerg".to_string()),
            ],
        }
    }
}

/// Fixed funding scripts the daily summary counts operational activity for.
#[derive(Debug, Clone)]
pub struct ReferenceScripts {
    /// Cashtab rewards server payout script.
    pub token_server: String,
    /// Exchange hot wallet (withdrawal volume counter).
    pub exchange_hot_wallet: String,
}

impl Default for ReferenceScripts {
    fn default() -> Self {
        Self {
            token_server: "76a914821407ac2993f8684227004f4086082f3f801da788ac".to_string(),
            exchange_hot_wallet: "76a914231f7087937684790d1049294f3aef9cfb7b05dd88ac".to_string(),
        }
    }
}

/// Process-wide default registries for callers that do not inject their own.
pub static DEFAULT_APP_REGISTRY: Lazy<AppRegistry> = Lazy::new(AppRegistry::default);
pub static DEFAULT_KNOWN_MINERS: Lazy<KnownMiners> = Lazy::new(KnownMiners::default);
pub static DEFAULT_REFERENCE_SCRIPTS: Lazy<ReferenceScripts> = Lazy::new(ReferenceScripts::default);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        let registry = AppRegistry::default();
        assert_eq!(registry.lookup(ALIAS_LOKAD).unwrap().label, "alias");
        assert!(registry.lookup("deadbeef").is_none());
    }

    #[test]
    fn both_fusion_variants_resolve() {
        let registry = AppRegistry::default();
        assert_eq!(registry.lookup(FUSION_LOKAD).unwrap().label, "CashFusion");
        assert_eq!(
            registry.lookup(FUSION_LEGACY_LOKAD).unwrap().label,
            "CashFusion"
        );
    }
}
