//! AES key-size detection rule.
//!
//! Flags cipher finalization calls (`DoFinal`-style) on block-cipher objects
//! that were initialized with a key built from a flagged key size. One
//! positional parameter selects the policy side: `"Secure"` reports ciphers
//! keyed at the configured secure sizes (24/32 bytes by default, AES-192 and
//! AES-256), `"Insecure"` reports the insecure sizes (16 bytes, AES-128).
//! Any other parameter, or the wrong arity, yields an empty result.
//!
//! The whole detection is forward flow expressed as set algebra: each stage
//! narrows by structural and abstract-value predicates and widens by
//! reference/target resolution. There is no imperative graph walk.

use serde::{Deserialize, Serialize};

use crate::absint::AbstractValue;
use crate::error::EngineError;
use crate::graph::{CompilationUnit, NodeId, NodeTag};
use crate::query::{ElementSet, QueryContext};
use crate::rules::{Rule, Severity};

pub const RULE_ID: &str = "aes_key_size";

/// AES variant names by key size in bytes, for finding messages.
static AES_VARIANTS: phf::Map<i64, &'static str> = phf::phf_map! {
    16i64 => "AES-128",
    24i64 => "AES-192",
    32i64 => "AES-256",
};

fn default_secure_sizes() -> Vec<i64> {
    vec![24, 32]
}

fn default_insecure_sizes() -> Vec<i64> {
    vec![16]
}

fn default_key_type() -> String {
    "KeyParameter".to_string()
}

fn default_cipher_receivers() -> Vec<String> {
    vec![
        "PaddedBufferedBlockCipher".to_string(),
        "CbcBlockCipher".to_string(),
    ]
}

fn default_init_members() -> Vec<String> {
    vec!["Init".to_string()]
}

fn default_sink_members() -> Vec<String> {
    vec!["DoFinal".to_string()]
}

/// Which key sizes count as secure/insecure, and which type/member names
/// anchor the construction and sink stages.
///
/// This is rule data, not an engine property: the 16-vs-24/32 split is a
/// policy choice, and other rules are free to carry different thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AesKeySizeConfig {
    /// Key sizes (bytes) accepted by the "Secure" parameter.
    #[serde(default = "default_secure_sizes")]
    pub secure_sizes: Vec<i64>,
    /// Key sizes (bytes) accepted by the "Insecure" parameter.
    #[serde(default = "default_insecure_sizes")]
    pub insecure_sizes: Vec<i64>,
    /// Short name of the key-wrapper construction (`new KeyParameter(..)`).
    #[serde(default = "default_key_type")]
    pub key_type: String,
    /// Receiver type names whose `Init`-style call marks cipher setup.
    #[serde(default = "default_cipher_receivers")]
    pub cipher_receivers: Vec<String>,
    /// Member names that initialize the cipher.
    #[serde(default = "default_init_members")]
    pub init_members: Vec<String>,
    /// Member names reported as the finalization sink.
    #[serde(default = "default_sink_members")]
    pub sink_members: Vec<String>,
}

impl Default for AesKeySizeConfig {
    fn default() -> Self {
        Self {
            secure_sizes: default_secure_sizes(),
            insecure_sizes: default_insecure_sizes(),
            key_type: default_key_type(),
            cipher_receivers: default_cipher_receivers(),
            init_members: default_init_members(),
            sink_members: default_sink_members(),
        }
    }
}

impl AesKeySizeConfig {
    /// The size list selected by a parameter value, if it is a valid one.
    fn sizes_for(&self, param: &str) -> Option<&[i64]> {
        match param {
            "Secure" => Some(&self.secure_sizes),
            "Insecure" => Some(&self.insecure_sizes),
            _ => None,
        }
    }

    /// Human-readable variant list for a parameter's sizes.
    fn variants_for(&self, param: &str) -> String {
        let Some(sizes) = self.sizes_for(param) else {
            return String::new();
        };
        sizes
            .iter()
            .map(|s| match AES_VARIANTS.get(s) {
                Some(name) => (*name).to_string(),
                None => format!("{}-byte key", s),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The shipped AES key-size rule.
#[derive(Debug, Clone, Default)]
pub struct AesKeySizeRule {
    config: AesKeySizeConfig,
}

impl AesKeySizeRule {
    pub fn new(config: AesKeySizeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AesKeySizeConfig {
        &self.config
    }
}

impl Rule for AesKeySizeRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn description(&self) -> &str {
        "block cipher finalized with a key of a flagged AES key size"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn evaluate(
        &self,
        cx: &QueryContext<'_>,
        params: &[String],
    ) -> Result<ElementSet, EngineError> {
        // Stage 1: parameter dispatch. Wrong arity or an unrecognized value
        // is a configuration error, which degrades to no findings.
        if params.len() != 1 {
            return Ok(ElementSet::new());
        }
        let Some(sizes) = self.config.sizes_for(&params[0]) else {
            return Ok(ElementSet::new());
        };
        let accepted: Vec<AbstractValue> =
            sizes.iter().map(|&s| AbstractValue::exact(s)).collect();

        let literals = cx.find_all(NodeTag::IntegerLiteral)?;
        let refs = cx.find_all(NodeTag::UnknownReference)?;
        let binary = cx.find_all(NodeTag::BinaryExpression)?;
        let methods = cx.find_all(NodeTag::MethodInvocation)?;
        let creations = cx.find_all(NodeTag::ObjectCreation)?;

        // Stage 2: size-scope derivation. Every expression whose abstract
        // value fits one of the selected intervals, lifted to its owning
        // declarators, plus all known references to those declarators.
        let scope = ElementSet::union([&literals, &refs, &binary]);
        let mut size_scope = ElementSet::new();
        size_scope.add(&cx.filter_by_abstract_value(&scope, |v| {
            accepted.iter().any(|a| v.included_in(a))
        })?);

        let mut relevant_key_sizes = cx.ancestors_of_type(&size_scope, NodeTag::Declarator)?;
        let size_uses = cx.find_all_references(&refs, &relevant_key_sizes)?;
        relevant_key_sizes.add(&size_uses);

        // Stage 3: construction-site join. Key-wrapper creations fed by a
        // flagged size, intersected with the Init-style calls made on the
        // configured cipher receivers - both sets must describe the same
        // invocation for the flow to be confirmed.
        let key_params = cx.filter_by_parameters(
            &cx.filter_by_short_name(&creations, &self.config.key_type)?,
            &relevant_key_sizes,
        )?;

        let cipher_init = cx
            .filter_by_member_accesses(
                &methods,
                &self.config.cipher_receivers,
                &self.config.init_members,
            )?
            .intersect(&cx.ancestors_of_type(&key_params, NodeTag::MethodInvocation)?);

        // Stage 4: sink projection. Chase the initialized cipher object to
        // every later call on it and keep the finalization members.
        let cipher_refs =
            cx.find_all_references(&refs, &cx.target_of_members(&cipher_init)?)?;
        let calls = cx.filter_by_kind(
            &cx.members_of_target(&cipher_refs)?,
            NodeTag::MethodInvocation,
        )?;

        let mut sinks = ElementSet::new();
        for sink in &self.config.sink_members {
            sinks.add(&cx.filter_by_short_name(&calls, sink)?);
        }
        Ok(sinks)
    }

    fn describe_match(&self, unit: &CompilationUnit, id: NodeId, params: &[String]) -> String {
        let name = unit
            .node(id)
            .and_then(|n| n.short_name())
            .unwrap_or("finalization");
        let side = match params.first().map(String::as_str) {
            Some("Secure") => "a secure",
            _ => "an insecure",
        };
        let variants = params
            .first()
            .map(|p| self.config.variants_for(p))
            .unwrap_or_default();
        if variants.is_empty() {
            format!("{} finalizes a block cipher keyed at {} key size", name, side)
        } else {
            format!(
                "{} finalizes a block cipher keyed at {} key size ({})",
                name, side, variants
            )
        }
    }
}
