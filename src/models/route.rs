//! Routing-rule data model: predicates, actions, and the prioritised rule
//! list the [`crate::routing::RoutingEngine`] evaluates.
//!
//! These are plain, serializable, tagged-variant structs mirroring the
//! teacher's `RouteMatchError`/`CompiledRoute` style and the `TransformAction`
//! tagging used for transformation rules — the polymorphism lives in an enum
//! evaluated by a single evaluator, not a class hierarchy (SPEC_FULL.md §9).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which part of the request a [`Predicate`] inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PredicateType {
    Path,
    Method,
    Header,
    Query,
    Ip,
    TimeOfDay,
}

/// Comparison applied between the extracted field value and `value`
/// (and `value2` for `Range`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    Exists,
    In,
    Range,
}

/// A single AND-combined condition within a [`RoutingRule`] or transform
/// rule. `field` names the header/query key when `predicate_type` is
/// `Header`/`Query`; it is ignored otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predicate {
    #[serde(rename = "type")]
    pub predicate_type: PredicateType,
    #[serde(default)]
    pub field: Option<String>,
    pub operator: Operator,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub value2: Option<String>,
    #[serde(default)]
    pub negate: bool,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
}

fn default_case_sensitive() -> bool {
    true
}

/// A declarative edit or redirect applied when a rule's predicates match,
/// in declaration order — later actions overwrite earlier fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Rewrite {
        /// New path. If `path_pattern` is set, this is a capture-group
        /// template (`$1`, `${name}`, per [`regex::Captures::expand`])
        /// evaluated against the pattern's match on the request path;
        /// otherwise it is used verbatim.
        #[serde(default)]
        path: Option<String>,
        /// Regex matched against the request path to produce the capture
        /// groups `path` expands. A malformed pattern fails the rule
        /// (SPEC_FULL.md §4.1 "bad regex in path-rewrite").
        #[serde(default)]
        path_pattern: Option<String>,
        #[serde(default)]
        query: Option<HashMap<String, String>>,
        #[serde(default)]
        headers: Option<HashMap<String, String>>,
    },
    Redirect {
        status_code: u16,
        location: String,
    },
    Proxy {
        #[serde(default)]
        service: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
        #[serde(default)]
        retries: Option<u32>,
    },
    Transform {
        transform_ref: String,
    },
}

/// A declarative, immutable-per-config-version mapping from inbound
/// path+method to a service, independent of the imperative rule engine.
/// Kept alongside [`RoutingRule`] because the data model names both: a
/// `Route` is the simple case, a `RoutingRule` the general one. The engine
/// compiles `Route`s into single-predicate `RoutingRule`s at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub path_pattern: String,
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub rate_limit_override: Option<String>,
    #[serde(default)]
    pub transform_ref: Option<String>,
    #[serde(default)]
    pub service_override: Option<String>,
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string()]
}

/// A priority-ordered, predicated, imperative routing step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub actions: Vec<Action>,
    pub service: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub retries: Option<u32>,
    /// Optional custom-script hook recognised by the schema but never
    /// executed; construction rejects any language other than absent or
    /// the literal `"none"`.
    #[serde(default)]
    pub script: Option<ScriptRef>,
}

/// Schema placeholder for script-based custom routing. Execution is out of
/// scope; `language` must be absent or `"none"`, enforced at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRef {
    pub language: String,
    pub source: String,
}

impl RoutingRule {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(script) = &self.script {
            if script.language != "none" {
                return Err(format!(
                    "rule for service '{}' declares unsupported script language '{}'",
                    self.service, script.language
                ));
            }
        }
        if self.service.trim().is_empty() {
            return Err("routing rule must name a target service".to_string());
        }
        Ok(())
    }
}
