//! Transformation-rule data model shared by the request and response
//! transformers. Headers/status-code shapes mirror the teacher's
//! `middleware/transform.rs` (`HeaderTransformation`, `StatusCodeMapping`);
//! body transforms, templating, size caps and validation are new.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::route::Predicate;

/// What a body transform does to a request/response payload. `Xml` is a
/// passthrough placeholder at this abstraction layer; a concrete parser can
/// be plugged in without changing the rule schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Json,
    Xml,
    Text,
    Binary,
}

/// Templates reuse the same `regex`-based substitution idiom the teacher
/// already depends on for path capture groups, rather than pulling in a
/// templating crate the teacher does not carry. `{{field.path}}` tokens are
/// substituted from the parsed JSON value (for `Json`) or left literal
/// otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyTransform {
    pub kind: BodyKind,
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderTransformation {
    #[serde(default)]
    pub set: HashMap<String, String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

/// `{from -> to}` map plus a default; the first matching `from` wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCodeMapping {
    #[serde(default)]
    pub map: HashMap<u16, u16>,
    #[serde(default)]
    pub default: Option<u16>,
}

impl StatusCodeMapping {
    pub fn resolve(&self, status: u16) -> u16 {
        self.map.get(&status).copied().unwrap_or(self.default.unwrap_or(status))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyValidation {
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub min_size: Option<usize>,
    #[serde(default)]
    pub max_size: Option<usize>,
    #[serde(default)]
    pub allowed_content_types: Vec<String>,
    #[serde(default)]
    pub forbidden_content_types: Vec<String>,
}

/// Local recovery policy for a rule whose transform or validation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnErrorPolicy {
    Fail,
    Skip,
    Default,
}

impl Default for OnErrorPolicy {
    fn default() -> Self {
        OnErrorPolicy::Fail
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestTransformation {
    #[serde(default)]
    pub headers: Option<HeaderTransformation>,
    #[serde(default)]
    pub query: Option<HashMap<String, String>>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub body: Option<BodyTransform>,
    #[serde(default)]
    pub max_body_bytes: Option<usize>,
    #[serde(default)]
    pub validation: Option<BodyValidation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseTransformation {
    #[serde(default)]
    pub headers: Option<HeaderTransformation>,
    #[serde(default)]
    pub status: Option<StatusCodeMapping>,
    #[serde(default)]
    pub body: Option<BodyTransform>,
    #[serde(default)]
    pub max_body_bytes: Option<usize>,
    #[serde(default)]
    pub validation: Option<BodyValidation>,
}

/// A priority-ordered, predicated transformation step. A rule may carry a
/// request-transform, a response-transform, or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRule {
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub request: Option<RequestTransformation>,
    #[serde(default)]
    pub response: Option<ResponseTransformation>,
    #[serde(default)]
    pub on_error: OnErrorPolicy,
    #[serde(default)]
    pub default_body: Option<String>,
}
