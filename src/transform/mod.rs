//! Transformation pipeline: ordered, conditional edits to requests and
//! responses (SPEC_FULL.md §4.5).
//!
//! Rule evaluation mirrors routing (§4.1): predicates AND-combined, rules
//! ordered by priority descending. Unlike routing, a transformation rule
//! does not "win" exclusively — every matching rule's edits apply, in
//! priority order, each governed by its own [`OnErrorPolicy`]. Header and
//! status-code shapes are grounded in the teacher's `middleware/transform.rs`
//! (`HeaderTransformation`, `StatusCodeMapping`); body transforms and
//! validation are new.

pub mod body;

use std::collections::HashMap;

use actix_web::web::Bytes;
use log::warn;

use crate::context::RequestContext;
use crate::models::error::GatewayError;
use crate::models::transform_rule::{
    HeaderTransformation, OnErrorPolicy, RequestTransformation, ResponseTransformation,
    TransformRule,
};
use crate::routing::predicate::CompiledPredicate;

/// A response's mutable parts as seen by the response-transform stage.
/// Independent of [`crate::cache::CachedResponse`] — the dispatcher
/// converts between the two at the cache boundary.
#[derive(Debug, Clone)]
pub struct ResponseParts {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

struct CompiledTransformRule {
    predicates: Vec<CompiledPredicate>,
    request: Option<RequestTransformation>,
    response: Option<ResponseTransformation>,
    on_error: OnErrorPolicy,
    default_body: Option<String>,
}

/// Compiles and applies a list of [`TransformRule`]s.
pub struct TransformationPipeline {
    rules: Vec<CompiledTransformRule>,
}

fn apply_header_transform(headers: &mut HashMap<String, String>, transform: &HeaderTransformation) {
    for name in &transform.remove {
        headers.remove(&name.to_lowercase());
    }
    for (name, value) in &transform.set {
        headers.insert(name.to_lowercase(), value.clone());
    }
}

impl TransformationPipeline {
    pub fn new(mut rules: Vec<TransformRule>) -> Result<Self, GatewayError> {
        rules.sort_by_key(|r| std::cmp::Reverse(r.priority));
        let compiled: Vec<CompiledTransformRule> = rules
            .into_iter()
            .map(|rule| {
                let predicates = rule
                    .predicates
                    .iter()
                    .map(CompiledPredicate::compile)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| GatewayError::Config {
                        message: e.to_string(),
                        route: String::new(),
                    })?;
                Ok(CompiledTransformRule {
                    predicates,
                    request: rule.request,
                    response: rule.response,
                    on_error: rule.on_error,
                    default_body: rule.default_body,
                })
            })
            .collect::<Result<_, GatewayError>>()?;
        Ok(Self { rules: compiled })
    }

    fn predicates_match(predicates: &[CompiledPredicate], ctx: &RequestContext) -> bool {
        predicates.iter().all(|p| p.matches(ctx))
    }

    /// Applies every matching rule's request-transform, in order.
    pub fn apply_request(&self, ctx: &mut RequestContext) -> Result<(), GatewayError> {
        for rule in &self.rules {
            if !Self::predicates_match(&rule.predicates, ctx) {
                continue;
            }
            let Some(req) = &rule.request else { continue };
            if let Err(e) = Self::apply_request_transform(req, ctx) {
                match rule.on_error {
                    OnErrorPolicy::Fail => return Err(e),
                    OnErrorPolicy::Skip => {
                        warn!("request transform skipped after error: {e}");
                    }
                    OnErrorPolicy::Default => {
                        if let Some(default_body) = &rule.default_body {
                            ctx.body = Bytes::from(default_body.clone());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_request_transform(
        transform: &RequestTransformation,
        ctx: &mut RequestContext,
    ) -> Result<(), GatewayError> {
        if let Some(headers) = &transform.headers {
            apply_header_transform(&mut ctx.headers, headers);
        }
        if let Some(query) = &transform.query {
            ctx.merge_query(query);
        }
        if let Some(method) = &transform.method {
            ctx.method = method.clone();
        }
        if let Some(path) = &transform.path {
            ctx.path = path.clone();
        }
        if let Some(validation) = &transform.validation {
            body::validate_body(validation, &ctx.body, ctx.header("content-type"))?;
        }
        if let Some(body_transform) = &transform.body {
            ctx.body = body::apply_body_transform(body_transform, &ctx.body, transform.max_body_bytes)?;
        }
        Ok(())
    }

    /// Applies every matching rule's response-transform, in order.
    pub fn apply_response(
        &self,
        ctx: &RequestContext,
        response: &mut ResponseParts,
    ) -> Result<(), GatewayError> {
        for rule in &self.rules {
            if !Self::predicates_match(&rule.predicates, ctx) {
                continue;
            }
            let Some(resp) = &rule.response else { continue };
            if let Err(e) = Self::apply_response_transform(resp, response) {
                match rule.on_error {
                    OnErrorPolicy::Fail => return Err(e),
                    OnErrorPolicy::Skip => {
                        warn!("response transform skipped after error: {e}");
                    }
                    OnErrorPolicy::Default => {
                        if let Some(default_body) = &rule.default_body {
                            response.body = Bytes::from(default_body.clone());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_response_transform(
        transform: &ResponseTransformation,
        response: &mut ResponseParts,
    ) -> Result<(), GatewayError> {
        if let Some(headers) = &transform.headers {
            apply_header_transform(&mut response.headers, headers);
        }
        if let Some(mapping) = &transform.status {
            response.status = mapping.resolve(response.status);
        }
        let content_type = response.headers.get("content-type").map(|s| s.as_str());
        if let Some(validation) = &transform.validation {
            body::validate_body(validation, &response.body, content_type)?;
        }
        if let Some(body_transform) = &transform.body {
            response.body =
                body::apply_body_transform(body_transform, &response.body, transform.max_body_bytes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::route::{Operator, Predicate, PredicateType};
    use crate::models::transform_rule::BodyTransform;
    use std::time::Instant;

    fn ctx() -> RequestContext {
        RequestContext::new("GET", "/api/x", Instant::now())
    }

    fn always_predicate() -> Predicate {
        Predicate {
            predicate_type: PredicateType::Path,
            field: None,
            operator: Operator::StartsWith,
            value: "/".to_string(),
            value2: None,
            negate: false,
            case_sensitive: true,
        }
    }

    #[test]
    fn header_set_and_remove_applied_in_order() {
        let rule = TransformRule {
            priority: 0,
            predicates: vec![always_predicate()],
            request: Some(RequestTransformation {
                headers: Some(HeaderTransformation {
                    set: HashMap::from([("x-new".to_string(), "v".to_string())]),
                    remove: vec!["x-old".to_string()],
                }),
                ..Default::default()
            }),
            response: None,
            on_error: OnErrorPolicy::Fail,
            default_body: None,
        };
        let pipeline = TransformationPipeline::new(vec![rule]).unwrap();
        let mut c = ctx().with_header("x-old", "stale");
        pipeline.apply_request(&mut c).unwrap();
        assert_eq!(c.header("x-new"), Some("v"));
        assert_eq!(c.header("x-old"), None);
    }

    #[test]
    fn query_edit_overwrites_existing_key_and_appends_new() {
        let rule = TransformRule {
            priority: 0,
            predicates: vec![always_predicate()],
            request: Some(RequestTransformation {
                query: Some(HashMap::from([("a".to_string(), "9".to_string())])),
                ..Default::default()
            }),
            response: None,
            on_error: OnErrorPolicy::Fail,
            default_body: None,
        };
        let pipeline = TransformationPipeline::new(vec![rule]).unwrap();
        let mut c = ctx();
        c.raw_query = "a=1&b=2".to_string();
        pipeline.apply_request(&mut c).unwrap();
        assert_eq!(c.query_param("a"), Some("9".to_string()));
        assert_eq!(c.query_param("b"), Some("2".to_string()));
    }

    #[test]
    fn json_body_template_is_rendered() {
        let rule = TransformRule {
            priority: 0,
            predicates: vec![always_predicate()],
            request: Some(RequestTransformation {
                body: Some(BodyTransform {
                    kind: crate::models::transform_rule::BodyKind::Json,
                    template: Some("{\"greeting\":\"hi {{name}}\"}".to_string()),
                }),
                ..Default::default()
            }),
            response: None,
            on_error: OnErrorPolicy::Fail,
            default_body: None,
        };
        let pipeline = TransformationPipeline::new(vec![rule]).unwrap();
        let mut c = ctx();
        c.body = Bytes::from(&br#"{"name":"ada"}"#[..]);
        pipeline.apply_request(&mut c).unwrap();
        assert_eq!(&c.body[..], b"{\"greeting\":\"hi ada\"}");
    }

    #[test]
    fn validation_failure_with_skip_policy_does_not_error() {
        let rule = TransformRule {
            priority: 0,
            predicates: vec![always_predicate()],
            request: Some(RequestTransformation {
                validation: Some(crate::models::transform_rule::BodyValidation {
                    required_fields: vec!["id".to_string()],
                    ..Default::default()
                }),
                ..Default::default()
            }),
            response: None,
            on_error: OnErrorPolicy::Skip,
            default_body: None,
        };
        let pipeline = TransformationPipeline::new(vec![rule]).unwrap();
        let mut c = ctx();
        c.body = Bytes::from(&br#"{"name":"ada"}"#[..]);
        assert!(pipeline.apply_request(&mut c).is_ok());
    }

    #[test]
    fn validation_failure_with_fail_policy_propagates() {
        let rule = TransformRule {
            priority: 0,
            predicates: vec![always_predicate()],
            request: Some(RequestTransformation {
                validation: Some(crate::models::transform_rule::BodyValidation {
                    required_fields: vec!["id".to_string()],
                    ..Default::default()
                }),
                ..Default::default()
            }),
            response: None,
            on_error: OnErrorPolicy::Fail,
            default_body: None,
        };
        let pipeline = TransformationPipeline::new(vec![rule]).unwrap();
        let mut c = ctx();
        c.body = Bytes::from(&br#"{"name":"ada"}"#[..]);
        assert!(pipeline.apply_request(&mut c).is_err());
    }

    #[test]
    fn status_code_mapping_rewrites_response_status() {
        let rule = TransformRule {
            priority: 0,
            predicates: vec![always_predicate()],
            request: None,
            response: Some(ResponseTransformation {
                status: Some(crate::models::transform_rule::StatusCodeMapping {
                    map: HashMap::from([(502u16, 200u16)]),
                    default: None,
                }),
                ..Default::default()
            }),
            on_error: OnErrorPolicy::Fail,
            default_body: None,
        };
        let pipeline = TransformationPipeline::new(vec![rule]).unwrap();
        let c = ctx();
        let mut resp = ResponseParts {
            status: 502,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        pipeline.apply_response(&c, &mut resp).unwrap();
        assert_eq!(resp.status, 200);
    }
}
