//! The routing decision engine: matches a request against a prioritised
//! rule set and resolves it to a [`RoutingDecision`].

use std::collections::HashMap;
use std::time::Duration;

use log::warn;
use regex::Regex;

use crate::context::RequestContext;
use crate::models::gateway_config::FallbackPolicy;
use crate::models::route::{Action, RoutingRule};

use super::predicate::CompiledPredicate;
use super::RuleEvalError;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_RETRIES: u32 = 0;

/// The resolved outcome of evaluating the rule set against a request:
/// target service, any URL/query/header edits, an optional redirect status,
/// and the timeout/retry budget to forward with.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub service: String,
    pub path_override: Option<String>,
    pub query_edits: HashMap<String, String>,
    pub header_edits: HashMap<String, String>,
    pub redirect: Option<(u16, String)>,
    pub timeout: Duration,
    pub retries: u32,
    pub transform_ref: Option<String>,
}

impl RoutingDecision {
    fn from_rule(rule: &CompiledRule) -> Self {
        Self {
            service: rule.service.clone(),
            path_override: None,
            query_edits: HashMap::new(),
            header_edits: HashMap::new(),
            redirect: None,
            timeout: Duration::from_millis(rule.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
            retries: rule.retries.unwrap_or(DEFAULT_RETRIES),
            transform_ref: None,
        }
    }
}

struct CompiledRule {
    priority: i32,
    predicates: Vec<CompiledPredicate>,
    actions: Vec<Action>,
    service: String,
    timeout_ms: Option<u64>,
    retries: Option<u32>,
}

/// Precompiled, priority-sorted rule set. Construction compiles every
/// predicate's regex once; per-request evaluation only matches.
pub struct RoutingEngine {
    rules: Vec<CompiledRule>,
    fallback: FallbackPolicy,
}

impl RoutingEngine {
    pub fn new(rules: &[RoutingRule], fallback: FallbackPolicy) -> Result<Self, RuleEvalError> {
        for rule in rules {
            rule.validate().map_err(RuleEvalError::BadPattern)?;
        }

        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let predicates = rule
                .predicates
                .iter()
                .map(CompiledPredicate::compile)
                .collect::<Result<Vec<_>, _>>()?;
            compiled.push(CompiledRule {
                priority: rule.priority,
                predicates,
                actions: rule.actions.clone(),
                service: rule.service.clone(),
                timeout_ms: rule.timeout_ms,
                retries: rule.retries,
            });
        }
        // Stable sort preserves configured insertion order for equal priorities.
        compiled.sort_by(|a, b| b.priority.cmp(&a.priority));

        Ok(Self {
            rules: compiled,
            fallback,
        })
    }

    /// Resolves `ctx` to a routing decision. The first rule whose
    /// predicates all match and whose actions apply cleanly wins; an
    /// action error logs and advances to the next candidate rule.
    pub fn evaluate(&self, ctx: &RequestContext) -> Result<RoutingDecision, RuleEvalError> {
        for rule in &self.rules {
            if !rule.predicates.iter().all(|p| p.matches(ctx)) {
                continue;
            }
            match Self::apply_actions(rule, ctx) {
                Ok(decision) => return Ok(decision),
                Err(e) => {
                    warn!("routing rule for service '{}' failed to apply: {e}", rule.service);
                    continue;
                }
            }
        }

        if self.fallback.enabled {
            if let Some(service) = &self.fallback.service {
                let decision = RoutingDecision {
                    service: service.clone(),
                    path_override: None,
                    query_edits: HashMap::new(),
                    header_edits: HashMap::new(),
                    redirect: None,
                    timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
                    retries: DEFAULT_RETRIES,
                    transform_ref: None,
                };
                return Ok(decision);
            }
        }

        Err(RuleEvalError::NoRuleMatched {
            path: ctx.path.clone(),
        })
    }

    fn apply_actions(rule: &CompiledRule, ctx: &RequestContext) -> Result<RoutingDecision, RuleEvalError> {
        let mut decision = RoutingDecision::from_rule(rule);
        for action in &rule.actions {
            match action {
                Action::Rewrite { path, path_pattern, query, headers } => {
                    if let Some(path) = path {
                        decision.path_override = Some(Self::rewrite_path(path, path_pattern.as_deref(), &ctx.path)?);
                    }
                    if let Some(query) = query {
                        decision.query_edits.extend(query.clone());
                    }
                    if let Some(headers) = headers {
                        decision.header_edits.extend(headers.clone());
                    }
                }
                Action::Redirect { status_code, location } => {
                    decision.redirect = Some((*status_code, location.clone()));
                }
                Action::Proxy {
                    service,
                    url,
                    timeout_ms,
                    retries,
                } => {
                    if let Some(service) = service {
                        decision.service = service.clone();
                    }
                    if let Some(url) = url {
                        decision.path_override = Some(url.clone());
                    }
                    if let Some(timeout_ms) = timeout_ms {
                        decision.timeout = Duration::from_millis(*timeout_ms);
                    }
                    if let Some(retries) = retries {
                        decision.retries = *retries;
                    }
                }
                Action::Transform { transform_ref } => {
                    decision.transform_ref = Some(transform_ref.clone());
                }
            }
        }
        Ok(decision)
    }

    /// Expands `template` against `pattern`'s capture groups matched on
    /// `actual_path`. With no `pattern`, `template` is used verbatim. A
    /// pattern that fails to compile is a rule error; a pattern that
    /// compiles but doesn't match `actual_path` leaves the template
    /// unexpanded (no `$n` groups to substitute).
    fn rewrite_path(template: &str, pattern: Option<&str>, actual_path: &str) -> Result<String, RuleEvalError> {
        let Some(pattern) = pattern else {
            return Ok(template.to_string());
        };
        let regex = Regex::new(pattern)
            .map_err(|e| RuleEvalError::BadPattern(format!("invalid path-rewrite pattern '{pattern}': {e}")))?;
        match regex.captures(actual_path) {
            Some(captures) => {
                let mut expanded = String::new();
                captures.expand(template, &mut expanded);
                Ok(expanded)
            }
            None => Ok(template.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::route::{Operator, Predicate, PredicateType};
    use std::time::Instant;

    fn path_rule(priority: i32, path: &str, service: &str) -> RoutingRule {
        RoutingRule {
            priority,
            predicates: vec![Predicate {
                predicate_type: PredicateType::Path,
                field: None,
                operator: Operator::StartsWith,
                value: path.to_string(),
                value2: None,
                negate: false,
                case_sensitive: true,
            }],
            actions: vec![],
            service: service.to_string(),
            timeout_ms: None,
            retries: None,
            script: None,
        }
    }

    #[test]
    fn higher_priority_rule_wins_on_tie() {
        let rules = vec![
            path_rule(1, "/api", "low-priority-svc"),
            path_rule(5, "/api", "high-priority-svc"),
        ];
        let engine = RoutingEngine::new(&rules, FallbackPolicy::default()).unwrap();
        let ctx = RequestContext::new("GET", "/api/ping", Instant::now());
        let decision = engine.evaluate(&ctx).unwrap();
        assert_eq!(decision.service, "high-priority-svc");
    }

    #[test]
    fn no_match_without_fallback_errors() {
        let rules = vec![path_rule(1, "/api", "svc-a")];
        let engine = RoutingEngine::new(&rules, FallbackPolicy::default()).unwrap();
        let ctx = RequestContext::new("GET", "/other", Instant::now());
        assert!(matches!(
            engine.evaluate(&ctx),
            Err(RuleEvalError::NoRuleMatched { .. })
        ));
    }

    #[test]
    fn fallback_used_when_enabled() {
        let rules = vec![path_rule(1, "/api", "svc-a")];
        let fallback = FallbackPolicy {
            enabled: true,
            service: Some("fallback-svc".to_string()),
            status_code: 502,
        };
        let engine = RoutingEngine::new(&rules, fallback).unwrap();
        let ctx = RequestContext::new("GET", "/other", Instant::now());
        let decision = engine.evaluate(&ctx).unwrap();
        assert_eq!(decision.service, "fallback-svc");
    }

    #[test]
    fn bad_rewrite_pattern_falls_through_to_next_rule() {
        let mut bad_rule = path_rule(5, "/api", "bad-svc");
        bad_rule.actions = vec![Action::Rewrite {
            path: Some("/v1$1".to_string()),
            path_pattern: Some("(".to_string()),
            query: None,
            headers: None,
        }];
        let fallback_rule = path_rule(1, "/api", "good-svc");
        let engine = RoutingEngine::new(&[bad_rule, fallback_rule], FallbackPolicy::default()).unwrap();
        let ctx = RequestContext::new("GET", "/api/ping", Instant::now());
        let decision = engine.evaluate(&ctx).unwrap();
        assert_eq!(decision.service, "good-svc");
    }

    #[test]
    fn rewrite_pattern_expands_capture_groups() {
        let mut rule = path_rule(1, "/api", "svc-a");
        rule.actions = vec![Action::Rewrite {
            path: Some("/internal/$1".to_string()),
            path_pattern: Some(r"^/api/orders/(\d+)$".to_string()),
            query: None,
            headers: None,
        }];
        let engine = RoutingEngine::new(&[rule], FallbackPolicy::default()).unwrap();
        let ctx = RequestContext::new("GET", "/api/orders/42", Instant::now());
        let decision = engine.evaluate(&ctx).unwrap();
        assert_eq!(decision.path_override, Some("/internal/42".to_string()));
    }

    #[test]
    fn rejects_unsupported_script_language() {
        let mut rule = path_rule(1, "/api", "svc-a");
        rule.script = Some(crate::models::route::ScriptRef {
            language: "lua".to_string(),
            source: "return 1".to_string(),
        });
        let err = RoutingEngine::new(&[rule], FallbackPolicy::default());
        assert!(err.is_err());
    }
}
