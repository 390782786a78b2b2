//! Predicate compilation and evaluation.
//!
//! A [`Predicate`] from the configuration is compiled once, at
//! [`crate::routing::RoutingEngine`] construction, into a
//! [`CompiledPredicate`] that precompiles any `regex` operator — mirroring
//! the teacher's `RouteMatcher::new` doing its regex compilation up front
//! rather than per request.

use regex::Regex;

use crate::context::RequestContext;
use crate::models::route::{Operator, Predicate, PredicateType};

use super::RuleEvalError;

#[derive(Debug)]
pub struct CompiledPredicate {
    raw: Predicate,
    regex: Option<Regex>,
}

impl CompiledPredicate {
    pub fn compile(predicate: &Predicate) -> Result<Self, RuleEvalError> {
        let regex = if predicate.operator == Operator::Regex {
            Some(
                Regex::new(&predicate.value)
                    .map_err(|e| RuleEvalError::BadPattern(e.to_string()))?,
            )
        } else {
            None
        };
        Ok(Self {
            raw: predicate.clone(),
            regex,
        })
    }

    fn extract(&self, ctx: &RequestContext) -> Option<String> {
        match self.raw.predicate_type {
            PredicateType::Path => Some(ctx.path.clone()),
            PredicateType::Method => Some(ctx.method.clone()),
            PredicateType::Header => self
                .raw
                .field
                .as_deref()
                .and_then(|name| ctx.header(name).map(|v| v.to_string())),
            PredicateType::Query => self
                .raw
                .field
                .as_deref()
                .and_then(|name| ctx.query_param(name)),
            PredicateType::Ip => Some(ctx.client_ip()),
            PredicateType::TimeOfDay => Some(ctx.time_of_day()),
        }
    }

    /// Evaluates this predicate against `ctx`, honoring `case_sensitive`
    /// and `negate`. Missing header/query fields compare as empty string
    /// for every operator except `exists`, which is independently false.
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        let field_value = self.extract(ctx);

        let result = if self.raw.operator == Operator::Exists {
            field_value.is_some()
        } else {
            let target = field_value.unwrap_or_default();
            let (target_cmp, value_cmp) = if self.raw.case_sensitive {
                (target.clone(), self.raw.value.clone())
            } else {
                (target.to_lowercase(), self.raw.value.to_lowercase())
            };

            match self.raw.operator {
                Operator::Equals => target_cmp == value_cmp,
                Operator::Contains => target_cmp.contains(&value_cmp),
                Operator::StartsWith => target_cmp.starts_with(&value_cmp),
                Operator::EndsWith => target_cmp.ends_with(&value_cmp),
                Operator::Regex => self
                    .regex
                    .as_ref()
                    .map(|r| r.is_match(&target))
                    .unwrap_or(false),
                Operator::In => value_cmp
                    .split(',')
                    .map(|s| s.trim())
                    .any(|item| item == target_cmp),
                Operator::Range => {
                    let v2 = self.raw.value2.clone().unwrap_or_default();
                    let v2_cmp = if self.raw.case_sensitive {
                        v2
                    } else {
                        v2.to_lowercase()
                    };
                    value_cmp <= target_cmp && target_cmp <= v2_cmp
                }
                Operator::Exists => unreachable!("handled above"),
            }
        };

        result ^ self.raw.negate
    }
}
