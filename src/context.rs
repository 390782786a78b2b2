//! The transient per-request state threaded through the routing engine,
//! transformation pipeline and dispatcher. Dies with the response; nothing
//! here is persisted.

use std::collections::HashMap;
use std::time::Instant;

use actix_web::web::Bytes;
use chrono::Timelike;

/// Snapshot of an inbound request plus dispatch bookkeeping.
///
/// `headers` keys are stored lower-cased so predicate/header lookups are
/// case-insensitive by default; `case_sensitive: false` on a predicate
/// additionally lower-cases the comparison value.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub raw_query: String,
    pub headers: HashMap<String, String>,
    pub remote_addr: Option<String>,
    pub attempt: u32,
    pub deadline: Instant,
    pub body: Bytes,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>, deadline: Instant) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            raw_query: String::new(),
            headers: HashMap::new(),
            remote_addr: None,
            attempt: 0,
            deadline,
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    /// Parses `raw_query` into an ordered list of (name, value) pairs,
    /// preserving duplicates — the fingerprint hashes the raw string
    /// verbatim (I6), but predicate evaluation needs structured access.
    pub fn query_params(&self) -> Vec<(String, String)> {
        if self.raw_query.is_empty() {
            return Vec::new();
        }
        self.raw_query
            .split('&')
            .filter(|p| !p.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_params()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Merges `edits` into the raw query string: existing keys are
    /// overwritten in place at their first occurrence, new keys appended.
    /// Shared by routing-decision application and the transformation
    /// pipeline's query edits.
    pub fn merge_query(&mut self, edits: &HashMap<String, String>) {
        let mut pairs = self.query_params();
        for (key, value) in edits {
            if let Some(existing) = pairs.iter_mut().find(|(k, _)| k == key) {
                existing.1 = value.clone();
            } else {
                pairs.push((key.clone(), value.clone()));
            }
        }
        self.raw_query = pairs
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
    }

    /// IP extraction for `type=ip` predicates: first token of
    /// `X-Forwarded-For`, else `X-Real-IP`, else the transport remote
    /// address, trimmed.
    pub fn client_ip(&self) -> String {
        if let Some(xff) = self.header("x-forwarded-for") {
            if let Some(first) = xff.split(',').next() {
                return first.trim().to_string();
            }
        }
        if let Some(real_ip) = self.header("x-real-ip") {
            return real_ip.trim().to_string();
        }
        self.remote_addr.clone().unwrap_or_default()
    }

    /// Looks up a cookie by name from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let raw = self.header("cookie")?;
        raw.split(';').find_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k == name).then(|| v.to_string())
        })
    }

    /// Local time-of-day as `HH:MM`, used by `type=time-of-day` predicates.
    pub fn time_of_day(&self) -> String {
        let now = chrono::Local::now();
        format!("{:02}:{:02}", now.hour(), now.minute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::new("GET", "/api/x", Instant::now())
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let c = ctx()
            .with_header("X-Forwarded-For", "1.1.1.1, 2.2.2.2")
            .with_header("X-Real-IP", "3.3.3.3");
        assert_eq!(c.client_ip(), "1.1.1.1");
    }

    #[test]
    fn query_params_preserves_duplicates() {
        let mut c = ctx();
        c.raw_query = "a=1&a=2&b=3".to_string();
        assert_eq!(
            c.query_params(),
            vec![
                ("a".to_string(), "1".to_string()),
                ("a".to_string(), "2".to_string()),
                ("b".to_string(), "3".to_string()),
            ]
        );
    }
}
