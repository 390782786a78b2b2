//! Deterministic request fingerprinting for the response cache.
//!
//! Hash of (method, path, raw-query, the literal name and value of each
//! header in a small allow-list if present, service-name). Per I6 the raw
//! query string is hashed verbatim — no per-key normalisation of repeated
//! or reordered query parameters, matching the spec's literal wording
//! (SPEC_FULL.md §8 decision).

use std::hash::{Hash, Hasher};

use ahash::AHasher;

use crate::context::RequestContext;

const HEADER_ALLOW_LIST: [&str; 4] = ["accept", "accept-encoding", "authorization", "content-type"];

/// Opaque fingerprint used as the cache key. Not cryptographic, but
/// collision-resistant in practice and deterministic for identical input.
pub fn fingerprint(ctx: &RequestContext, service_name: &str) -> u64 {
    let mut hasher = AHasher::default();
    ctx.method.hash(&mut hasher);
    ctx.path.hash(&mut hasher);
    ctx.raw_query.hash(&mut hasher);
    for name in HEADER_ALLOW_LIST {
        name.hash(&mut hasher);
        if let Some(value) = ctx.header(name) {
            value.hash(&mut hasher);
        }
    }
    service_name.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn identical_requests_produce_identical_fingerprints() {
        let a = RequestContext::new("GET", "/x", Instant::now()).with_header("Accept", "json");
        let b = RequestContext::new("GET", "/x", Instant::now()).with_header("Accept", "json");
        assert_eq!(fingerprint(&a, "svc"), fingerprint(&b, "svc"));
    }

    #[test]
    fn reordered_query_string_changes_fingerprint() {
        let mut a = RequestContext::new("GET", "/x", Instant::now());
        a.raw_query = "a=1&b=2".to_string();
        let mut b = RequestContext::new("GET", "/x", Instant::now());
        b.raw_query = "b=2&a=1".to_string();
        assert_ne!(fingerprint(&a, "svc"), fingerprint(&b, "svc"));
    }

    #[test]
    fn different_service_changes_fingerprint() {
        let ctx = RequestContext::new("GET", "/x", Instant::now());
        assert_ne!(fingerprint(&ctx, "svc-a"), fingerprint(&ctx, "svc-b"));
    }
}
