/// Builds the upstream request URL for a resolved instance.
///
/// `base_url` already carries scheme, host and (if non-default) port — the
/// data model keeps a single `base_url` field per instance rather than
/// separate host/port, so there's no port to reattach here. This just joins
/// the instance's base with the (possibly rewritten) request path and raw
/// query string.
///
/// # Examples
///
/// ```rust
/// use gateway_rs::utils::path::build_target_url;
///
/// let url = build_target_url("http://backend-service:8080", "/v1/users/123", "");
/// assert_eq!(url, "http://backend-service:8080/v1/users/123");
///
/// let url = build_target_url("http://backend-service:8080/", "/v1/users", "active=true");
/// assert_eq!(url, "http://backend-service:8080/v1/users?active=true");
/// ```
pub fn build_target_url(base_url: &str, path: &str, raw_query: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    if raw_query.is_empty() {
        format!("{base}{path}")
    } else {
        format!("{base}{path}?{raw_query}")
    }
}
