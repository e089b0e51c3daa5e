//! CORS origin allow-list.
//!
//! `OPTIONS` everywhere returns CORS headers; allowed origins are an
//! explicit allow-list; for non-allow-listed origins the
//! `Access-Control-Allow-Origin` header is omitted (not echoed).

use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build a `CorsLayer` that only ever reflects an origin present in
/// `allowed_origins`. Any other `Origin` header gets no ACAO header at all —
/// `tower_http`'s predicate-based `AllowOrigin` does this natively by
/// returning `false` from the predicate.
pub fn layer(allowed_origins: Vec<String>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _request_parts| {
            match origin.to_str() {
                Ok(origin) => allowed_origins.iter().any(|allowed| allowed == origin),
                Err(_) => false,
            }
        }))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_panicking() {
        let _layer = layer(vec!["https://example.com".to_string()]);
    }
}
