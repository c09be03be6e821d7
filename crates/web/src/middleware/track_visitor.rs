//! Best-effort visit recording.
//!
//! The insert runs in a detached task after the response is built;
//! failures are logged and never reach the caller. This middleware must
//! not be able to fail a request.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use model::visit::Visit;

use crate::{user_agent, WebState};

/// Paths that would only add noise to the visit log.
fn should_skip(path: &str) -> bool {
    path == "/api/ping" || path.ends_with("/schema")
}

pub async fn track_visitor_middleware(
    State(state): State<WebState>,
    req: Request,
    next: Next,
) -> Response {
    if should_skip(req.uri().path()) {
        return next.run(req).await;
    }

    let started = Instant::now();
    let ip_address = client_ip(req.headers());
    let url = req.uri().to_string();
    let method = req.method().to_string();
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bearer_token = bearer_token(req.headers());

    let response = next.run(req).await;

    let response_code = response.status().as_u16();
    let response_time_ms = started.elapsed().as_millis() as u32;

    let client = state.station_client.clone();
    tokio::spawn(async move {
        let agent_info = user_agent.as_deref().map(user_agent::classify);

        // Resolve the acting user if a valid token was presented.
        let user_id = match bearer_token {
            Some(token) => client
                .user_by_token(&token)
                .await
                .ok()
                .map(|user| user.id),
            None => None,
        };

        let visit = Visit {
            ip_address,
            url,
            method,
            user_agent,
            device_type: agent_info
                .as_ref()
                .map(|info| info.device_type.clone()),
            browser: agent_info.as_ref().and_then(|info| info.browser.clone()),
            os: agent_info.as_ref().and_then(|info| info.os.clone()),
            user_id,
            response_code: Some(response_code),
            response_time_ms: Some(response_time_ms),
        };

        if let Err(why) = client.record_visit(visit).await {
            log::warn!("visitor tracking failed: {why:?}");
        }
    });

    response
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_owned()
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_ping_and_schema_routes() {
        assert!(should_skip("/api/ping"));
        assert!(should_skip("/api/v1/stations/schema"));
        assert!(!should_skip("/api/v1/stations"));
    }

    #[test]
    fn client_ip_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.9, 10.0.0.1".parse().unwrap(),
        );
        assert_eq!(client_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn client_ip_falls_back_to_unknown() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
