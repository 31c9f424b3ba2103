//! Requester identity
//!
//! Authentication happens upstream; the proxy in front of the server passes
//! the caller's identity in headers.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use presto_core::domain::report::RequestContext;

pub const USER_HEADER: &str = "x-presto-user";
pub const SESSION_HEADER: &str = "x-presto-session";
pub const DELIVER_TO_HEADER: &str = "x-presto-deliver-to";

const ANONYMOUS: &str = "anonymous";

/// Request context built from `X-Presto-*` headers
///
/// The session header is the dedup scope; without it each user is their own
/// scope.
#[derive(Debug, Clone)]
pub struct Requester(pub RequestContext);

impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let user = header(USER_HEADER).unwrap_or_else(|| ANONYMOUS.to_string());
        let scope = header(SESSION_HEADER).unwrap_or_else(|| user.clone());

        let mut context = RequestContext::new(user, scope);
        if let Some(target) = header(DELIVER_TO_HEADER) {
            context = context.with_delivery_target(target);
        }

        Ok(Requester(context))
    }
}
