//! Caller identity and client address extraction.
//!
//! The session layer in front of the server authenticates users and forwards the
//! identity in `x-user-id` / `x-user-role` headers. The server trusts those headers
//! as given and must only be reachable through that layer. The `bot` role is the
//! exception: it is honored only for ids in the [`BotAllowlist`], since a bot skips
//! quota and admission control.

use crate::ApiError;
use atelier_core::{Caller, Role};
use atelier_error::{RequestError, RequestErrorKind};
use axum::async_trait;
use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the account class.
pub const USER_ROLE_HEADER: &str = "x-user-role";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// User ids allowed to present the `bot` role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotAllowlist(Arc<HashSet<String>>);

impl BotAllowlist {
    /// Allow exactly `ids`.
    pub fn new<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self(Arc::new(ids.into_iter().map(Into::into).collect()))
    }

    /// Whether `user_id` may act as a bot.
    pub fn allows(&self, user_id: &str) -> bool {
        self.0.contains(user_id)
    }
}

/// Authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
    BotAllowlist: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bots = BotAllowlist::from_ref(state);
        caller_from_headers(&parts.headers, &bots).map(CallerIdentity)
    }
}

fn caller_from_headers(headers: &HeaderMap, bots: &BotAllowlist) -> Result<Caller, ApiError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            RequestError::new(RequestErrorKind::Unauthenticated(format!(
                "missing {} header",
                USER_ID_HEADER
            )))
        })?;

    let role = match headers.get(USER_ROLE_HEADER) {
        None => Role::default(),
        Some(raw) => raw
            .to_str()
            .ok()
            .and_then(|v| Role::from_str(v.trim()).ok())
            .ok_or_else(|| {
                RequestError::new(RequestErrorKind::Unauthenticated(format!(
                    "unknown role in {} header",
                    USER_ROLE_HEADER
                )))
            })?,
    };
    if role == Role::Bot && !bots.allows(user_id) {
        return Err(RequestError::new(RequestErrorKind::Unauthenticated(format!(
            "user {} may not act as a bot",
            user_id
        )))
        .into());
    }

    Ok(Caller::new(user_id, role))
}

/// Network address of the client, used to key admission control.
///
/// The first `x-forwarded-for` entry wins; otherwise the socket peer address,
/// otherwise `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let addr = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ClientAddr(addr))
    }
}
