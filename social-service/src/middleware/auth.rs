use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode_header, Algorithm};
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;

use crate::{models::User, AppState};

/// Cookie in which Clerk's frontend SDK keeps the session token.
pub const SESSION_COOKIE: &str = "__session";

const NOT_LOGGED_IN: &str = "Unauthorized - you must be logged in";
const INVALID_TOKEN: &str = "Unauthorized access";

/// Who is calling. A request carries either a Clerk session or one of our
/// own HS256 tokens; the token header's `alg` tells them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Clerk {
        user_id: String,
        session_id: Option<String>,
    },
    Local {
        user_id: ObjectId,
    },
}

/// Bearer token if present, otherwise the Clerk session cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

fn authenticate(state: &AppState, token: &str) -> Result<Identity, AppError> {
    let header = decode_header(token).map_err(|_| AppError::unauthorized(INVALID_TOKEN))?;

    match header.alg {
        Algorithm::RS256 => {
            let claims = state.clerk_sessions.verify(token)?;
            Ok(Identity::Clerk {
                user_id: claims.sub,
                session_id: claims.sid,
            })
        }
        Algorithm::HS256 => {
            let claims = state.tokens.verify(token)?;
            let user_id = ObjectId::parse_str(&claims.sub)
                .map_err(|_| AppError::unauthorized(INVALID_TOKEN))?;
            Ok(Identity::Local { user_id })
        }
        other => {
            tracing::debug!(alg = ?other, "Rejected token with unsupported algorithm");
            Err(AppError::unauthorized(INVALID_TOKEN))
        }
    }
}

/// Rejects unauthenticated requests and stores the caller's [`Identity`] in
/// the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token =
        session_token(req.headers()).ok_or_else(|| AppError::unauthorized(NOT_LOGGED_IN))?;

    let identity = authenticate(&state, &token).map_err(|e| {
        tracing::debug!(path = %req.uri().path(), error = %e, "Authentication failed");
        e
    })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// The authenticated identity, without loading a profile.
pub struct AuthIdentity(pub Identity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthIdentity)
            .ok_or_else(|| AppError::unauthorized(NOT_LOGGED_IN))
    }
}

/// Stored profile of the caller; 404 when the identity has none yet (for
/// example a Clerk user who never called `/sync`).
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthIdentity(identity) = AuthIdentity::from_request_parts(parts, state).await?;

        state
            .accounts
            .resolve(&identity)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| AppError::not_found("User not found"))
    }
}
