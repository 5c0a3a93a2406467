use crate::error::AppError;
use axum::{
    extract::Request,
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use isbot::Bots;
use std::sync::OnceLock;

/// Requests scoring at or above this are rejected.
pub const BOT_SCORE_THRESHOLD: u32 = 100;

const UNGUARDED_PATHS: [&str; 3] = ["/health", "/ready", "/metrics"];

fn bots() -> &'static Bots {
    static BOTS: OnceLock<Bots> = OnceLock::new();
    BOTS.get_or_init(Bots::default)
}

/// Heuristic bot score for a request's headers.
///
/// Known crawler user agents score 100 outright. An empty user agent scores
/// 50. Browser-looking agents lose points for each missing header a real
/// browser always sends.
pub fn bot_score(headers: &HeaderMap) -> u32 {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if user_agent.is_empty() {
        return 50;
    }

    let mut score = 0;
    if bots().is_bot(user_agent) {
        score += 100;
    }

    if user_agent.starts_with("Mozilla/") {
        let missing = [
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
            header::ACCEPT_ENCODING,
        ]
        .iter()
        .filter(|h| !headers.contains_key(*h))
        .count();

        score += match missing {
            0 => 0,
            1 => 30,
            _ => 70,
        };
    }

    score
}

pub async fn bot_detection_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    if request.method() == Method::OPTIONS || UNGUARDED_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let score = bot_score(request.headers());
    if score >= BOT_SCORE_THRESHOLD {
        tracing::warn!(
            user_agent = ?request.headers().get(header::USER_AGENT),
            score,
            path = %request.uri().path(),
            "Blocking suspected bot request"
        );
        return Err(AppError::forbidden("Automated requests are not allowed."));
    }

    Ok(next.run(request).await)
}
