//! `/api/users`: local signup and login, profiles, Clerk sync and the
//! follow toggle.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::users::{
        AccountSummary, AuthResponse, FollowResponse, LoginRequest, SignUpRequest,
        SyncResponse, UpdateProfileRequest, UserEnvelope, UserResponse,
    },
    middleware::{AuthIdentity, CurrentUser, Identity},
    utils::ValidatedJson,
    AppState,
};

/// `POST /signup`. Responds 201 with the new user and a token.
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, token) = state.accounts.signup(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".to_string(),
            token,
            user: AccountSummary::from(&user),
        }),
    ))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, token) = state.accounts.login(req).await?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: AccountSummary::from(&user),
    }))
}

/// `GET /profile/:username`. Public.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.accounts.profile(&username).await?;
    Ok(Json(UserEnvelope {
        user: UserResponse::from(&user),
    }))
}

/// `PUT /profile`. Only fields present in the body are changed.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.accounts.update_profile(&user, req.into()).await?;
    Ok(Json(UserEnvelope {
        user: UserResponse::from(&updated),
    }))
}

/// Provision the local profile for the Clerk user behind the session.
pub async fn sync_user(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
) -> Result<impl IntoResponse, AppError> {
    let Identity::Clerk { user_id, .. } = identity else {
        return Err(AppError::bad_request(
            "Sync requires a Clerk session",
        ));
    };

    let (user, created) = state.accounts.sync_clerk_user(&user_id).await?;
    let (status, message) = if created {
        (StatusCode::CREATED, "User created successfully")
    } else {
        (StatusCode::OK, "User already exists")
    };

    Ok((
        status,
        Json(SyncResponse {
            user: UserResponse::from(&user),
            message: message.to_string(),
        }),
    ))
}

/// `GET /me`
pub async fn get_me(CurrentUser(user): CurrentUser) -> Result<impl IntoResponse, AppError> {
    Ok(Json(UserEnvelope {
        user: UserResponse::from(&user),
    }))
}

/// `POST /follow/:targetUserId`. Follows or unfollows depending on the current
/// state.
pub async fn follow_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(target_user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let following = state.accounts.toggle_follow(&user, &target_user_id).await?;

    let message = if following {
        "User followed successfully"
    } else {
        "User unfollowed successfully"
    };

    Ok(Json(FollowResponse {
        message: message.to_string(),
        following,
    }))
}
