use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};

use crate::auth::extract::CurrentUser;
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{is_unique_violation, ApiError};
use crate::state::AppState;
use crate::users::dto::{
    DataResponse, LoginRequest, LoginResponse, ProfileResponse, PublicUser, RegisterRequest,
    RegisterResponse, RoommateParams, UpdateProfileRequest,
};
use crate::users::repo::User;
use crate::users::services::{self, RoommateQuery};

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    let password = payload.password.trim().to_string();

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::validation(
            "Please provide name, email and password",
        ));
    }
    if !services::is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::validation("Please add a valid email"));
    }
    if password.chars().count() < 6 {
        return Err(ApiError::validation(
            "Password must be at least 6 characters",
        ));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::conflict("User already exists"));
    }

    let hash = hash_password(&password)?;
    let user = match User::create(&state.db, &name, &email, &hash).await {
        Ok(user) => user,
        // two concurrent registrations can pass the pre-check; the unique
        // index settles it
        Err(err) if is_unique_violation(&err) => {
            return Err(ApiError::conflict("User already exists"))
        }
        Err(err) => return Err(err.into()),
    };

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            token,
            user: PublicUser {
                id: user.id,
                name: user.name,
                email: user.email,
            },
        }),
    ))
}

// TODO: add rate limiting / lockout here; repeated failed logins are
// currently unbounded.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let password = payload.password.trim().to_string();

    if email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Please provide email and password"));
    }

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "login with unknown email");
            ApiError::InvalidCredentials
        })?;

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        success: true,
        token,
    }))
}

#[instrument(skip_all)]
pub async fn get_profile(
    CurrentUser(user): CurrentUser,
) -> Json<DataResponse<ProfileResponse>> {
    Json(DataResponse::new(ProfileResponse::from(user)))
}

#[instrument(skip(state, user, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<DataResponse<ProfileResponse>>, ApiError> {
    let changes = services::normalize_update(payload)?;
    let updated = User::update_profile(&state.db, user.id, &changes).await?;
    info!(user_id = %updated.id, "profile updated");
    Ok(Json(DataResponse::new(ProfileResponse::from(updated))))
}

#[instrument(skip(state, user))]
pub async fn find_roommates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<RoommateParams>,
) -> Result<Json<DataResponse<Vec<ProfileResponse>>>, ApiError> {
    let filters = RoommateQuery::from(params);
    let roommates = User::find_roommates(&state.db, user.id, &filters).await?;
    Ok(Json(DataResponse::new(
        roommates.into_iter().map(ProfileResponse::from).collect(),
    )))
}

/// Public listing of all users, kept for API compatibility. Serializes
/// through the profile projection, so no hashes.
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfileResponse>>, ApiError> {
    let users = User::list_all(&state.db).await?;
    Ok(Json(users.into_iter().map(ProfileResponse::from).collect()))
}
