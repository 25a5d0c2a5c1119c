use crate::{
    extractor::AuthorizedUser,
    model::auth::{AccessTokenResponse, LoginRequest},
};
use axum::{extract::State, http::StatusCode, Json};
use garde::Validate;
use registry::AppRegistry;
use shared::error::AppResult;

/// LINE Login の id_token を検証してセッションを発行する
pub async fn login(
    State(registry): State<AppRegistry>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AccessTokenResponse>> {
    req.validate(&())?;

    let user_id = registry.id_token_verifier().verify(&req.id_token).await?;
    let token = registry.session_repository().create(user_id.clone()).await?;

    Ok(Json(AccessTokenResponse {
        user_id,
        access_token: token.0,
    }))
}

pub async fn logout(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .session_repository()
        .revoke(&user.access_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
