use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use api::auth::{self, reset, AccountForm};
use api::{ApiResult, AppContext};

use crate::gate::{sign_in, sign_out, LOGIN_PATH};

pub(crate) const HOME_PATH: &str = "/list";
const RESET_REQUESTED: &str = "If the address belongs to an account, a reset link is on its way";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPage {
    pub login: bool,
    pub registration_open: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    pub registration_open: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct NewPassword {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenStatus {
    pub valid: bool,
}

pub async fn login_page(State(ctx): State<AppContext>) -> ApiResult<Json<LoginPage>> {
    Ok(Json(LoginPage {
        login: true,
        registration_open: auth::registration_open(ctx.store()).await?,
    }))
}

pub async fn login(
    State(ctx): State<AppContext>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> ApiResult<impl IntoResponse> {
    let user = auth::login(ctx.store(), &form.email, &form.password).await?;
    sign_in(&session, user.id).await?;
    tracing::info!("User {} logged in", user.id);
    Ok((StatusCode::OK, [(LOCATION, HOME_PATH)]))
}

pub async fn logout(session: Session) -> ApiResult<impl IntoResponse> {
    sign_out(&session).await?;
    Ok((StatusCode::NO_CONTENT, [(LOCATION, LOGIN_PATH)]))
}

pub async fn registration_status(
    State(ctx): State<AppContext>,
) -> ApiResult<Json<RegistrationStatus>> {
    Ok(Json(RegistrationStatus {
        registration_open: auth::registration_open(ctx.store()).await?,
    }))
}

/// Create the first admin and sign them in.
pub async fn register(
    State(ctx): State<AppContext>,
    session: Session,
    Form(form): Form<AccountForm>,
) -> ApiResult<impl IntoResponse> {
    let user = auth::register_first_admin(ctx.store(), &form).await?;
    sign_in(&session, user.id).await?;
    Ok((StatusCode::CREATED, [(LOCATION, HOME_PATH)], Json(user)))
}

pub async fn request_reset(
    State(ctx): State<AppContext>,
    Form(form): Form<ResetRequest>,
) -> ApiResult<&'static str> {
    reset::request_reset(
        ctx.store(),
        ctx.mailer.as_ref(),
        &ctx.settings.app.url,
        &form.email,
    )
    .await?;
    Ok(RESET_REQUESTED)
}

pub async fn reset_status(
    State(ctx): State<AppContext>,
    Path(token): Path<String>,
) -> ApiResult<Json<TokenStatus>> {
    let valid = reset::valid_token(ctx.store(), &token).await?.is_some();
    Ok(Json(TokenStatus { valid }))
}

pub async fn complete_reset(
    State(ctx): State<AppContext>,
    Path(token): Path<String>,
    Form(form): Form<NewPassword>,
) -> ApiResult<impl IntoResponse> {
    reset::complete_reset(ctx.store(), &token, &form.password).await?;
    Ok((StatusCode::NO_CONTENT, [(LOCATION, LOGIN_PATH)]))
}
