use crate::{
    auth::{
        auth::AuthUser,
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_dummy, verify_password},
    },
    config::Config,
    error::AppError,
    model::user::User,
    models::{ChangePasswordReq, LoginReqDto, RegisterUserReq, TokenPair, TokenType},
    store::CredentialStore,
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;
use tracing::{debug, error, info, instrument};

const MIN_PASSWORD_LEN: usize = 8;

fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn subject_of(user: &User) -> TokenSubject {
    TokenSubject {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role_id,
        employee_id: user.employee_id,
    }
}

fn hash(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        AppError::Internal("Failed to hash password".to_string())
    })
}

/// Issues an access/refresh pair and records the refresh token id.
async fn issue_tokens(
    subject: &TokenSubject,
    store: &dyn CredentialStore,
    config: &Config,
) -> Result<TokenPair, AppError> {
    let sign_failed = |e: jsonwebtoken::errors::Error| {
        error!(error = %e, "Failed to sign token");
        AppError::Internal("Failed to issue token".to_string())
    };

    debug!("Generating access token");
    let access_token = generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(sign_failed)?;

    debug!("Generating refresh token");
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(sign_failed)?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");
    store
        .store_refresh_token(subject.user_id, &refresh_claims.jti, refresh_claims.exp)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Username or password missing")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(store, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    store: web::Data<dyn CredentialStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::unprocessable("Username or password required"));
    }

    let db_user = match store.find_user(&normalize(&user.username)).await? {
        Some(u) if u.is_active => u,
        Some(_) => {
            verify_dummy(&user.password);
            info!("Invalid credentials: user inactive");
            return Err(AppError::unauthorized("Invalid credentials"));
        }
        None => {
            verify_dummy(&user.password);
            info!("Invalid credentials: user not found");
            return Err(AppError::unauthorized("Invalid credentials"));
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    if db_user.role().is_none() {
        error!(user_id = db_user.id, role_id = db_user.role_id, "User has unknown role");
        return Err(AppError::unauthorized("Invalid role"));
    }

    let tokens = issue_tokens(&subject_of(&db_user), store.get_ref(), &config).await?;

    if let Err(e) = store.touch_last_login(db_user.id).await {
        // intentionally not failing login
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Rotates a refresh token: the presented one is revoked, a new pair issued.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token invalid or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(name = "auth_refresh", skip_all)]
pub async fn refresh_token(
    req: HttpRequest,
    store: web::Data<dyn CredentialStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req).ok_or_else(|| AppError::unauthorized("No token"))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::unauthorized("Refresh token required"));
    }

    let user_id = store
        .revoke_refresh_token(&claims.jti)
        .await?
        .ok_or_else(|| AppError::unauthorized("Refresh token revoked"))?;

    // Re-read the account so deactivation and role changes take effect.
    let user = store
        .find_user_by_id(user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::unauthorized("Account disabled"))?;

    let tokens = issue_tokens(&subject_of(&user), store.get_ref(), &config).await?;
    info!(user_id, "Refresh token rotated");

    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Refresh token revoked (idempotent)")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    store: web::Data<dyn CredentialStore>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Some(token) = bearer_token(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = store.revoke_refresh_token(&claims.jti).await {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    // success even if the token didn't exist
    HttpResponse::NoContent().finish()
}

/// Registers a user account. Admin only.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterUserReq,
    responses(
        (status = 201, description = "User registered"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Username already exists"),
        (status = 422, description = "Invalid input or unknown employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(auth, store, user), fields(username = %user.username))]
pub async fn register(
    auth: AuthUser,
    user: web::Json<RegisterUserReq>,
    store: web::Data<dyn CredentialStore>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let username = normalize(&user.username);
    if username.is_empty() {
        return Err(AppError::unprocessable("Username must not be empty"));
    }
    if user.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::unprocessable(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let hashed = hash(&user.password)?;
    let user_id = store
        .create_user(&username, &hashed, user.role, user.employee_id)
        .await?;

    info!(user_id, role = %user.role, "User registered");
    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user_id": user_id
    })))
}

/// Changes the password of the authenticated user.
#[utoipa::path(
    post,
    path = "/api/change-password",
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password changed"),
        (status = 422, description = "Old password incorrect or new password too short")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(name = "auth_change_password", skip(auth, body, store), fields(user_id = auth.user_id))]
pub async fn change_password(
    auth: AuthUser,
    body: web::Json<ChangePasswordReq>,
    store: web::Data<dyn CredentialStore>,
) -> Result<HttpResponse, AppError> {
    let user = store
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if verify_password(&body.old_password, &user.password_hash).is_err() {
        return Err(AppError::unprocessable("Old password is incorrect"));
    }
    if body.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::unprocessable(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let hashed = hash(&body.new_password)?;
    store.set_password(user.id, &hashed).await?;

    info!("Password changed");
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Password changed"
    })))
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Verified caller identity", body = AuthUser)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(auth)
}
