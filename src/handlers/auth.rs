use actix_web::http::header::Header;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use validator::Validate;

use crate::config::{AdminAccount, AppConfig};
use crate::models::auth::{
    Claims, LoginRequest, LoginResponseData, MemberResponse, User, UserResponse,
};
use crate::models::response::ApiResponse;
use crate::repository::Repository;
use crate::services::{Actor, BoardRegistry};
use crate::utils::errors::ServiceError;

/// Decodes the bearer token of the request.
pub fn current_claims(req: &HttpRequest, config: &AppConfig) -> Result<Claims, ServiceError> {
    let auth = Authorization::<Bearer>::parse(req).map_err(|_| {
        log::warn!("Request without valid bearer authentication");
        ServiceError::Unauthorized("Authentication required".to_string())
    })?;
    let bearer = auth.into_scheme();

    let claims = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        log::warn!("JWT validation error: {}", e);
        ServiceError::Unauthorized("Invalid token".to_string())
    })?;

    Ok(claims.claims)
}

/// The authenticated user as seen by board mutations.
pub fn current_actor(req: &HttpRequest, config: &AppConfig) -> Result<Actor, ServiceError> {
    let claims = current_claims(req, config)?;
    Ok(Actor::new(&claims.username, claims.admin))
}

pub fn issue_token(user: &User, config: &AppConfig) -> Result<String, ServiceError> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::hours(config.token_ttl_hours))
        .ok_or_else(|| ServiceError::InternalError("Token expiry overflow".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        name: user.name.clone(),
        admin: user.is_admin,
        exp,
        iat: now.timestamp() as usize,
    };

    encode(
        &JwtHeader::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| {
        log::error!("JWT encoding error: {}", e);
        ServiceError::AuthenticationError("Failed to generate token".to_string())
    })
}

/// Creates or refreshes the configured administrator account.
pub async fn ensure_admin_account(
    repository: &dyn Repository,
    admin: &AdminAccount,
) -> Result<User, ServiceError> {
    let password_hash = hash(&admin.password, DEFAULT_COST)?;
    let user = repository
        .upsert_user(&admin.username, &admin.name, &password_hash, true)
        .await?;
    log::info!("👤 Administrator account '{}' is ready", user.username);
    Ok(user)
}

/// User login endpoint
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponseData>),
        (status = 401, description = "Invalid credentials", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn login(
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    login_req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/login - Login attempt for: {}", login_req.username);

    login_req.validate()?;

    let user = registry
        .repository()
        .find_user_by_username(login_req.username.trim())
        .await?;

    let user = match user {
        Some(user) => user,
        None => {
            log::warn!("Login failed: User not found - {}", login_req.username);
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let password_valid = verify(&login_req.password, &user.password_hash).map_err(|e| {
        log::error!("Password verification error: {}", e);
        ServiceError::AuthenticationError("Password verification failed".to_string())
    })?;

    if !password_valid {
        log::warn!("Login failed: Invalid password for user - {}", login_req.username);
        return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = issue_token(&user, &config)?;
    let response_data = LoginResponseData {
        token,
        user: UserResponse::from(user),
    };

    log::info!("Login successful for user: {}", login_req.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Login successful", response_data)))
}

/// User logout endpoint
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Logout successful", body = ApiResponse<bool>),
        (status = 401, description = "Unauthorized", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn logout(req: HttpRequest, config: web::Data<AppConfig>) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/logout");

    let claims = current_claims(&req, &config)?;

    // Tokens are stateless; the client drops its copy.
    log::info!("User logout successful: {}", claims.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully logout from the system", true)))
}

/// Get current user information
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "User information retrieved", body = ApiResponse<UserResponse>),
        (status = 401, description = "Unauthorized", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn get_me(
    req: HttpRequest,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/auth/me");

    let claims = current_claims(&req, &config)?;
    let user_id: i32 = claims
        .sub
        .parse()
        .map_err(|_| ServiceError::Unauthorized("Invalid user ID in token".to_string()))?;

    let user = registry
        .repository()
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| {
            log::warn!("User not found for ID: {}", user_id);
            ServiceError::Unauthorized("User not found".to_string())
        })?;

    log::info!("User information retrieved for: {}", user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Successfully retrieved user data",
        UserResponse::from(user),
    )))
}

/// All users that can be assigned to cards and boards
#[utoipa::path(
    get,
    path = "/api/members",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Members retrieved", body = ApiResponse<Vec<MemberResponse>>),
        (status = 401, description = "Unauthorized", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn get_members(
    req: HttpRequest,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/members");
    current_claims(&req, &config)?;

    let members: Vec<MemberResponse> = registry
        .repository()
        .list_users()
        .await?
        .into_iter()
        .map(MemberResponse::from)
        .collect();

    log::info!("Retrieved {} members", members.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success("Members retrieved successfully", members)))
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(get_me)),
    )
    .route("/members", web::get().to(get_members));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn user() -> User {
        User {
            id: 7,
            username: "ana".to_string(),
            password_hash: String::new(),
            name: "Ana".to_string(),
            is_admin: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issued_token_decodes_to_actor() {
        let config = AppConfig::for_tests("uploads");
        let token = issue_token(&user(), &config).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();

        let claims = current_claims(&req, &config).unwrap();
        assert_eq!(claims.sub, "7");
        let actor = current_actor(&req, &config).unwrap();
        assert_eq!(actor.username, "ana");
        assert!(actor.is_admin);
    }

    #[test]
    fn test_missing_or_foreign_token_is_rejected() {
        let config = AppConfig::for_tests("uploads");
        let req = TestRequest::default().to_http_request();
        assert!(matches!(current_claims(&req, &config), Err(ServiceError::Unauthorized(_))));

        let mut other = AppConfig::for_tests("uploads");
        other.jwt_secret = "another-secret".to_string();
        let token = issue_token(&user(), &other).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();
        assert!(matches!(current_claims(&req, &config), Err(ServiceError::Unauthorized(_))));
    }
}
