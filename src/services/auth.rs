//! Authentication and user account service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{RegisterUser, User, UserClaims, UserRole},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by username/password and return a JWT token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| {
                AppError::Authentication("Invalid username or password".to_string())
            })?;

        if !self.verify_password(&user.password_hash, password) {
            return Err(AppError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    /// Self-registration. Always creates a student account: staff and admin
    /// roles are provisioned out of band, never chosen by the caller.
    pub async fn register(&self, data: &RegisterUser) -> AppResult<User> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let password_hash = self.hash_password(&data.password)?;
        self.repository
            .users
            .create(
                &data.username,
                &password_hash,
                &data.full_name,
                &data.email,
                UserRole::Student,
            )
            .await
    }

    /// Get the profile behind a set of claims
    pub async fn current_user(&self, claims: &UserClaims) -> AppResult<User> {
        self.repository.users.get_by_id(claims.user_id).await
    }

    /// Create the bootstrap admin account on first startup
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<()> {
        if self.repository.users.exists_with_role(UserRole::Admin).await? {
            return Ok(());
        }

        let password_hash = self.hash_password(&self.config.admin_password)?;
        self.repository
            .users
            .create(
                &self.config.admin_username,
                &password_hash,
                "Administrator",
                &format!("{}@localhost", self.config.admin_username),
                UserRole::Admin,
            )
            .await?;

        tracing::info!(
            "Created bootstrap admin account '{}'",
            self.config.admin_username
        );
        Ok(())
    }

    fn create_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    fn verify_password(&self, hash: &str, password: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}
