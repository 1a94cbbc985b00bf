//! User model, roles and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// User roles, closed enumeration.
///
/// Students may create and view their own borrow requests; staff and admins
/// additionally decide requests (approve/reject/return) and see everything;
/// only admins manage the equipment catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Staff,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Staff => "staff",
            UserRole::Admin => "admin",
        }
    }

    /// Staff and admin accounts may decide requests and see all of them
    pub fn is_elevated(&self) -> bool {
        matches!(self, UserRole::Staff | UserRole::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(UserRole::Student),
            "staff" => Ok(UserRole::Staff),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

// SQLx conversions: roles are stored as lowercase TEXT
impl sqlx::Type<Postgres> for UserRole {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for UserRole {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for UserRole {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Short user representation embedded in request listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub username: String,
    pub full_name: String,
}

/// Self-registration request. Always creates a student account; staff and
/// admin accounts are provisioned by an administrator.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    // Authorization checks

    /// Require staff or admin privileges (deciding borrow requests)
    pub fn require_elevated(&self) -> Result<(), AppError> {
        if self.role.is_elevated() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "Staff privileges required".to_string(),
            ))
        }
    }

    /// Require admin privileges (catalog management)
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == UserRole::Admin {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "Administrator privileges required".to_string(),
            ))
        }
    }

    /// Whether this caller may view requests belonging to `owner_id`
    pub fn can_view_requests_of(&self, owner_id: i32) -> bool {
        self.role.is_elevated() || self.user_id == owner_id
    }

    /// Require visibility over requests belonging to `owner_id`
    pub fn require_view_requests_of(&self, owner_id: i32) -> Result<(), AppError> {
        if self.can_view_requests_of(owner_id) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "You do not have permission to view this request".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_id: i32, role: UserRole) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "test".to_string(),
            user_id,
            role,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in [UserRole::Student, UserRole::Staff, UserRole::Admin] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("librarian".parse::<UserRole>().is_err());
    }

    #[test]
    fn only_staff_and_admin_are_elevated() {
        assert!(!UserRole::Student.is_elevated());
        assert!(UserRole::Staff.is_elevated());
        assert!(UserRole::Admin.is_elevated());
    }

    #[test]
    fn students_only_see_their_own_requests() {
        let student = claims(1, UserRole::Student);
        assert!(student.require_view_requests_of(1).is_ok());
        assert!(matches!(
            student.require_view_requests_of(2),
            Err(AppError::PermissionDenied(_))
        ));
        assert!(student.require_elevated().is_err());
        assert!(student.require_admin().is_err());
    }

    #[test]
    fn staff_see_everything_but_cannot_manage_catalog() {
        let staff = claims(7, UserRole::Staff);
        assert!(staff.require_view_requests_of(1).is_ok());
        assert!(staff.require_elevated().is_ok());
        assert!(staff.require_admin().is_err());
        assert!(claims(8, UserRole::Admin).require_admin().is_ok());
    }

    #[test]
    fn token_round_trip() {
        let original = claims(42, UserRole::Staff);
        let token = original.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 42);
        assert_eq!(parsed.role, UserRole::Staff);
        assert!(UserClaims::from_token(&token, "wrong-secret").is_err());
    }
}
