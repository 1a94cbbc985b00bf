//! Borrow request model and lifecycle state machine
//!
//! The lifecycle is `PENDING -> APPROVED -> RETURNED` with a single side
//! branch `PENDING -> REJECTED`. REJECTED and RETURNED are terminal. The
//! transition guards live here as pure functions; the repository applies
//! them inside the transaction that holds the row locks.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::equipment::EquipmentShort;
use super::user::UserShort;
use crate::error::{AppError, AppResult};

/// Borrow request lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Returned => "RETURNED",
        }
    }

    /// Terminal states never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Returned)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            "RETURNED" => Ok(RequestStatus::Returned),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

// SQLx conversions: statuses are stored as uppercase TEXT
impl sqlx::Type<Postgres> for RequestStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for RequestStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for RequestStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Borrow request record. Rows are never deleted; terminal requests remain
/// as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub id: i32,
    pub user_id: i32,
    pub equipment_id: i32,
    pub quantity: i32,
    /// Stamped at creation, immutable thereafter
    pub requested_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub status: RequestStatus,
    /// Staff/admin who approved or rejected the request
    pub decided_by: Option<i32>,
    pub decided_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl BorrowRequest {
    /// Guard for the PENDING -> APPROVED transition
    pub fn ensure_can_approve(&self) -> AppResult<()> {
        if self.status != RequestStatus::Pending {
            return Err(AppError::InvalidTransition(
                "Only pending requests can be approved".to_string(),
            ));
        }
        Ok(())
    }

    /// Guard for the PENDING -> REJECTED transition
    pub fn ensure_can_reject(&self) -> AppResult<()> {
        if self.status != RequestStatus::Pending {
            return Err(AppError::InvalidTransition(
                "Only pending requests can be rejected".to_string(),
            ));
        }
        Ok(())
    }

    /// Guard for the APPROVED -> RETURNED transition
    pub fn ensure_can_return(&self) -> AppResult<()> {
        if self.status != RequestStatus::Approved {
            return Err(AppError::InvalidTransition(
                "Only approved requests can be returned".to_string(),
            ));
        }
        Ok(())
    }

    /// Overdue is a computed predicate, never a stored state: an approved
    /// request whose due date has passed as of the query date.
    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        self.status == RequestStatus::Approved && self.due_date < as_of
    }
}

/// Create borrow request payload
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowRequest {
    pub equipment_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

impl CreateBorrowRequest {
    /// Structural checks, rejected before any state mutation. Stock-level
    /// checks are not done here: `Equipment::ensure_available` covers them
    /// (including quantities beyond the total, since the available count
    /// never exceeds it) and reports its own error kind.
    pub fn ensure_valid(&self, today: NaiveDate) -> AppResult<()> {
        if self.quantity < 1 {
            return Err(AppError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        if self.due_date < today {
            return Err(AppError::Validation(
                "Due date must not be in the past".to_string(),
            ));
        }
        Ok(())
    }
}

/// Borrow request with embedded equipment and requester details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowRequestDetails {
    pub id: i32,
    pub quantity: i32,
    pub requested_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub decided_by: Option<i32>,
    pub decided_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub equipment: EquipmentShort,
    pub requester: UserShort,
    pub is_overdue: bool,
}

/// Internal row structure for detail queries (request columns plus joined
/// equipment/requester fields)
#[derive(Debug, Clone, FromRow)]
pub struct BorrowRequestDetailsRow {
    pub id: i32,
    pub user_id: i32,
    pub equipment_id: i32,
    pub quantity: i32,
    pub requested_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub decided_by: Option<i32>,
    pub decided_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub equipment_name: String,
    pub equipment_category: String,
    pub requester_username: String,
    pub requester_full_name: String,
}

impl BorrowRequestDetailsRow {
    pub fn into_details(self, as_of: NaiveDate) -> BorrowRequestDetails {
        let is_overdue = self.status == RequestStatus::Approved && self.due_date < as_of;
        BorrowRequestDetails {
            id: self.id,
            quantity: self.quantity,
            requested_at: self.requested_at,
            due_date: self.due_date,
            notes: self.notes,
            status: self.status,
            decided_by: self.decided_by,
            decided_at: self.decided_at,
            returned_at: self.returned_at,
            equipment: EquipmentShort {
                id: self.equipment_id,
                name: self.equipment_name,
                category: self.equipment_category,
            },
            requester: UserShort {
                id: self.user_id,
                username: self.requester_username,
                full_name: self.requester_full_name,
            },
            is_overdue,
        }
    }
}

/// Request list filters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RequestQuery {
    /// Restrict to one lifecycle state
    pub status: Option<RequestStatus>,
}

/// Overdue listing parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct OverdueQuery {
    /// Reference date, defaults to today
    pub as_of: Option<NaiveDate>,
    /// Restrict to one requester (staff/admin only)
    pub user_id: Option<i32>,
}
