//! Data models for EquiLend

pub mod equipment;
pub mod request;
pub mod user;

// Re-export commonly used types
pub use equipment::{Equipment, EquipmentShort};
pub use request::{BorrowRequest, BorrowRequestDetails, RequestStatus};
pub use user::{User, UserClaims, UserRole, UserShort};
