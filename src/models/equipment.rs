//! Equipment model
//!
//! Invariant maintained by the reservation engine: for every equipment row,
//! `0 <= available_quantity <= total_quantity`, and the difference between
//! the two equals the summed quantity of its APPROVED borrow requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    /// Physical condition (free text, e.g. "good", "worn")
    pub condition: Option<String>,
    pub image_url: Option<String>,
    /// Total units owned
    pub total_quantity: i32,
    /// Units not committed to an approved, unreturned request
    pub available_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    /// Check that `quantity` units are currently available
    pub fn ensure_available(&self, quantity: i32) -> AppResult<()> {
        if self.available_quantity < quantity {
            return Err(AppError::InsufficientAvailability {
                available: self.available_quantity,
            });
        }
        Ok(())
    }

    /// New (total, available) pair after a catalog edit of the total count.
    ///
    /// Units out on approved loans are preserved; the available counter
    /// absorbs the change and is floored at zero when the new total is
    /// smaller than what is currently borrowed.
    pub fn quantities_after_total_change(&self, new_total: i32) -> (i32, i32) {
        let borrowed = self.total_quantity - self.available_quantity;
        (new_total, (new_total - borrowed).max(0))
    }
}

/// Short equipment representation embedded in request listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EquipmentShort {
    pub id: i32,
    pub name: String,
    pub category: String,
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, message = "Equipment name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub image_url: Option<String>,
    /// Total units owned; all of them start out available
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
}

/// Update equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub image_url: Option<String>,
    /// New total unit count; availability is adjusted, never below zero
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: Option<i32>,
}

/// Equipment list filters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentQuery {
    /// Exact category match
    pub category: Option<String>,
    /// If true, only equipment with at least one available unit
    pub available: Option<bool>,
}

/// Equipment keyword search
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentSearchQuery {
    pub keyword: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equipment(total: i32, available: i32) -> Equipment {
        Equipment {
            id: 1,
            name: "Projector".to_string(),
            category: "AV".to_string(),
            description: None,
            condition: None,
            image_url: None,
            total_quantity: total,
            available_quantity: available,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn ensure_available_reports_current_count() {
        let eq = equipment(10, 5);
        assert!(eq.ensure_available(5).is_ok());
        match eq.ensure_available(6) {
            Err(AppError::InsufficientAvailability { available }) => assert_eq!(available, 5),
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn total_change_preserves_borrowed_units() {
        // 3 units out on loan
        let eq = equipment(10, 7);
        assert_eq!(eq.quantities_after_total_change(12), (12, 9));
        assert_eq!(eq.quantities_after_total_change(10), (10, 7));
        assert_eq!(eq.quantities_after_total_change(3), (3, 0));
        // Fewer units than are currently borrowed: availability floors at 0
        assert_eq!(eq.quantities_after_total_change(2), (2, 0));
        assert_eq!(eq.quantities_after_total_change(0), (0, 0));
    }

    #[test]
    fn total_change_keeps_availability_within_bounds() {
        let eq = equipment(5, 2);
        for new_total in 0..20 {
            let (total, available) = eq.quantities_after_total_change(new_total);
            assert!(available >= 0);
            assert!(available <= total);
        }
    }
}
