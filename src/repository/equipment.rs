//! Equipment catalog repository
//!
//! Quantity edits run in the same lock discipline as the reservation
//! engine (transaction + `FOR UPDATE` on the equipment row) because both
//! sides write `available_quantity`.

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
};

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List equipment, optionally filtered by category and availability
    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::boolean IS NULL OR ($2 = (available_quantity > 0)))
            ORDER BY name
            "#,
        )
        .bind(&query.category)
        .bind(query.available)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Keyword search over name, category and description
    pub async fn search(&self, keyword: &str) -> AppResult<Vec<Equipment>> {
        let pattern = format!("%{}%", keyword);
        let rows = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE name ILIKE $1 OR category ILIKE $1 OR description ILIKE $1
            ORDER BY name
            "#,
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment with id {} not found", id)))
    }

    /// Create equipment; all units start out available
    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment
                (name, category, description, condition, image_url, total_quantity, available_quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.category)
        .bind(&data.description)
        .bind(&data.condition)
        .bind(&data.image_url)
        .bind(data.quantity)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update equipment metadata and, when the total count changes, adjust
    /// availability while preserving the units out on approved loans.
    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;

        let current =
            sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Equipment with id {} not found", id)))?;

        let (total, available) = match data.quantity {
            Some(new_total) => current.quantities_after_total_change(new_total),
            None => (current.total_quantity, current.available_quantity),
        };

        let updated = sqlx::query_as::<_, Equipment>(
            r#"
            UPDATE equipment
            SET name = $1, category = $2, description = $3, condition = $4,
                image_url = $5, total_quantity = $6, available_quantity = $7,
                updated_at = now()
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(data.name.as_deref().unwrap_or(&current.name))
        .bind(data.category.as_deref().unwrap_or(&current.category))
        .bind(data.description.as_deref().or(current.description.as_deref()))
        .bind(data.condition.as_deref().or(current.condition.as_deref()))
        .bind(data.image_url.as_deref().or(current.image_url.as_deref()))
        .bind(total)
        .bind(available)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete equipment. Rejected while any pending or approved request
    /// still references the item.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // The row lock blocks concurrent request inserts (their FK check
        // takes a key-share lock), so the count below cannot go stale.
        let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM equipment WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!(
                "Equipment with id {} not found",
                id
            )));
        }

        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM borrow_requests
            WHERE equipment_id = $1 AND status IN ('PENDING', 'APPROVED')
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if active > 0 {
            return Err(AppError::Conflict(format!(
                "Equipment is referenced by {} active borrow request(s)",
                active
            )));
        }

        match sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
        {
            Ok(_) => {}
            // Terminal requests are kept as an audit trail and still
            // reference the row
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                return Err(AppError::Conflict(
                    "Equipment has historical borrow requests and cannot be deleted".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(())
    }
}
