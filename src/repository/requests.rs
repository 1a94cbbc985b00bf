//! Borrow requests repository: the reservation engine's atomic core
//!
//! Every mutating operation runs in a single transaction. Approve and
//! return lock the request row first and the equipment row second (a fixed
//! order, so concurrent decisions on the same equipment cannot deadlock);
//! the equipment row lock is what linearizes racing approvals. The loser
//! of a race re-reads the decremented availability under the lock and
//! fails with InsufficientAvailability instead of overdrawing the pool.

use chrono::{NaiveDate, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::Equipment,
        request::{
            BorrowRequest, BorrowRequestDetails, BorrowRequestDetailsRow, CreateBorrowRequest,
            RequestStatus,
        },
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.equipment_id, r.quantity, r.requested_at,
           r.due_date, r.notes, r.status, r.decided_by, r.decided_at, r.returned_at,
           e.name AS equipment_name, e.category AS equipment_category,
           u.username AS requester_username, u.full_name AS requester_full_name
    FROM borrow_requests r
    JOIN equipment e ON e.id = r.equipment_id
    JOIN users u ON u.id = r.user_id
"#;

#[derive(Clone)]
pub struct RequestsRepository {
    pool: Pool<Postgres>,
}

impl RequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get request by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request with id {} not found", id)))
    }

    /// Get request with embedded equipment and requester details
    pub async fn get_details(&self, id: i32) -> AppResult<BorrowRequestDetails> {
        let sql = format!("{} WHERE r.id = $1", DETAILS_SELECT);
        let row = sqlx::query_as::<_, BorrowRequestDetailsRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request with id {} not found", id)))?;
        Ok(row.into_details(Utc::now().date_naive()))
    }

    /// List requests, newest first, optionally scoped to one requester
    /// and/or one lifecycle state
    pub async fn list(
        &self,
        user_id: Option<i32>,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<BorrowRequestDetails>> {
        let sql = format!(
            r#"{}
            WHERE ($1::integer IS NULL OR r.user_id = $1)
              AND ($2::text IS NULL OR r.status = $2)
            ORDER BY r.requested_at DESC
            "#,
            DETAILS_SELECT
        );
        let rows = sqlx::query_as::<_, BorrowRequestDetailsRow>(&sql)
            .bind(user_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        let today = Utc::now().date_naive();
        Ok(rows.into_iter().map(|r| r.into_details(today)).collect())
    }

    /// List approved requests whose due date has passed as of `as_of`.
    /// Pure read; overdue-ness is recomputed on every call and no status
    /// is ever mutated.
    pub async fn list_overdue(
        &self,
        as_of: NaiveDate,
        user_id: Option<i32>,
    ) -> AppResult<Vec<BorrowRequestDetails>> {
        let sql = format!(
            r#"{}
            WHERE r.status = 'APPROVED'
              AND r.due_date < $1
              AND ($2::integer IS NULL OR r.user_id = $2)
            ORDER BY r.due_date
            "#,
            DETAILS_SELECT
        );
        let rows = sqlx::query_as::<_, BorrowRequestDetailsRow>(&sql)
            .bind(as_of)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.into_details(as_of)).collect())
    }

    /// Create a new borrow request in PENDING state.
    ///
    /// Availability is checked but not decremented: a pending request makes
    /// no durable claim on inventory. Stock is committed at approval time
    /// only, where the check is repeated under the row lock.
    pub async fn create(
        &self,
        requester_id: i32,
        data: &CreateBorrowRequest,
    ) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let equipment = Self::lock_equipment(&mut tx, data.equipment_id).await?;
        data.ensure_valid(Utc::now().date_naive())?;
        equipment.ensure_available(data.quantity)?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            INSERT INTO borrow_requests (user_id, equipment_id, quantity, due_date, notes, status)
            VALUES ($1, $2, $3, $4, $5, 'PENDING')
            RETURNING *
            "#,
        )
        .bind(requester_id)
        .bind(data.equipment_id)
        .bind(data.quantity)
        .bind(data.due_date)
        .bind(&data.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    /// Approve a pending request, committing inventory.
    ///
    /// The availability check is re-validated here under the equipment row
    /// lock because stock may have changed since the request was created.
    /// Status change and counter decrement commit or roll back together.
    pub async fn approve(&self, id: i32, approver_id: i32) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = Self::lock_request(&mut tx, id).await?;
        request.ensure_can_approve()?;

        let equipment = Self::lock_equipment(&mut tx, request.equipment_id).await?;
        equipment.ensure_available(request.quantity)?;

        sqlx::query(
            "UPDATE equipment SET available_quantity = available_quantity - $1, updated_at = now() WHERE id = $2",
        )
        .bind(request.quantity)
        .bind(equipment.id)
        .execute(&mut *tx)
        .await?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = 'APPROVED', decided_by = $1, decided_at = now()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(approver_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    /// Reject a pending request. No inventory effect: none was committed.
    pub async fn reject(&self, id: i32, approver_id: i32) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = Self::lock_request(&mut tx, id).await?;
        request.ensure_can_reject()?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = 'REJECTED', decided_by = $1, decided_at = now()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(approver_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    /// Return an approved request, releasing inventory.
    ///
    /// The counter is clamped to total_quantity on the way back up:
    /// out-of-band catalog edits may have lowered the total while units
    /// were out on loan.
    pub async fn return_request(&self, id: i32) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = Self::lock_request(&mut tx, id).await?;
        request.ensure_can_return()?;

        Self::lock_equipment(&mut tx, request.equipment_id).await?;

        sqlx::query(
            r#"
            UPDATE equipment
            SET available_quantity = LEAST(total_quantity, available_quantity + $1),
                updated_at = now()
            WHERE id = $2
            "#,
        )
        .bind(request.quantity)
        .bind(request.equipment_id)
        .execute(&mut *tx)
        .await?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = 'RETURNED', returned_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    async fn lock_request(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Request with id {} not found", id)))
    }

    async fn lock_equipment(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment with id {} not found", id)))
    }
}
