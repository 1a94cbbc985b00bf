//! Reservation engine service
//!
//! Callers always pass their identity explicitly (the claims parameter);
//! there is no ambient current-user context. Role checks that gate whole
//! operations live in the API layer; the data-dependent scoping rules
//! (students see only their own requests) live here.

use chrono::{NaiveDate, Utc};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::request::{BorrowRequest, BorrowRequestDetails, CreateBorrowRequest, RequestStatus},
    models::user::UserClaims,
    repository::Repository,
};

#[derive(Clone)]
pub struct ReservationService {
    repository: Repository,
}

impl ReservationService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List requests visible to the caller, newest first. Students see only
    /// their own; staff and admins see all.
    pub async fn list(
        &self,
        claims: &UserClaims,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<BorrowRequestDetails>> {
        let scope = if claims.role.is_elevated() {
            None
        } else {
            Some(claims.user_id)
        };
        self.repository.requests.list(scope, status).await
    }

    /// Get a single request; students may only see their own
    pub async fn get(&self, claims: &UserClaims, id: i32) -> AppResult<BorrowRequestDetails> {
        let details = self.repository.requests.get_details(id).await?;
        claims.require_view_requests_of(details.requester.id)?;
        Ok(details)
    }

    /// List overdue loans as of the given date (default today), scoped to
    /// the caller unless they are staff/admin.
    pub async fn list_overdue(
        &self,
        claims: &UserClaims,
        as_of: Option<NaiveDate>,
        user_id: Option<i32>,
    ) -> AppResult<Vec<BorrowRequestDetails>> {
        let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
        let scope = if claims.role.is_elevated() {
            user_id
        } else {
            if let Some(requested) = user_id {
                claims.require_view_requests_of(requested)?;
            }
            Some(claims.user_id)
        };
        self.repository.requests.list_overdue(as_of, scope).await
    }

    /// Create a borrow request on behalf of the caller
    pub async fn create(
        &self,
        claims: &UserClaims,
        data: &CreateBorrowRequest,
    ) -> AppResult<BorrowRequest> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        self.repository.requests.create(claims.user_id, data).await
    }

    /// Approve a pending request, committing inventory
    pub async fn approve(&self, approver_id: i32, id: i32) -> AppResult<BorrowRequest> {
        self.repository.requests.approve(id, approver_id).await
    }

    /// Reject a pending request
    pub async fn reject(&self, approver_id: i32, id: i32) -> AppResult<BorrowRequest> {
        self.repository.requests.reject(id, approver_id).await
    }

    /// Return an approved request, releasing inventory
    pub async fn return_request(&self, id: i32) -> AppResult<BorrowRequest> {
        self.repository.requests.return_request(id).await
    }
}
