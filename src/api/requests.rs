//! Borrow request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::request::{
        BorrowRequest, BorrowRequestDetails, CreateBorrowRequest, OverdueQuery, RequestQuery,
    },
};

use super::AuthenticatedUser;

/// List borrow requests visible to the caller
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(RequestQuery),
    responses(
        (status = 200, description = "Borrow requests, newest first", body = Vec<BorrowRequestDetails>)
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<Vec<BorrowRequestDetails>>> {
    let requests = state.services.requests.list(&claims, query.status).await?;
    Ok(Json(requests))
}

/// List overdue loans
#[utoipa::path(
    get,
    path = "/requests/overdue",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(OverdueQuery),
    responses(
        (status = 200, description = "Approved requests past their due date", body = Vec<BorrowRequestDetails>)
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<OverdueQuery>,
) -> AppResult<Json<Vec<BorrowRequestDetails>>> {
    let requests = state
        .services
        .requests
        .list_overdue(&claims, query.as_of, query.user_id)
        .await?;
    Ok(Json(requests))
}

/// Get a borrow request by ID
#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request details", body = BorrowRequestDetails),
        (status = 403, description = "Not the owner of this request"),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequestDetails>> {
    let request = state.services.requests.get(&claims, id).await?;
    Ok(Json(request))
}

/// Create a borrow request
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Request created in PENDING state", body = BorrowRequest),
        (status = 400, description = "Invalid quantity or due date"),
        (status = 404, description = "Equipment not found"),
        (status = 422, description = "Not enough equipment available")
    )
)]
pub async fn create_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRequest>)> {
    let request = state.services.requests.create(&claims, &data).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Approve a pending request (staff/admin only)
#[utoipa::path(
    put,
    path = "/requests/{id}/approve",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request approved, inventory committed", body = BorrowRequest),
        (status = 403, description = "Staff privileges required"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not pending"),
        (status = 422, description = "Not enough equipment available")
    )
)]
pub async fn approve_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_elevated()?;
    let request = state.services.requests.approve(claims.user_id, id).await?;
    Ok(Json(request))
}

/// Reject a pending request (staff/admin only)
#[utoipa::path(
    put,
    path = "/requests/{id}/reject",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request rejected", body = BorrowRequest),
        (status = 403, description = "Staff privileges required"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not pending")
    )
)]
pub async fn reject_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_elevated()?;
    let request = state.services.requests.reject(claims.user_id, id).await?;
    Ok(Json(request))
}

/// Return an approved request (staff/admin only)
#[utoipa::path(
    put,
    path = "/requests/{id}/return",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request returned, inventory released", body = BorrowRequest),
        (status = 403, description = "Staff privileges required"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not approved")
    )
)]
pub async fn return_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_elevated()?;
    let request = state.services.requests.return_request(id).await?;
    Ok(Json(request))
}
