//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, equipment, health, requests};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EquiLend API",
        version = "1.0.0",
        description = "School Equipment Lending REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Equipment
        equipment::list_equipment,
        equipment::search_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        // Requests
        requests::list_requests,
        requests::list_overdue,
        requests::get_request,
        requests::create_request,
        requests::approve_request,
        requests::reject_request,
        requests::return_request,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            crate::models::user::RegisterUser,
            crate::models::user::UserRole,
            crate::models::user::UserShort,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::EquipmentShort,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            // Requests
            crate::models::request::BorrowRequest,
            crate::models::request::BorrowRequestDetails,
            crate::models::request::CreateBorrowRequest,
            crate::models::request::RequestStatus,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "equipment", description = "Equipment catalog management"),
        (name = "requests", description = "Borrow request lifecycle")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
