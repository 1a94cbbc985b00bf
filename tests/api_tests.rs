//! API integration tests
//!
//! These run against a live server + database:
//!     cargo run &
//!     cargo test -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Log in and return a bearer token
async fn login(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    assert!(response.status().is_success(), "login failed for {}", username);
    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Admin token (bootstrap account)
async fn admin_token(client: &Client) -> String {
    login(client, "admin", "admin").await
}

/// Register a fresh student and return (token, user_id)
async fn new_student(client: &Client, tag: &str) -> (String, i64) {
    let username = format!("student_{}_{}", tag, unique_suffix());
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "password": "testpass",
            "full_name": "Test Student",
            "email": format!("{}@example.org", username),
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse register response");
    let user_id = body["id"].as_i64().expect("No user ID");

    (login(client, &username, "testpass").await, user_id)
}

/// Create equipment as admin, return its id
async fn create_equipment(client: &Client, token: &str, quantity: i64) -> i64 {
    let response = client
        .post(format!("{}/equipment", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "name": format!("Test Projector {}", unique_suffix()),
            "category": "AV",
            "condition": "good",
            "quantity": quantity,
        }))
        .send()
        .await
        .expect("Failed to create equipment");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse equipment");
    body["id"].as_i64().expect("No equipment ID")
}

async fn get_available(client: &Client, token: &str, equipment_id: i64) -> i64 {
    let response = client
        .get(format!("{}/equipment/{}", BASE_URL, equipment_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to get equipment");
    let body: Value = response.json().await.expect("Failed to parse equipment");
    body["available_quantity"].as_i64().expect("No availability")
}

/// Create a request as the given user, return its id
async fn create_request(
    client: &Client,
    token: &str,
    equipment_id: i64,
    quantity: i64,
) -> i64 {
    let response = client
        .post(format!("{}/requests", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "equipment_id": equipment_id,
            "quantity": quantity,
            "due_date": "2099-01-01",
        }))
        .send()
        .await
        .expect("Failed to create request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse request");
    body["id"].as_i64().expect("No request ID")
}

fn unique_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_unauthenticated_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/equipment", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_borrow_round_trip_restores_availability() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (student, _) = new_student(&client, "roundtrip").await;

    let equipment_id = create_equipment(&client, &admin, 10).await;
    let request_id = create_request(&client, &student, equipment_id, 2).await;

    // Creation makes no claim on inventory
    assert_eq!(get_available(&client, &admin, equipment_id).await, 10);

    // Approve commits inventory
    let response = client
        .put(format!("{}/requests/{}/approve", BASE_URL, request_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to approve");
    assert!(response.status().is_success());
    assert_eq!(get_available(&client, &admin, equipment_id).await, 8);

    // Return releases inventory
    let response = client
        .put(format!("{}/requests/{}/return", BASE_URL, request_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to return");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse");
    assert_eq!(body["status"], "RETURNED");
    assert_eq!(get_available(&client, &admin, equipment_id).await, 10);
}

#[tokio::test]
#[ignore]
async fn test_create_rejected_when_not_enough_available() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (student, _) = new_student(&client, "insufficient").await;

    let equipment_id = create_equipment(&client, &admin, 5).await;

    let response = client
        .post(format!("{}/requests", BASE_URL))
        .bearer_auth(&student)
        .json(&json!({
            "equipment_id": equipment_id,
            "quantity": 6,
            "due_date": "2099-01-01",
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.expect("Failed to parse");
    assert_eq!(body["available"], 5);

    // No request row was created
    let response = client
        .get(format!("{}/requests", BASE_URL))
        .bearer_auth(&student)
        .send()
        .await
        .expect("Failed to list requests");
    let body: Value = response.json().await.expect("Failed to parse");
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
#[ignore]
async fn test_concurrent_approvals_never_overdraw() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (student, _) = new_student(&client, "race").await;

    // 5 available, two pending requests for 3 each
    let equipment_id = create_equipment(&client, &admin, 5).await;
    let first = create_request(&client, &student, equipment_id, 3).await;
    let second = create_request(&client, &student, equipment_id, 3).await;

    let approve = |id: i64| {
        let client = client.clone();
        let admin = admin.clone();
        async move {
            client
                .put(format!("{}/requests/{}/approve", BASE_URL, id))
                .bearer_auth(&admin)
                .send()
                .await
                .expect("Failed to send approve")
                .status()
        }
    };

    let (a, b) = tokio::join!(approve(first), approve(second));

    // Exactly one succeeds; the loser sees InsufficientAvailability
    let statuses = [a, b];
    assert_eq!(statuses.iter().filter(|s| s.is_success()).count(), 1);
    assert!(statuses.contains(&StatusCode::UNPROCESSABLE_ENTITY));
    assert_eq!(get_available(&client, &admin, equipment_id).await, 2);
}

#[tokio::test]
#[ignore]
async fn test_terminal_states_reject_repeated_transitions() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (student, _) = new_student(&client, "terminal").await;

    let equipment_id = create_equipment(&client, &admin, 4).await;
    let request_id = create_request(&client, &student, equipment_id, 1).await;

    // Approve, then approve again
    let first = client
        .put(format!("{}/requests/{}/approve", BASE_URL, request_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("approve");
    assert!(first.status().is_success());

    let again = client
        .put(format!("{}/requests/{}/approve", BASE_URL, request_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("approve again");
    assert_eq!(again.status(), StatusCode::CONFLICT);

    // Double approval must not double-apply the decrement
    assert_eq!(get_available(&client, &admin, equipment_id).await, 3);

    // Return, then return again
    let ret = client
        .put(format!("{}/requests/{}/return", BASE_URL, request_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("return");
    assert!(ret.status().is_success());

    let ret_again = client
        .put(format!("{}/requests/{}/return", BASE_URL, request_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("return again");
    assert_eq!(ret_again.status(), StatusCode::CONFLICT);
    assert_eq!(get_available(&client, &admin, equipment_id).await, 4);
}

#[tokio::test]
#[ignore]
async fn test_students_cannot_decide_requests() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (student, _) = new_student(&client, "norole").await;

    let equipment_id = create_equipment(&client, &admin, 2).await;
    let request_id = create_request(&client, &student, equipment_id, 1).await;

    let response = client
        .put(format!("{}/requests/{}/approve", BASE_URL, request_id))
        .bearer_auth(&student)
        .send()
        .await
        .expect("Failed to send approve");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_request_visibility_is_role_scoped() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (alice, _) = new_student(&client, "alice").await;
    let (bob, _) = new_student(&client, "bob").await;

    let equipment_id = create_equipment(&client, &admin, 3).await;
    let alice_request = create_request(&client, &alice, equipment_id, 1).await;

    // Bob cannot fetch Alice's request
    let response = client
        .get(format!("{}/requests/{}", BASE_URL, alice_request))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to get request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Bob's listing never contains Alice's request
    let response = client
        .get(format!("{}/requests", BASE_URL))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to list requests");
    let body: Value = response.json().await.expect("Failed to parse");
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert!(!ids.contains(&alice_request));

    // The admin listing does contain it
    let response = client
        .get(format!("{}/requests", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to list requests");
    let body: Value = response.json().await.expect("Failed to parse");
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&alice_request));
}

#[tokio::test]
#[ignore]
async fn test_overdue_is_computed_against_as_of_date() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (student, _) = new_student(&client, "overdue").await;

    let equipment_id = create_equipment(&client, &admin, 2).await;

    // Due far in the future so the request can be created today, then
    // queried with as_of dates on both sides of it
    let response = client
        .post(format!("{}/requests", BASE_URL))
        .bearer_auth(&student)
        .json(&json!({
            "equipment_id": equipment_id,
            "quantity": 1,
            "due_date": "2098-01-01",
        }))
        .send()
        .await
        .expect("Failed to create request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("parse");
    let request_id = body["id"].as_i64().unwrap();

    client
        .put(format!("{}/requests/{}/approve", BASE_URL, request_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("approve");

    let overdue_ids = |as_of: &'static str| {
        let client = client.clone();
        let admin = admin.clone();
        async move {
            let response = client
                .get(format!("{}/requests/overdue?as_of={}", BASE_URL, as_of))
                .bearer_auth(&admin)
                .send()
                .await
                .expect("Failed to list overdue");
            let body: Value = response.json().await.expect("parse");
            body.as_array()
                .unwrap()
                .iter()
                .map(|r| r["id"].as_i64().unwrap())
                .collect::<Vec<_>>()
        }
    };

    assert!(overdue_ids("2098-01-02").await.contains(&request_id));
    assert!(!overdue_ids("2097-12-31").await.contains(&request_id));
}

#[tokio::test]
#[ignore]
async fn test_only_admin_manages_catalog() {
    let client = Client::new();
    let (student, _) = new_student(&client, "catalog").await;

    let response = client
        .post(format!("{}/equipment", BASE_URL))
        .bearer_auth(&student)
        .json(&json!({
            "name": "Forbidden Item",
            "category": "AV",
            "quantity": 1,
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_total_quantity_edit_preserves_borrowed_units() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (student, _) = new_student(&client, "edit").await;

    // 10 total, approve 4 out
    let equipment_id = create_equipment(&client, &admin, 10).await;
    let request_id = create_request(&client, &student, equipment_id, 4).await;
    client
        .put(format!("{}/requests/{}/approve", BASE_URL, request_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("approve");
    assert_eq!(get_available(&client, &admin, equipment_id).await, 6);

    // Shrink the pool below the borrowed count: availability floors at 0
    let response = client
        .put(format!("{}/equipment/{}", BASE_URL, equipment_id))
        .bearer_auth(&admin)
        .json(&json!({ "quantity": 3 }))
        .send()
        .await
        .expect("update");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("parse");
    assert_eq!(body["total_quantity"], 3);
    assert_eq!(body["available_quantity"], 0);

    // Returning clamps availability to the new, smaller total
    let response = client
        .put(format!("{}/requests/{}/return", BASE_URL, request_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("return");
    assert!(response.status().is_success());
    assert_eq!(get_available(&client, &admin, equipment_id).await, 3);
}

#[tokio::test]
#[ignore]
async fn test_delete_blocked_while_requests_reference_equipment() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (student, _) = new_student(&client, "delete").await;

    let equipment_id = create_equipment(&client, &admin, 2).await;
    let request_id = create_request(&client, &student, equipment_id, 1).await;

    // A pending request blocks deletion
    let response = client
        .delete(format!("{}/equipment/{}", BASE_URL, equipment_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Run the request to completion: the terminal row is kept as an audit
    // trail and still blocks deletion
    for action in ["approve", "return"] {
        let response = client
            .put(format!("{}/requests/{}/{}", BASE_URL, request_id, action))
            .bearer_auth(&admin)
            .send()
            .await
            .expect(action);
        assert!(response.status().is_success());
    }
    let response = client
        .delete(format!("{}/equipment/{}", BASE_URL, equipment_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Equipment nothing ever referenced deletes cleanly
    let fresh_id = create_equipment(&client, &admin, 1).await;
    let response = client
        .delete(format!("{}/equipment/{}", BASE_URL, fresh_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
