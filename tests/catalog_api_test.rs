mod common;

use axum::http::{Method, StatusCode};
use rstest::rstest;
use serde_json::json;

use common::{stock, TestApp, CASHIER_ID, FIVE_PIECE_MEAL};

#[tokio::test]
async fn status_and_health_report_ok() {
    let app = TestApp::new().await;

    let status = app.get("/status").await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.data()["service"], "feathers-pos");
    assert_eq!(status.data()["stock_policy"], "Reject");

    let health = app.get("/api/v1/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.data()["checks"]["database"], "healthy");
}

#[tokio::test]
async fn menu_is_readable_without_a_session() {
    let app = TestApp::new().await;

    let menu = app.get("/api/v1/menu").await;
    assert_eq!(menu.status, StatusCode::OK);
    assert_eq!(menu.data().as_array().map(Vec::len), Some(12));

    let drinks = app.get("/api/v1/menu?category=Drink").await;
    let names: Vec<&str> = drinks
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Fountain Soda", "Lemonade"]);
    assert_eq!(drinks.data()[0]["is_combo"], false);

    let sides = app.get("/api/v1/menu?category=Sides%2FExtras").await;
    assert_eq!(sides.data().as_array().map(Vec::len), Some(2));

    let unknown = app.get("/api/v1/menu?category=Dessert").await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let item = app.get(&format!("/api/v1/menu/{}", FIVE_PIECE_MEAL)).await;
    assert_eq!(item.data()["price"], "9.99");
    assert_eq!(item.data()["category"], "Chicken");
    assert_eq!(item.data()["is_combo"], true);

    let recipe = app
        .get(&format!("/api/v1/menu/{}/recipe", FIVE_PIECE_MEAL))
        .await;
    assert_eq!(
        recipe.data(),
        &json!([
            { "inventory_item_id": 1, "inventory_name": "Chicken Tenders", "quantity_needed": 5 },
            { "inventory_item_id": 3, "inventory_name": "Fries Portion", "quantity_needed": 1 },
            { "inventory_item_id": 8, "inventory_name": "Sauce Cup", "quantity_needed": 2 }
        ])
    );

    assert_eq!(app.get("/api/v1/menu/999").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn managers_create_menu_items_with_recipes() {
    let app = TestApp::new().await;
    let body = json!({
        "name": "Popcorn Shrimp",
        "price": "7.25",
        "category": "Special",
        "is_vegetarian": false,
        "description": "Limited run",
        "recipe": [
            { "inventory_name": "Fries Portion", "quantity": 1 },
            { "inventory_name": "Sauce Cup", "quantity": 1 }
        ]
    });

    let cashier = app
        .send(
            Method::POST,
            "/api/v1/menu",
            Some(body.clone()),
            Some(app.cashier_token()),
            &[],
        )
        .await;
    assert_eq!(cashier.status, StatusCode::FORBIDDEN);

    let created = app
        .send_as_manager(Method::POST, "/api/v1/menu", Some(body.clone()))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.data()["name"], "Popcorn Shrimp");
    assert_eq!(created.data()["price"], "7.25");
    assert_eq!(created.data()["recipe"].as_array().map(Vec::len), Some(2));

    let duplicate = app
        .send_as_manager(Method::POST, "/api/v1/menu", Some(body))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let id = created.data()["id"].as_i64().unwrap();
    let order = app
        .post(
            "/api/v1/orders",
            json!({
                "customer": { "name": "Avery", "phone_number": "555-100-0001" },
                "employee_id": CASHIER_ID,
                "order_type": "dine_in",
                "lines": [ { "menu_item_id": id, "quantity": 2 } ]
            }),
        )
        .await;
    assert_eq!(order.status, StatusCode::CREATED, "{}", order.body);
    assert_eq!(order.data()["order"]["total_amount"], "14.50");
    assert_eq!(app.stock_of(stock::SAUCE_CUP).await, 598);
}

#[rstest]
#[case::unknown_ingredient(json!({
    "name": "Mystery Box", "price": "5.00", "category": "Special",
    "recipe": [ { "inventory_name": "Unobtainium", "quantity": 1 } ]
}), "Unobtainium")]
#[case::negative_price(json!({
    "name": "Refund", "price": "-1.00", "category": "Special", "recipe": []
}), "price")]
#[case::fractional_cents(json!({
    "name": "Odd Price", "price": "1.005", "category": "Special", "recipe": []
}), "price")]
#[case::blank_name(json!({
    "name": "", "price": "1.00", "category": "Drink", "recipe": []
}), "name")]
#[tokio::test]
async fn invalid_menu_items_are_rejected(#[case] body: serde_json::Value, #[case] mentions: &str) {
    let app = TestApp::new().await;
    let response = app
        .send_as_manager(Method::POST, "/api/v1/menu", Some(body))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
    assert!(
        response.message().contains(mentions),
        "{} should mention {}",
        response.message(),
        mentions
    );
}

#[tokio::test]
async fn sold_menu_items_cannot_be_deleted() {
    let app = TestApp::new().await;
    app.post(
        "/api/v1/orders",
        json!({
            "customer": { "name": "Avery", "phone_number": "555-100-0001" },
            "employee_id": CASHIER_ID,
            "order_type": "dine_in",
            "lines": [ { "menu_item_id": FIVE_PIECE_MEAL, "quantity": 1 } ]
        }),
    )
    .await;

    let sold = app
        .send_as_manager(
            Method::DELETE,
            &format!("/api/v1/menu/{}", FIVE_PIECE_MEAL),
            None,
        )
        .await;
    assert_eq!(sold.status, StatusCode::CONFLICT);

    let unsold = app
        .send_as_manager(Method::DELETE, "/api/v1/menu/10", None)
        .await;
    assert_eq!(unsold.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get("/api/v1/menu/10").await.status, StatusCode::NOT_FOUND);

    let renamed = app
        .send_as_manager(
            Method::PATCH,
            "/api/v1/menu/11",
            Some(json!({ "name": "Soda", "price": "2.09" })),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::OK, "{}", renamed.body);
    assert_eq!(renamed.data()["name"], "Soda");
    assert_eq!(renamed.data()["price"], "2.09");
}

#[tokio::test]
async fn inventory_can_be_checked_and_adjusted() {
    let app = TestApp::new().await;

    let listed = app.get("/api/v1/inventory").await;
    assert_eq!(listed.data().as_array().map(Vec::len), Some(11));

    let exists = app.get("/api/v1/inventory/exists?name=Bun").await;
    assert_eq!(exists.data(), &json!({ "name": "Bun", "exists": true }));
    let missing = app.get("/api/v1/inventory/exists?name=Caviar").await;
    assert_eq!(missing.data()["exists"], false);

    let uri = format!("/api/v1/inventory/{}/adjust", stock::FISH_FILLET);
    let delivery = app
        .send_as_manager(
            Method::POST,
            &uri,
            Some(json!({ "delta": 50, "reason": "delivery" })),
        )
        .await;
    assert_eq!(delivery.status, StatusCode::OK, "{}", delivery.body);
    assert_eq!(delivery.data()["old_quantity"], 200);
    assert_eq!(delivery.data()["new_quantity"], 250);
    assert_eq!(app.stock_of(stock::FISH_FILLET).await, 250);

    let zero = app
        .send_as_manager(Method::POST, &uri, Some(json!({ "delta": 0 })))
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);

    let too_much = app
        .send_as_manager(Method::POST, &uri, Some(json!({ "delta": -251 })))
        .await;
    assert_eq!(too_much.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.stock_of(stock::FISH_FILLET).await, 250);

    let anonymous = app
        .send(Method::POST, &uri, Some(json!({ "delta": 5 })), None, &[])
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inventory_items_are_created_and_removed_by_managers() {
    let app = TestApp::new().await;

    let created = app
        .send_as_manager(
            Method::POST,
            "/api/v1/inventory",
            Some(json!({ "name": "Pickle Spear", "quantity": 80, "unit_cost": "0.07" })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let id = created.data()["id"].as_i64().unwrap();

    let duplicate = app
        .send_as_manager(
            Method::POST,
            "/api/v1/inventory",
            Some(json!({ "name": "Pickle Spear", "quantity": 1, "unit_cost": "0.07" })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let deleted = app
        .send_as_manager(Method::DELETE, &format!("/api/v1/inventory/{}", id), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(
        app.get(&format!("/api/v1/inventory/{}", id)).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn customers_are_unique_by_phone() {
    let app = TestApp::new().await;
    let body = json!({ "name": "Rowan Park", "phone_number": "555-222-3333" });

    let created = app.post("/api/v1/customers", body.clone()).await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.data()["address"], json!(null));
    let id = created.data()["id"].as_i64().unwrap();

    let duplicate = app.post("/api/v1/customers", body).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let found = app.get("/api/v1/customers/by-phone/555-222-3333").await;
    assert_eq!(found.data()["id"], id);
    let absent = app.get("/api/v1/customers/by-phone/555-000-0000").await;
    assert_eq!(absent.status, StatusCode::NOT_FOUND);

    let bad = app
        .post(
            "/api/v1/customers",
            json!({ "name": "Nope", "phone_number": "5552223333" }),
        )
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert!(bad.message().contains("phone_number"));
}

#[tokio::test]
async fn customer_address_can_be_set_but_not_blanked() {
    let app = TestApp::new().await;
    let created = app
        .post(
            "/api/v1/customers",
            json!({ "name": "Rowan Park", "phone_number": "555-222-3333" }),
        )
        .await;
    let uri = format!("/api/v1/customers/{}/address", created.data()["id"]);

    let updated = app
        .send(
            Method::PATCH,
            &uri,
            Some(json!({ "address": "12 Harbor Rd" })),
            None,
            &[],
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.data()["address"], "12 Harbor Rd");

    let blank = app
        .send(Method::PATCH, &uri, Some(json!({ "address": "   " })), None, &[])
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let missing = app
        .send(
            Method::PATCH,
            "/api/v1/customers/4242/address",
            Some(json!({ "address": "12 Harbor Rd" })),
            None,
            &[],
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn staff_records_are_manager_only() {
    let app = TestApp::new().await;

    let cashier = app
        .send(
            Method::GET,
            "/api/v1/employees",
            None,
            Some(app.cashier_token()),
            &[],
        )
        .await;
    assert_eq!(cashier.status, StatusCode::FORBIDDEN);

    let listed = app.get_as_manager("/api/v1/employees").await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.data().as_array().map(Vec::len), Some(3));

    let hired = app
        .send_as_manager(
            Method::POST,
            "/api/v1/employees",
            Some(json!({ "name": "Casey Wu", "username": "cwu" })),
        )
        .await;
    assert_eq!(hired.status, StatusCode::CREATED, "{}", hired.body);
    assert_eq!(hired.data()["is_manager"], false);
    let hired_id = hired.data()["id"].as_i64().unwrap();

    let taken = app
        .send_as_manager(
            Method::POST,
            "/api/v1/employees",
            Some(json!({ "name": "Casey Wu Jr", "username": "cwu" })),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let promoted = app
        .send_as_manager(
            Method::PATCH,
            &format!("/api/v1/employees/{}", hired_id),
            Some(json!({ "is_manager": true })),
        )
        .await;
    assert_eq!(promoted.data()["is_manager"], true);

    let removed = app
        .send_as_manager(
            Method::DELETE,
            &format!("/api/v1/employees/{}", hired_id),
            None,
        )
        .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn employees_with_orders_cannot_be_removed() {
    let app = TestApp::new().await;
    app.post(
        "/api/v1/orders",
        json!({
            "customer": { "name": "Avery", "phone_number": "555-100-0001" },
            "employee_id": CASHIER_ID,
            "order_type": "dine_in",
            "lines": [ { "menu_item_id": FIVE_PIECE_MEAL, "quantity": 1 } ]
        }),
    )
    .await;

    let response = app
        .send_as_manager(
            Method::DELETE,
            &format!("/api/v1/employees/{}", CASHIER_ID),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn sign_in_issues_a_usable_session() {
    let app = TestApp::new().await;

    let issued = app
        .post("/api/v1/sessions", json!({ "username": "jlee" }))
        .await;
    assert_eq!(issued.status, StatusCode::CREATED, "{}", issued.body);
    assert_eq!(issued.data()["token_type"], "Bearer");
    assert_eq!(issued.data()["employee"]["is_manager"], true);
    let token = issued.data()["token"].as_str().unwrap().to_string();

    let current = app
        .send(Method::GET, "/api/v1/sessions/current", None, Some(&token), &[])
        .await;
    assert_eq!(current.status, StatusCode::OK);
    assert_eq!(current.data()["employee_id"], 2);

    let report = app
        .send(Method::GET, "/api/v1/analytics/summary", None, Some(&token), &[])
        .await;
    assert_eq!(report.status, StatusCode::OK);

    let stranger = app
        .post("/api/v1/sessions", json!({ "username": "nobody" }))
        .await;
    assert_eq!(stranger.status, StatusCode::NOT_FOUND);

    let blank = app.post("/api/v1/sessions", json!({ "username": "" })).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let signed_out = app.get("/api/v1/sessions/current").await;
    assert_eq!(signed_out.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_in_cashier_is_the_default_employee_on_orders() {
    let app = TestApp::new().await;
    let issued = app
        .post("/api/v1/sessions", json!({ "username": "srivera" }))
        .await;
    let token = issued.data()["token"].as_str().unwrap().to_string();

    let placed = app
        .send(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer": { "name": "Avery", "phone_number": "555-100-0001" },
                "order_type": "take_out",
                "lines": [ { "menu_item_id": FIVE_PIECE_MEAL, "quantity": 1 } ]
            })),
            Some(&token),
            &[],
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.body);
    assert_eq!(placed.data()["order"]["employee_id"], CASHIER_ID);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;
    let doc = app.get("/api-docs/openapi.json").await;
    assert_eq!(doc.status, StatusCode::OK);
    assert!(doc.body["paths"]["/api/v1/orders"].is_object());
    assert!(doc.body["paths"]["/api/v1/kitchen/feed"].is_object());
}
