mod common;

use axum::http::{Method, StatusCode};
use feathers_pos::config::StockPolicy;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

use common::{stock, TestApp, TestResponse, CASHIER_ID, FIVE_PIECE_MEAL};

fn five_piece_order(quantity: i32, phone: &str) -> Value {
    json!({
        "customer": { "name": "Avery Quinn", "phone_number": phone },
        "order_type": "dine_in",
        "lines": [
            { "menu_item_id": FIVE_PIECE_MEAL, "quantity": quantity, "modifications": "extra ranch" }
        ]
    })
}

#[tokio::test]
async fn placing_an_order_records_lines_and_draws_down_stock() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Method::POST,
            "/api/v1/orders",
            Some(five_piece_order(2, "123-456-7890")),
            Some(app.cashier_token()),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

    let receipt = response.data();
    assert_eq!(receipt["replayed"], false);
    let order = &receipt["order"];
    assert_eq!(order["total_amount"], "19.98");
    assert_eq!(order["employee_id"], CASHIER_ID);
    assert_eq!(order["customer_name"], "Avery Quinn");
    assert_eq!(order["order_type"], "dine_in");
    assert_eq!(order["is_done"], false);

    let lines = order["lines"].as_array().expect("lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["menu_item_name"], "5 Piece Chicken Meal");
    assert_eq!(lines[0]["unit_price"], "9.99");
    assert_eq!(lines[0]["line_total"], "19.98");
    assert_eq!(lines[0]["modifications"], "extra ranch");

    let changes = receipt["inventory_changes"].as_array().expect("changes");
    let consumed: Vec<(i64, i64, i64)> = changes
        .iter()
        .map(|c| {
            (
                c["inventory_item_id"].as_i64().unwrap(),
                c["consumed"].as_i64().unwrap(),
                c["remaining"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        consumed,
        vec![
            (stock::CHICKEN_TENDERS as i64, 10, 490),
            (stock::FRIES_PORTION as i64, 2, 298),
            (stock::SAUCE_CUP as i64, 4, 596),
        ]
    );

    assert_eq!(app.stock_of(stock::CHICKEN_TENDERS).await, 490);
    assert_eq!(app.stock_of(stock::FRIES_PORTION).await, 298);
    assert_eq!(app.stock_of(stock::SAUCE_CUP).await, 596);
    assert_eq!(app.stock_of(stock::FISH_FILLET).await, 200);

    let customers = app.get("/api/v1/customers?phone=123-456-7890").await;
    assert_eq!(customers.data().as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn returning_phone_number_reuses_the_customer() {
    let app = TestApp::new().await;

    let mut first = five_piece_order(1, "555-010-2000");
    first["employee_id"] = json!(CASHIER_ID);
    let mut second = first.clone();
    second["customer"]["name"] = json!("A. Quinn");

    let a = app.post("/api/v1/orders", first).await;
    let b = app.post("/api/v1/orders", second).await;
    assert_eq!(a.status, StatusCode::CREATED, "{}", a.body);
    assert_eq!(b.status, StatusCode::CREATED, "{}", b.body);
    assert_eq!(
        a.data()["order"]["customer_id"],
        b.data()["order"]["customer_id"]
    );
    assert_ne!(a.data()["order"]["id"], b.data()["order"]["id"]);

    let found = app.get("/api/v1/customers/by-phone/555-010-2000").await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.data()["name"], "Avery Quinn");
}

#[tokio::test]
async fn existing_customer_can_be_referenced_by_id() {
    let app = TestApp::new().await;
    let created = app
        .post(
            "/api/v1/customers",
            json!({ "name": "Rowan Park", "phone_number": "555-222-3333" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let customer_id = created.data()["id"].clone();

    let response = app
        .post(
            "/api/v1/orders",
            json!({
                "customer": { "customer_id": customer_id },
                "employee_id": 1,
                "order_type": "take_out",
                "lines": [ { "menu_item_id": 11, "quantity": 1 } ]
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.data()["order"]["customer_id"], customer_id);
    assert_eq!(response.data()["order"]["total_amount"], "1.99");

    let missing = app
        .post(
            "/api/v1/orders",
            json!({
                "customer": { "customer_id": 4242 },
                "employee_id": 1,
                "order_type": "take_out",
                "lines": [ { "menu_item_id": 11, "quantity": 1 } ]
            }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn combo_sides_can_be_rung_up_at_zero() {
    let app = TestApp::new().await;
    let response = app
        .post(
            "/api/v1/orders",
            json!({
                "customer": { "name": "Kai", "phone_number": "555-000-1111" },
                "employee_id": 1,
                "order_type": "drive_thru",
                "lines": [
                    { "menu_item_id": 1, "quantity": 1 },
                    { "menu_item_id": 8, "quantity": 1, "unit_price": "0.00" },
                    { "menu_item_id": 11, "quantity": 1, "unit_price": "0.00" }
                ],
                "total": "6.99"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.data()["order"]["total_amount"], "6.99");
}

#[tokio::test]
async fn same_idempotency_key_replays_the_first_order() {
    let app = TestApp::new().await;
    let mut body = five_piece_order(2, "123-456-7890");
    body["employee_id"] = json!(CASHIER_ID);

    let first = app
        .send(
            Method::POST,
            "/api/v1/orders",
            Some(body.clone()),
            None,
            &[("idempotency-key", "kiosk-7-0001")],
        )
        .await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);

    let retry = app
        .send(
            Method::POST,
            "/api/v1/orders",
            Some(body.clone()),
            None,
            &[("idempotency-key", "kiosk-7-0001")],
        )
        .await;
    assert_eq!(retry.status, StatusCode::OK, "{}", retry.body);
    assert_eq!(retry.data()["replayed"], true);
    assert_eq!(retry.data()["order"]["id"], first.data()["order"]["id"]);
    assert_eq!(retry.data()["inventory_changes"], json!([]));

    // stock drawn once
    assert_eq!(app.stock_of(stock::CHICKEN_TENDERS).await, 490);

    let open = app.get("/api/v1/kitchen/orders").await;
    assert_eq!(open.data().as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn reused_idempotency_key_with_a_different_cart_conflicts() {
    let app = TestApp::new().await;
    let mut body = five_piece_order(2, "123-456-7890");
    body["employee_id"] = json!(CASHIER_ID);
    body["idempotency_key"] = json!("till-1-0042");

    let first = app.post("/api/v1/orders", body.clone()).await;
    assert_eq!(first.status, StatusCode::CREATED);

    body["lines"][0]["quantity"] = json!(3);
    let conflicting = app.post("/api/v1/orders", body).await;
    assert_eq!(conflicting.status, StatusCode::CONFLICT, "{}", conflicting.body);
    assert_eq!(app.stock_of(stock::CHICKEN_TENDERS).await, 490);
}

#[tokio::test]
async fn unknown_menu_item_rolls_back_everything() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/orders",
            json!({
                "customer": { "name": "Nobody", "phone_number": "555-999-8888" },
                "employee_id": CASHIER_ID,
                "order_type": "dine_in",
                "lines": [
                    { "menu_item_id": FIVE_PIECE_MEAL, "quantity": 1 },
                    { "menu_item_id": 999, "quantity": 1 }
                ]
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", response.body);
    assert!(response.message().contains("999"));

    assert_eq!(app.stock_of(stock::CHICKEN_TENDERS).await, 500);
    let open = app.get("/api/v1/kitchen/orders").await;
    assert_eq!(open.data(), &json!([]));
    let customers = app.get("/api/v1/customers?phone=555-999-8888").await;
    assert_eq!(customers.data(), &json!([]));
}

#[tokio::test]
async fn shortage_rejects_the_order_under_the_default_policy() {
    let app = TestApp::new().await;
    let patched = app
        .send_as_manager(
            Method::PATCH,
            &format!("/api/v1/inventory/{}", stock::CHICKEN_TENDERS),
            Some(json!({ "quantity": 4 })),
        )
        .await;
    assert_eq!(patched.status, StatusCode::OK, "{}", patched.body);

    let mut body = five_piece_order(1, "123-456-7890");
    body["employee_id"] = json!(CASHIER_ID);
    let response = app.post("/api/v1/orders", body).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{}", response.body);
    assert!(response.message().contains("Chicken Tenders needs 5, has 4"));

    assert_eq!(app.stock_of(stock::CHICKEN_TENDERS).await, 4);
    assert_eq!(app.stock_of(stock::FRIES_PORTION).await, 300);
    let customers = app.get("/api/v1/customers?phone=123-456-7890").await;
    assert_eq!(customers.data(), &json!([]));
}

#[tokio::test]
async fn shortage_is_reported_as_a_warning_when_negative_stock_is_allowed() {
    let app = TestApp::with_policy(StockPolicy::AllowNegative).await;
    app.send_as_manager(
        Method::PATCH,
        &format!("/api/v1/inventory/{}", stock::CHICKEN_TENDERS),
        Some(json!({ "quantity": 4 })),
    )
    .await;

    let mut body = five_piece_order(1, "123-456-7890");
    body["employee_id"] = json!(CASHIER_ID);
    let response = app.post("/api/v1/orders", body).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(
        response.data()["warnings"],
        json!(["Chicken Tenders stock is negative (-1)"])
    );
    assert_eq!(app.stock_of(stock::CHICKEN_TENDERS).await, -1);
}

#[tokio::test]
async fn invalid_carts_are_rejected_before_touching_the_database() {
    let app = TestApp::new().await;

    let cases = [
        (json!([]), "lines"),
        (
            json!([{ "menu_item_id": FIVE_PIECE_MEAL, "quantity": 0 }]),
            "lines[0].quantity",
        ),
        (
            json!([
                { "menu_item_id": FIVE_PIECE_MEAL, "quantity": 1 },
                { "menu_item_id": 8, "quantity": 1, "unit_price": "-1.00" }
            ]),
            "lines[1].unit_price",
        ),
    ];

    for (lines, field) in cases {
        let response = app
            .post(
                "/api/v1/orders",
                json!({
                    "customer": { "name": "Avery Quinn", "phone_number": "123-456-7890" },
                    "employee_id": CASHIER_ID,
                    "order_type": "dine_in",
                    "lines": lines
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
        assert!(
            response.message().contains(field),
            "{} should mention {}",
            response.message(),
            field
        );
    }
}

#[tokio::test]
async fn order_needs_an_employee_and_a_valid_phone() {
    let app = TestApp::new().await;

    let anonymous = app.post("/api/v1/orders", five_piece_order(1, "123-456-7890")).await;
    assert_eq!(anonymous.status, StatusCode::BAD_REQUEST);
    assert!(anonymous.message().contains("employee_id"));

    let mut bad_phone = five_piece_order(1, "1234567890");
    bad_phone["employee_id"] = json!(CASHIER_ID);
    let response = app.post("/api/v1/orders", bad_phone).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.message().contains("phone_number"));

    let mut ghost = five_piece_order(1, "123-456-7890");
    ghost["employee_id"] = json!(77);
    let response = app.post("/api/v1/orders", ghost).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mismatched_client_total_is_rejected() {
    let app = TestApp::new().await;
    let mut body = five_piece_order(2, "123-456-7890");
    body["employee_id"] = json!(CASHIER_ID);
    body["total"] = json!("20.00");

    let response = app.post("/api/v1/orders", body).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
    assert!(response.message().contains("total"));
    assert_eq!(app.stock_of(stock::CHICKEN_TENDERS).await, 500);
}

#[tokio::test]
async fn lines_can_be_added_until_the_order_is_done() {
    let app = TestApp::new().await;
    let mut body = five_piece_order(1, "123-456-7890");
    body["employee_id"] = json!(CASHIER_ID);
    let placed = app.post("/api/v1/orders", body).await;
    let order_id = placed.data()["order"]["id"].as_i64().unwrap();

    let added = app
        .post(
            &format!("/api/v1/orders/{}/items", order_id),
            json!({ "menu_item_id": 12, "quantity": 2 }),
        )
        .await;
    assert_eq!(added.status, StatusCode::CREATED, "{}", added.body);
    assert_eq!(added.data()["order"]["total_amount"], "14.57");
    assert_eq!(added.data()["order"]["lines"].as_array().map(Vec::len), Some(2));

    let tickets = app.get(&format!("/api/v1/orders/{}/items", order_id)).await;
    assert_eq!(tickets.status, StatusCode::OK);
    let items: Vec<&str> = tickets
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["item_name"].as_str().unwrap())
        .collect();
    assert_eq!(items, vec!["5 Piece Chicken Meal", "Lemonade"]);

    let done = app
        .post(&format!("/api/v1/orders/{}/complete", order_id), json!({}))
        .await;
    assert_eq!(done.status, StatusCode::OK);

    let late = app
        .post(
            &format!("/api/v1/orders/{}/items", order_id),
            json!({ "menu_item_id": 12, "quantity": 1 }),
        )
        .await;
    assert_eq!(late.status, StatusCode::BAD_REQUEST);
    assert!(late.message().contains("already done"));

    let missing = app
        .post("/api/v1/orders/9999/items", json!({ "menu_item_id": 12, "quantity": 1 }))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_orders_are_not_found() {
    let app = TestApp::new().await;
    assert_eq!(app.get("/api/v1/orders/4242").await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.get("/api/v1/orders/4242/items").await.status,
        StatusCode::NOT_FOUND
    );
}

/// Runs each request as its own task so they overlap on the worker threads.
async fn run_concurrently<F, Fut>(app: &Arc<TestApp>, requests: Vec<F>) -> Vec<TestResponse>
where
    F: FnOnce(Arc<TestApp>) -> Fut,
    Fut: Future<Output = TestResponse> + Send + 'static,
{
    let tasks = requests
        .into_iter()
        .map(|request| tokio::spawn(request(Arc::clone(app))));
    futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("request task panicked"))
        .collect()
}

fn place(body: Value) -> impl FnOnce(Arc<TestApp>) -> BoxFuture<'static, TestResponse> {
    move |app| async move { app.post("/api/v1/orders", body).await }.boxed()
}

async fn concurrent_app() -> Arc<TestApp> {
    Arc::new(TestApp::builder().max_connections(8).build().await)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_retries_with_one_key_place_one_order() {
    let app = concurrent_app().await;
    let mut body = five_piece_order(1, "123-456-7890");
    body["employee_id"] = json!(CASHIER_ID);
    body["idempotency_key"] = json!("kiosk-2-0099");

    let responses = run_concurrently(&app, (0..6).map(|_| place(body.clone())).collect()).await;

    for response in &responses {
        assert!(
            response.status == StatusCode::CREATED || response.status == StatusCode::OK,
            "{} {}",
            response.status,
            response.body
        );
        assert_eq!(
            response.data()["replayed"],
            response.status == StatusCode::OK
        );
        assert_eq!(response.data()["order"]["id"], responses[0].data()["order"]["id"]);
    }
    assert_eq!(
        responses.iter().filter(|r| r.status == StatusCode::CREATED).count(),
        1
    );
    assert_eq!(app.stock_of(stock::CHICKEN_TENDERS).await, 495);
    let open = app.get("/api/v1/kitchen/orders").await;
    assert_eq!(open.data().as_array().map(Vec::len), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_from_different_customers_all_land() {
    let app = concurrent_app().await;
    let requests = (0..8)
        .map(|i| {
            let mut body = five_piece_order(1, &format!("555-710-000{}", i));
            body["employee_id"] = json!(CASHIER_ID);
            place(body)
        })
        .collect();

    let responses = run_concurrently(&app, requests).await;

    let mut ids: Vec<i64> = responses
        .iter()
        .map(|r| {
            assert_eq!(r.status, StatusCode::CREATED, "{}", r.body);
            r.data()["order"]["id"].as_i64().expect("order id")
        })
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(app.stock_of(stock::CHICKEN_TENDERS).await, 460);
    let open = app.get("/api/v1/kitchen/orders").await;
    assert_eq!(open.data().as_array().map(Vec::len), Some(8));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell_stock() {
    let app = concurrent_app().await;
    app.send_as_manager(
        Method::PATCH,
        &format!("/api/v1/inventory/{}", stock::CHICKEN_TENDERS),
        Some(json!({ "quantity": 12 })),
    )
    .await;

    let requests = (0..4)
        .map(|i| {
            let mut body = five_piece_order(1, &format!("555-700-000{}", i));
            body["employee_id"] = json!(CASHIER_ID);
            place(body)
        })
        .collect();
    let responses = run_concurrently(&app, requests).await;

    let placed = responses
        .iter()
        .filter(|r| r.status == StatusCode::CREATED)
        .count();
    let refused = responses
        .iter()
        .filter(|r| r.status == StatusCode::UNPROCESSABLE_ENTITY)
        .count();
    assert_eq!((placed, refused), (2, 2), "{:?}", responses.iter().map(|r| &r.body).collect::<Vec<_>>());
    assert_eq!(app.stock_of(stock::CHICKEN_TENDERS).await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deliveries_and_sales_interleave_without_losing_counts() {
    let app = concurrent_app().await;
    let uri = format!("/api/v1/inventory/{}/adjust", stock::CHICKEN_TENDERS);

    let mut requests: Vec<Box<dyn FnOnce(Arc<TestApp>) -> BoxFuture<'static, TestResponse> + Send>> =
        Vec::new();
    for i in 0..4 {
        let mut body = five_piece_order(1, &format!("555-720-000{}", i));
        body["employee_id"] = json!(CASHIER_ID);
        requests.push(Box::new(place(body)));

        let uri = uri.clone();
        requests.push(Box::new(move |app: Arc<TestApp>| {
            async move {
                app.send_as_manager(
                    Method::POST,
                    &uri,
                    Some(json!({ "delta": 5, "reason": "delivery" })),
                )
                .await
            }
            .boxed()
        }));
    }

    let responses = run_concurrently(&app, requests).await;

    for response in &responses {
        assert!(response.status.is_success(), "{} {}", response.status, response.body);
    }
    assert_eq!(app.stock_of(stock::CHICKEN_TENDERS).await, 500);
}
