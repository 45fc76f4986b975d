use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Feathers N Fins POS API",
        version = "0.1.0",
        description = r#"
# Feathers N Fins point of sale

Backend for the counter tills, the self-order kiosk and the kitchen display.

## Orders

`POST /api/v1/orders` resolves the customer by phone number, records the order
and its lines, and draws every ingredient the lines need from inventory as one
transaction. Send an `Idempotency-Key` header so a retried request returns the
original order instead of ringing it up twice.

## Authentication

Staff sessions are issued by `POST /api/v1/sessions` after the identity provider
has signed the employee in. Menu, inventory and staff management plus analytics
require a manager session:

```
Authorization: Bearer <session-token>
```

## Errors

```json
{
  "error": "Unprocessable Entity",
  "message": "Insufficient stock: Chicken Tenders needs 10, has 4",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order placement and lookup"),
        (name = "Kitchen", description = "Kitchen display feed"),
        (name = "Customers", description = "Customer records"),
        (name = "Menu", description = "Menu items and recipes"),
        (name = "Inventory", description = "Ingredient stock"),
        (name = "Employees", description = "Staff records"),
        (name = "Analytics", description = "Sales reporting"),
        (name = "Sessions", description = "Employee sign-in")
    ),
    paths(
        // Orders
        crate::handlers::orders::place_order,
        crate::handlers::orders::list_completed_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_order_items,
        crate::handlers::orders::add_order_item,
        crate::handlers::orders::complete_order,

        // Kitchen
        crate::handlers::kitchen::open_orders,
        crate::handlers::kitchen::kitchen_feed,

        // Customers
        crate::handlers::customers::list_customers,
        crate::handlers::customers::get_customer_by_phone,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::update_customer_address,

        // Menu
        crate::handlers::menu::list_menu_items,
        crate::handlers::menu::get_menu_item,
        crate::handlers::menu::get_recipe,
        crate::handlers::menu::create_menu_item,
        crate::handlers::menu::update_menu_item,
        crate::handlers::menu::delete_menu_item,

        // Inventory
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::inventory_exists,
        crate::handlers::inventory::get_inventory,
        crate::handlers::inventory::create_inventory,
        crate::handlers::inventory::update_inventory,
        crate::handlers::inventory::delete_inventory,
        crate::handlers::inventory::adjust_inventory,

        // Employees
        crate::handlers::employees::list_employees,
        crate::handlers::employees::get_employee,
        crate::handlers::employees::create_employee,
        crate::handlers::employees::update_employee,
        crate::handlers::employees::delete_employee,

        // Analytics
        crate::handlers::analytics::get_summary,
        crate::handlers::analytics::get_sales_per_hour,
        crate::handlers::analytics::get_product_usage,
        crate::handlers::analytics::get_x_report,

        // Sessions
        crate::handlers::sessions::create_session,
        crate::handlers::sessions::current_session,
    ),
    components(
        schemas(
            crate::entities::order::OrderType,
            crate::entities::menu_item::MenuCategory,
            crate::services::orders::CustomerRef,
            crate::services::orders::PlaceOrderRequest,
            crate::services::orders::OrderLineRequest,
            crate::services::orders::OrderReceipt,
            crate::services::kitchen::KitchenSnapshot,
            crate::services::analytics::SalesSummary,
            crate::services::analytics::XReport,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
