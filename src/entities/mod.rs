pub mod customer;
pub mod employee;
pub mod inventory_item;
pub mod menu_item;
pub mod order;
pub mod order_item;
pub mod recipe_line;
