use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: Option<u32>,
    pub address: Option<Address>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDto {
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
    pub age: u32,
    pub address: Option<AddressDto>,
    pub tags: Vec<String>,
    pub internal_note: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressDto {
    pub street: String,
    pub city: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerCard {
    pub id: i64,
    pub name: String,
    pub trail: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    pub name: String,
    pub price: f64,
    pub discount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductView {
    pub name: String,
    pub price: f64,
    pub discounted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u64,
    pub created_by: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(flatten)]
    pub entity: Entity,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeDto {
    pub id: u64,
    pub created_by: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItem {
    pub sku: String,
    pub qty: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemDto {
    pub sku: String,
    pub qty: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order {
    pub id: u64,
    pub items: Vec<LineItem>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderDto {
    pub id: u64,
    pub items: Vec<LineItemDto>,
    pub note: Option<String>,
}

/// No `Default`: built with a struct literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub order_id: u64,
    pub items: Vec<LineItemDto>,
    pub note: String,
    pub total_qty: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ticket {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketDto {
    pub order_id: u64,
    pub customer: String,
}
