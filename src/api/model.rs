//! Request and response bodies exchanged with the ordering API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{OrderStatus, SubmittedOrder};

#[derive(Debug, Clone, Serialize)]
pub struct SigninRequest {
    pub useremail: String,
    pub password: String,
}

/// Body of `POST /users/orderitem`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItemRequest {
    pub name: String,
    pub description: String,
    pub price: String,
    pub quantity: u32,
    pub useremail: String,
    pub orderid: String,
}

/// Body of `POST /users/submit` and `POST /users/submit2`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSubmission {
    pub name: String,
    pub table_no: String,
    pub useremail: String,
    pub item_name: String,
    pub item_description: String,
    pub price: String,
    pub quantity: u32,
    pub orderid: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub location_name: String,
    pub status: OrderStatus,
}

impl OrderSubmission {
    /// The record the API is expected to hold once this submission lands.
    pub fn into_submitted(self) -> SubmittedOrder {
        SubmittedOrder {
            orderid: self.orderid,
            name: self.name,
            table_no: self.table_no,
            useremail: self.useremail,
            item_name: self.item_name,
            item_description: self.item_description,
            price: self.price,
            quantity: self.quantity,
            total: self.total,
            location_name: self.location_name,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AgentReply {
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /users/getstatus` answers with either a bare list or `{ "orders": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StatusListing {
    Bare(Vec<SubmittedOrder>),
    Wrapped {
        #[serde(default)]
        orders: Vec<SubmittedOrder>,
    },
}

impl StatusListing {
    pub(crate) fn into_orders(self) -> Vec<SubmittedOrder> {
        match self {
            StatusListing::Bare(orders) | StatusListing::Wrapped { orders } => orders,
        }
    }
}

/// Extract the human-readable `detail` from an error body, if any.
pub fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}
