use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token bundle returned by sign-in and kept in client storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub useremail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    pub id: i64,
    pub title: String,
    #[serde(alias = "desc", default)]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub rating: u8,
}

/// A line item pending checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartOrderItem {
    #[serde(default)]
    pub id: i64,
    pub orderid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    #[serde(rename = "Approved & Now Processing")]
    Processing,
    Rejected,
    #[serde(rename = "Order Done")]
    Done,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Approved & Now Processing",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Done => "Order Done",
        }
    }

    /// Rejected and done orders no longer change state.
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Rejected | OrderStatus::Done)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checkout-finalized record tracked for status until completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmittedOrder {
    pub orderid: String,
    pub name: String,
    pub table_no: String,
    pub useremail: String,
    pub item_name: String,
    #[serde(default)]
    pub item_description: String,
    pub price: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub location_name: String,
    #[serde(default, deserialize_with = "status_or_default")]
    pub status: OrderStatus,
}

/// Missing, null or empty status values read as `Pending`.
fn status_or_default<'de, D>(deserializer: D) -> Result<OrderStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(OrderStatus::Pending),
        Some(s) => OrderStatus::deserialize(serde::de::value::StrDeserializer::<D::Error>::new(s)),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sender {
    User,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}
