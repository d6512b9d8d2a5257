use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a receipt was paid. A receipt without one has `None` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    /// Display name, e.g. "Corporate Card"
    pub method: String,
    pub custom_order_id: i64,
    pub uuid: Uuid,
}

pub const DEFAULT_PAYMENT_METHODS: &[&str] = &[
    "Unspecified",
    "Corporate Card",
    "Personal Card",
    "Check",
    "Cash",
];
