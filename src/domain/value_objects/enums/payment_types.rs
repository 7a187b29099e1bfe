use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Payment,
    Fine,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Payment => "payment",
            PaymentType::Fine => "fine",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "payment" => Some(PaymentType::Payment),
            "fine" => Some(PaymentType::Fine),
            _ => None,
        }
    }

    /// Label used on checkout line items.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentType::Payment => "Payment",
            PaymentType::Fine => "Fine",
        }
    }
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
