//! Database models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// A stored debt. `id` is the storage id; `external_id` is the feed's business key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub id: i64,
    pub name: String,
    pub government_id: String,
    pub email: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub external_id: Uuid,
}

/// A debt accepted from the feed but not yet written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDebt {
    pub name: String,
    pub government_id: String,
    pub email: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub external_id: Uuid,
}

impl PendingDebt {
    /// Attach the storage id assigned on insert
    pub fn into_debt(self, id: i64) -> Debt {
        Debt {
            id,
            name: self.name,
            government_id: self.government_id,
            email: self.email,
            amount: self.amount,
            due_date: self.due_date,
            external_id: self.external_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Processed,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Processed => "Processed",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(InvoiceStatus::Pending),
            "Processed" => Ok(InvoiceStatus::Processed),
            other => Err(Error::InvalidInput(format!("Unknown invoice status: {}", other))),
        }
    }
}

/// Delivery status token recorded on an email log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailStatus {
    Sent,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Sent => "Sent",
        }
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sent" => Ok(EmailStatus::Sent),
            other => Err(Error::InvalidInput(format!("Unknown email status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub debt_id: i64,
    pub status: InvoiceStatus,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: i64,
    pub debt_id: i64,
    pub sent_at: DateTime<Utc>,
    pub status: EmailStatus,
}
