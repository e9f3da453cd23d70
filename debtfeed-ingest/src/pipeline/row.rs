//! CSV row parsing and field validation

use chrono::NaiveDate;
use debtfeed_common::db::PendingDebt;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Header columns every feed must carry
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "name",
    "governmentId",
    "email",
    "debtAmount",
    "debtDueDate",
    "debtId",
];

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_GOVERNMENT_ID_LEN: usize = 20;
pub const MAX_EMAIL_LEN: usize = 254;
/// Amounts are stored with at most 10 digits, 2 of them decimal
pub const AMOUNT_SCALE: u32 = 2;
pub const AMOUNT_MAX_DIGITS: u32 = 10;

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// One record as it appears in the file, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct CsvRecord {
    pub name: String,
    #[serde(rename = "governmentId")]
    pub government_id: String,
    pub email: String,
    #[serde(rename = "debtAmount")]
    pub debt_amount: String,
    #[serde(rename = "debtDueDate")]
    pub debt_due_date: String,
    #[serde(rename = "debtId")]
    pub debt_id: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("Field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("Field '{field}' exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Invalid debt amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("Invalid due date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid email address '{0}'")]
    InvalidEmail(String),

    #[error("Invalid debtId '{0}', expected a UUID")]
    InvalidDebtId(String),
}

/// A record that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtRow {
    pub name: String,
    pub government_id: String,
    pub email: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub external_id: Uuid,
}

impl DebtRow {
    pub fn into_pending(self) -> PendingDebt {
        PendingDebt {
            name: self.name,
            government_id: self.government_id,
            email: self.email,
            amount: self.amount,
            due_date: self.due_date,
            external_id: self.external_id,
        }
    }
}

impl TryFrom<CsvRecord> for DebtRow {
    type Error = RowError;

    fn try_from(record: CsvRecord) -> Result<Self, Self::Error> {
        let name = bounded("name", record.name, MAX_NAME_LEN)?;
        let government_id = bounded("governmentId", record.government_id, MAX_GOVERNMENT_ID_LEN)?;
        let email = parse_email(bounded("email", record.email, MAX_EMAIL_LEN)?)?;
        let amount = parse_amount(&non_empty("debtAmount", record.debt_amount)?)?;

        let due_date = non_empty("debtDueDate", record.debt_due_date)?;
        let due_date = NaiveDate::parse_from_str(&due_date, DUE_DATE_FORMAT)
            .map_err(|_| RowError::InvalidDate(due_date.clone()))?;

        let debt_id = non_empty("debtId", record.debt_id)?;
        let external_id =
            Uuid::parse_str(&debt_id).map_err(|_| RowError::InvalidDebtId(debt_id.clone()))?;

        Ok(DebtRow {
            name,
            government_id,
            email,
            amount,
            due_date,
            external_id,
        })
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, RowError> {
    if value.trim().is_empty() {
        return Err(RowError::EmptyField(field));
    }
    Ok(value)
}

fn bounded(field: &'static str, value: String, max: usize) -> Result<String, RowError> {
    let value = non_empty(field, value)?;
    if value.chars().count() > max {
        return Err(RowError::TooLong { field, max });
    }
    Ok(value)
}

fn parse_email(value: String) -> Result<String, RowError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(value)
    } else {
        Err(RowError::InvalidEmail(value))
    }
}

/// Parse and normalise an amount to two decimal places
pub fn parse_amount(value: &str) -> Result<Decimal, RowError> {
    let invalid = |reason: &str| RowError::InvalidAmount {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let mut amount = Decimal::from_str(value).map_err(|e| invalid(&e.to_string()))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(invalid("must not be negative"));
    }
    if amount.scale() > AMOUNT_SCALE {
        amount = amount.normalize();
        if amount.scale() > AMOUNT_SCALE {
            return Err(invalid("more than 2 decimal places"));
        }
    }

    amount.rescale(AMOUNT_SCALE);
    let max = Decimal::from(10i64.pow(AMOUNT_MAX_DIGITS - AMOUNT_SCALE));
    if amount.abs() >= max {
        return Err(invalid("more than 10 digits"));
    }

    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CsvRecord {
        CsvRecord {
            name: "John Doe".to_string(),
            government_id: "11111111111".to_string(),
            email: "johndoe@kanastra.com.br".to_string(),
            debt_amount: "1000000.00".to_string(),
            debt_due_date: "2022-10-12".to_string(),
            debt_id: "1adb6ccf-ff16-467f-bea7-5f05d494280f".to_string(),
        }
    }

    #[test]
    fn test_valid_record() {
        let row = DebtRow::try_from(record()).unwrap();
        assert_eq!(row.name, "John Doe");
        assert_eq!(row.amount.to_string(), "1000000.00");
        assert_eq!(row.due_date, NaiveDate::from_ymd_opt(2022, 10, 12).unwrap());
        assert_eq!(
            row.external_id,
            Uuid::parse_str("1adb6ccf-ff16-467f-bea7-5f05d494280f").unwrap()
        );
    }

    #[test]
    fn test_amount_normalised_to_two_places() {
        assert_eq!(parse_amount("5000").unwrap().to_string(), "5000.00");
        assert_eq!(parse_amount("12.5").unwrap().to_string(), "12.50");
        assert_eq!(parse_amount("12.500").unwrap().to_string(), "12.50");
    }

    #[test]
    fn test_amount_limits() {
        assert!(parse_amount("99999999.99").is_ok());
        assert!(matches!(
            parse_amount("100000000.00"),
            Err(RowError::InvalidAmount { .. })
        ));
        assert!(matches!(parse_amount("1.234"), Err(RowError::InvalidAmount { .. })));
        assert!(matches!(parse_amount("-5.00"), Err(RowError::InvalidAmount { .. })));
        assert!(matches!(parse_amount("abc"), Err(RowError::InvalidAmount { .. })));
    }

    #[test]
    fn test_empty_field_rejected() {
        let mut r = record();
        r.name = String::new();
        assert_eq!(DebtRow::try_from(r), Err(RowError::EmptyField("name")));
    }

    #[test]
    fn test_overlong_government_id_rejected() {
        let mut r = record();
        r.government_id = "1".repeat(21);
        assert_eq!(
            DebtRow::try_from(r),
            Err(RowError::TooLong {
                field: "governmentId",
                max: MAX_GOVERNMENT_ID_LEN
            })
        );
    }

    #[test]
    fn test_invalid_date_rejected() {
        let mut r = record();
        r.debt_due_date = "12/10/2022".to_string();
        assert!(matches!(DebtRow::try_from(r), Err(RowError::InvalidDate(_))));
    }

    #[test]
    fn test_invalid_uuid_rejected() {
        let mut r = record();
        r.debt_id = "not-a-uuid".to_string();
        assert!(matches!(DebtRow::try_from(r), Err(RowError::InvalidDebtId(_))));
    }

    #[test]
    fn test_email_shapes() {
        assert!(parse_email("a@b.co".to_string()).is_ok());
        assert!(parse_email("no-at-sign".to_string()).is_err());
        assert!(parse_email("@b.co".to_string()).is_err());
        assert!(parse_email("a@b".to_string()).is_err());
        assert!(parse_email("a@@b.co".to_string()).is_err());
        assert!(parse_email("a b@c.co".to_string()).is_err());
    }
}
