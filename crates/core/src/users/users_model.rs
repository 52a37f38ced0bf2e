//! User domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Investor,
    Business,
    Admin,
}

crate::text_enum!(UserRole {
    Investor => "INVESTOR",
    Business => "BUSINESS",
    Admin => "ADMIN",
});

/// FICA verification state. Investing, fundraising and withdrawals need `Approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    #[default]
    NotSubmitted,
    Pending,
    Approved,
    Rejected,
}

crate::text_enum!(KycStatus {
    NotSubmitted => "NOT_SUBMITTED",
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

/// Domain model representing a platform user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: UserRole,
    pub full_name: String,
    pub business_name: Option<String>,
    /// VAT registration number; VAT-registered businesses charge VAT by default.
    pub vat_number: Option<String>,
    pub kyc_status: KycStatus,
    pub id_number: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn is_kyc_approved(&self) -> bool {
        self.kyc_status == KycStatus::Approved
    }

    /// Name shown on invoices and emails.
    pub fn display_name(&self) -> &str {
        self.business_name.as_deref().unwrap_or(&self.full_name)
    }

    pub fn ensure_kyc_approved(&self) -> Result<()> {
        if !self.is_kyc_approved() {
            return Err(Error::Forbidden(
                "KYC verification must be approved first".to_string(),
            ));
        }
        Ok(())
    }
}

/// A user together with the stored password hash, only used at login.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Input model for creating a user. The password is already hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub full_name: String,
    pub business_name: Option<String>,
    pub vat_number: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        let email = self.email.trim();
        let valid_email = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !valid_email {
            return Err(Error::invalid_input("A valid email address is required"));
        }
        if self.full_name.trim().is_empty() {
            return Err(Error::invalid_input("Full name cannot be empty"));
        }
        if self.role == UserRole::Business
            && self
                .business_name
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
        {
            return Err(Error::invalid_input(
                "Business accounts need a business name",
            ));
        }
        Ok(())
    }

    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

/// Identity details submitted for FICA verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycSubmission {
    pub id_number: String,
}

/// Validates a 13-digit South African ID number: birth date and Luhn checksum.
pub fn validate_sa_id_number(id_number: &str) -> Result<()> {
    let digits: Vec<u32> = id_number
        .trim()
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::invalid_input("ID number must contain only digits"))?;

    if digits.len() != 13 {
        return Err(Error::invalid_input("ID number must be 13 digits"));
    }

    let month = digits[2] * 10 + digits[3];
    let day = digits[4] * 10 + digits[5];
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(Error::invalid_input("ID number has an invalid birth date"));
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    if sum % 10 != 0 {
        return Err(Error::invalid_input("ID number checksum is invalid"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(role: UserRole, business_name: Option<&str>) -> NewUser {
        NewUser {
            email: " Thandi@Example.co.za ".to_string(),
            password_hash: "hash".to_string(),
            role,
            full_name: "Thandi Nkosi".to_string(),
            business_name: business_name.map(str::to_string),
            vat_number: None,
        }
    }

    #[test]
    fn accepts_valid_sa_id_number() {
        assert!(validate_sa_id_number("8001015009087").is_ok());
    }

    #[test]
    fn rejects_bad_checksum_and_length() {
        assert!(validate_sa_id_number("8001015009088").is_err());
        assert!(validate_sa_id_number("800101500908").is_err());
        assert!(validate_sa_id_number("80010150090A7").is_err());
    }

    #[test]
    fn rejects_impossible_birth_month() {
        assert!(validate_sa_id_number("8013015009087").is_err());
    }

    #[test]
    fn business_requires_business_name() {
        assert!(new_user(UserRole::Business, None).validate().is_err());
        assert!(new_user(UserRole::Business, Some("Spaza Co")).validate().is_ok());
        assert!(new_user(UserRole::Investor, None).validate().is_ok());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            new_user(UserRole::Investor, None).normalized_email(),
            "thandi@example.co.za"
        );
    }

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!("BUSINESS".parse::<UserRole>().unwrap(), UserRole::Business);
        assert_eq!(KycStatus::NotSubmitted.as_str(), "NOT_SUBMITTED");
        assert!("OWNER".parse::<UserRole>().is_err());
    }
}
