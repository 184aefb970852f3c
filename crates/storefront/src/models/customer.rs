//! Customer records and the address book.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cozycat_core::validation::{self, ValidationError};
use cozycat_core::{AddressId, CustomerId, Money, Pincode, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub whatsapp_number: Option<String>,
    pub is_whatsapp_preferred: bool,
    pub total_orders: i32,
    pub total_spent: Money,
    pub first_order_date: Option<DateTime<Utc>>,
    pub last_order_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub customer_id: CustomerId,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_default: bool,
    pub delivery_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Address form input, validated with [`AddressInput::validate`].
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_default: bool,
    pub delivery_notes: Option<String>,
}

impl AddressInput {
    /// Trim and validate every field.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let pincode = Pincode::parse(&self.pincode)
            .map_err(|e| ValidationError::new("pincode", e.to_string()))?;
        Ok(Self {
            address_line1: validation::address_line("address_line1", &self.address_line1)?,
            address_line2: validation::notes("address_line2", self.address_line2.as_deref())?,
            landmark: validation::notes("landmark", self.landmark.as_deref())?,
            city: validation::place_name("city", &self.city)?,
            state: validation::place_name("state", &self.state)?,
            pincode: pincode.into(),
            latitude: self.latitude,
            longitude: self.longitude,
            is_default: self.is_default,
            delivery_notes: validation::notes("delivery_notes", self.delivery_notes.as_deref())?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> AddressInput {
        AddressInput {
            address_line1: " 14 Lodhi Colony ".to_string(),
            address_line2: Some(String::new()),
            landmark: None,
            city: "New Delhi".to_string(),
            state: "Delhi".to_string(),
            pincode: "110003".to_string(),
            latitude: None,
            longitude: None,
            is_default: false,
            delivery_notes: Some("Leave with guard".to_string()),
        }
    }

    #[test]
    fn test_validate_trims_and_blanks() {
        let valid = input().validate().unwrap();
        assert_eq!(valid.address_line1, "14 Lodhi Colony");
        assert_eq!(valid.address_line2, None);
    }

    #[test]
    fn test_validate_rejects_bad_pincode() {
        let mut bad = input();
        bad.pincode = "1100".to_string();
        assert_eq!(bad.validate().unwrap_err().field, "pincode");
    }
}
