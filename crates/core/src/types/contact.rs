//! Phone numbers and postal codes.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors from parsing [`Phone`] or [`Pincode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    #[error("phone number must have 10 to 15 digits, optionally starting with +")]
    InvalidPhone,
    #[error("pincode must be 6 digits")]
    InvalidPincode,
}

/// A phone number normalized to an optional `+` followed by 10-15 digits.
///
/// Spaces, dashes and parentheses are stripped before validation, so
/// `"+91 98765-43210"` and `"+919876543210"` are the same number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns [`ContactError::InvalidPhone`] when the cleaned input is not
    /// an optional `+` followed by 10 to 15 digits.
    pub fn parse(s: &str) -> Result<Self, ContactError> {
        let cleaned: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();
        let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

        if !(10..=15).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ContactError::InvalidPhone);
        }
        Ok(Self(cleaned))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last ten digits, used to match a number typed with or without
    /// the country code.
    #[must_use]
    pub fn national_number(&self) -> &str {
        let len = self.0.len();
        self.0.get(len.saturating_sub(10)..).unwrap_or(&self.0)
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Phone {
    type Error = ContactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

/// An Indian postal index number: six digits, never starting with zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pincode(String);

impl Pincode {
    /// Parse a pincode, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ContactError::InvalidPincode`] unless the input is exactly
    /// six ASCII digits with a non-zero first digit.
    pub fn parse(s: &str) -> Result<Self, ContactError> {
        let s = s.trim();
        let bytes = s.as_bytes();
        let valid = bytes.len() == 6
            && bytes.iter().all(u8::is_ascii_digit)
            && bytes.first().is_some_and(|b| *b != b'0');
        if valid {
            Ok(Self(s.to_owned()))
        } else {
            Err(ContactError::InvalidPincode)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first three digits (sorting district), which select a delivery zone.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.get(..3).unwrap_or(&self.0)
    }
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Pincode {
    type Error = ContactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pincode> for String {
    fn from(pincode: Pincode) -> Self {
        pincode.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_normalizes_separators() {
        let phone = Phone::parse("+91 98765-43210").unwrap();
        assert_eq!(phone.as_str(), "+919876543210");
        assert_eq!(phone.national_number(), "9876543210");
    }

    #[test]
    fn test_phone_length_bounds() {
        assert!(Phone::parse("987654321").is_err());
        assert!(Phone::parse("9876543210").is_ok());
        assert!(Phone::parse("123456789012345").is_ok());
        assert!(Phone::parse("1234567890123456").is_err());
    }

    #[test]
    fn test_phone_rejects_letters_and_inner_plus() {
        assert!(Phone::parse("98765abc10").is_err());
        assert!(Phone::parse("98+76543210").is_err());
    }

    #[test]
    fn test_pincode() {
        let pin = Pincode::parse(" 560034 ").unwrap();
        assert_eq!(pin.as_str(), "560034");
        assert_eq!(pin.prefix(), "560");
        assert!(Pincode::parse("56003").is_err());
        assert!(Pincode::parse("5600345").is_err());
        assert!(Pincode::parse("56O034").is_err());
        assert!(Pincode::parse("060034").is_err());
    }
}
