//! Form input rules shared by the storefront and admin servers.
//!
//! Every check returns a [`ValidationError`] naming the offending field so
//! handlers can report it verbatim as a 400 response.

/// A rejected form field.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type ValidationResult<T = ()> = Result<T, ValidationError>;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_NOTES_LENGTH: usize = 500;
pub const MAX_ITEM_QUANTITY: u32 = 100;

const PASSWORD_SPECIALS: &[char] = &['@', '$', '!', '%', '*', '?', '&'];

/// A person's name: 2-50 letters, spaces, hyphens or apostrophes.
///
/// # Errors
///
/// Returns an error naming `field` when the trimmed value is out of range or
/// contains other characters.
pub fn person_name(field: &'static str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    let len = value.chars().count();
    if !(2..=50).contains(&len) {
        return Err(ValidationError::new(field, "must be 2 to 50 characters"));
    }
    if !value
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\''))
    {
        return Err(ValidationError::new(
            field,
            "may only contain letters, spaces, hyphens and apostrophes",
        ));
    }
    Ok(value.to_owned())
}

/// Password strength: 8-128 characters with an uppercase letter, a
/// lowercase letter, a digit and one of `@$!%*?&`.
///
/// # Errors
///
/// Returns an error describing the first unmet requirement.
pub fn password_strength(value: &str) -> ValidationResult {
    const FIELD: &str = "password";
    let len = value.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::new(
            FIELD,
            format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::new(
            FIELD,
            format!("must be at most {MAX_PASSWORD_LENGTH} characters"),
        ));
    }
    let checks = [
        (value.chars().any(char::is_uppercase), "an uppercase letter"),
        (value.chars().any(char::is_lowercase), "a lowercase letter"),
        (value.chars().any(|c| c.is_ascii_digit()), "a number"),
        (value.contains(PASSWORD_SPECIALS), "a special character (@$!%*?&)"),
    ];
    match checks.iter().find(|(ok, _)| !ok) {
        Some((_, missing)) => Err(ValidationError::new(FIELD, format!("must contain {missing}"))),
        None => Ok(()),
    }
}

/// A street address line: 5-200 characters after trimming.
///
/// # Errors
///
/// Returns an error naming `field` when out of range.
pub fn address_line(field: &'static str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if !(5..=200).contains(&value.chars().count()) {
        return Err(ValidationError::new(field, "must be 5 to 200 characters"));
    }
    Ok(value.to_owned())
}

/// A city or state name: 2-50 letters, spaces, dots or hyphens.
///
/// # Errors
///
/// Returns an error naming `field` when out of range or malformed.
pub fn place_name(field: &'static str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if !(2..=50).contains(&value.chars().count()) {
        return Err(ValidationError::new(field, "must be 2 to 50 characters"));
    }
    if !value
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '.' | '-'))
    {
        return Err(ValidationError::new(field, "may only contain letters"));
    }
    Ok(value.to_owned())
}

/// Optional free text, at most 500 characters. Blank becomes `None`.
///
/// # Errors
///
/// Returns an error naming `field` when too long.
pub fn notes(field: &'static str, value: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > MAX_NOTES_LENGTH {
        return Err(ValidationError::new(
            field,
            format!("must be at most {MAX_NOTES_LENGTH} characters"),
        ));
    }
    Ok(Some(value.to_owned()))
}

/// Quantity of a single order line: 1 to 100.
///
/// # Errors
///
/// Returns an error when out of range.
pub fn item_quantity(value: i64) -> ValidationResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|q| (1..=MAX_ITEM_QUANTITY).contains(q))
        .ok_or_else(|| {
            ValidationError::new("quantity", format!("must be between 1 and {MAX_ITEM_QUANTITY}"))
        })
}

/// A URL slug: lowercase ASCII letters, digits and single hyphens.
///
/// # Errors
///
/// Returns an error when empty or malformed.
pub fn slug(value: &str) -> ValidationResult<String> {
    let value = value.trim();
    let ok = !value.is_empty()
        && value.len() <= 120
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if ok {
        Ok(value.to_owned())
    } else {
        Err(ValidationError::new(
            "slug",
            "must be lowercase letters, digits and single hyphens",
        ))
    }
}

/// Derive a slug from a display name.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_person_name() {
        assert_eq!(person_name("name", "  Anaya D'Souza ").unwrap(), "Anaya D'Souza");
        assert!(person_name("name", "A").is_err());
        assert!(person_name("name", "R2D2").is_err());
        assert_eq!(person_name("first_name", "x").unwrap_err().field, "first_name");
    }

    #[test]
    fn test_password_strength() {
        assert!(password_strength("Meow@1234").is_ok());
        assert!(password_strength("Me@1").is_err());
        let err = password_strength("meow@1234").unwrap_err();
        assert!(err.message.contains("uppercase"));
        let err = password_strength("Meow12345").unwrap_err();
        assert!(err.message.contains("special"));
        let err = password_strength("MeowMeow@").unwrap_err();
        assert!(err.message.contains("number"));
    }

    #[test]
    fn test_address_and_place() {
        assert!(address_line("address_line1", "12 MG Road").is_ok());
        assert!(address_line("address_line1", "12").is_err());
        assert!(place_name("city", "New Delhi").is_ok());
        assert!(place_name("city", "D3lhi").is_err());
    }

    #[test]
    fn test_notes() {
        assert_eq!(notes("notes", None).unwrap(), None);
        assert_eq!(notes("notes", Some("   ")).unwrap(), None);
        assert_eq!(notes("notes", Some(" ring bell ")).unwrap().as_deref(), Some("ring bell"));
        assert!(notes("notes", Some(&"x".repeat(501))).is_err());
    }

    #[test]
    fn test_item_quantity() {
        assert_eq!(item_quantity(1).unwrap(), 1);
        assert_eq!(item_quantity(100).unwrap(), 100);
        assert!(item_quantity(0).is_err());
        assert!(item_quantity(101).is_err());
        assert!(item_quantity(-4).is_err());
    }

    #[test]
    fn test_slug() {
        assert!(slug("chicken-feast-500g").is_ok());
        assert!(slug("Chicken").is_err());
        assert!(slug("a--b").is_err());
        assert_eq!(slugify("Chicken & Pumpkin Feast!"), "chicken-pumpkin-feast");
    }
}
