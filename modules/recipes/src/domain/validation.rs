//! Field-level input checks. Messages are collected per field so a client
//! sees every problem of a request at once.

use rust_decimal::Decimal;

use crate::domain::error::{DomainError, FieldError};

pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_BOOLEAN: &str = "Must be a valid boolean.";

const PRICE_MAX_WHOLE_DIGITS: u32 = 3;
const PRICE_DECIMAL_PLACES: u32 = 2;

#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn finish(self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation(self.0))
        }
    }
}

/// Lower-case the whole address and drop surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !local.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Non-blank text of at most `max_len` characters.
pub fn check_text(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) {
    if value.trim().is_empty() {
        errors.add(field, BLANK);
    } else if value.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_len} characters."),
        );
    }
}

/// Like [`check_text`], but blank is allowed.
pub fn check_optional_text(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) {
    if value.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_len} characters."),
        );
    }
}

pub fn check_email(errors: &mut FieldErrors, value: &str, max_len: usize) {
    let value = value.trim();
    if value.is_empty() {
        errors.add("email", BLANK);
    } else if value.chars().count() > max_len {
        errors.add(
            "email",
            format!("Ensure this field has no more than {max_len} characters."),
        );
    } else if !is_valid_email(value) {
        errors.add("email", INVALID_EMAIL);
    }
}

pub fn check_password(errors: &mut FieldErrors, value: &str, min_len: usize) {
    if value.is_empty() {
        errors.add("password", BLANK);
    } else if value.chars().count() < min_len {
        errors.add(
            "password",
            format!("Ensure this field has at least {min_len} characters."),
        );
    }
}

pub fn check_time_minutes(errors: &mut FieldErrors, value: i32) {
    if value < 0 {
        errors.add(
            "time_minutes",
            "Ensure this value is greater than or equal to 0.",
        );
    }
}

/// At most five digits in total, two of them after the point.
pub fn check_price(errors: &mut FieldErrors, value: Decimal) {
    if value.normalize().scale() > PRICE_DECIMAL_PLACES {
        errors.add(
            "price",
            format!("Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."),
        );
    } else if value.abs() >= Decimal::from(10i64.pow(PRICE_MAX_WHOLE_DIGITS)) {
        errors.add(
            "price",
            format!(
                "Ensure that there are no more than {PRICE_MAX_WHOLE_DIGITS} digits before the decimal point."
            ),
        );
    }
}

/// Query flag: `1/true/yes/on` and `0/false/no/off`, case-insensitive.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
