//! Visitor contact inquiries.

use serde::Deserialize;

use super::error::ValidationErrors;

pub const NAME_MAX: usize = 100;
pub const EMAIL_MAX: usize = 120;
pub const MOBILE_MAX: usize = 20;
pub const MESSAGE_MAX: usize = 2000;

/// Inquiry as submitted by a visitor, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InquiryForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Inquiry that passed validation; text is trimmed and the email lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub message: String,
}

impl InquiryForm {
    pub fn validate(&self) -> Result<NewInquiry, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", self.name.as_deref(), NAME_MAX);
        let mobile = required_text(&mut errors, "mobile", self.mobile.as_deref(), MOBILE_MAX);
        let message = required_text(&mut errors, "message", self.message.as_deref(), MESSAGE_MAX);
        let email = required_text(&mut errors, "email", self.email.as_deref(), EMAIL_MAX)
            .map(|email| email.to_lowercase());

        if let Some(email) = &email
            && !looks_like_email(email)
        {
            errors.push("email", "must be a valid email address");
        }

        match (name, email, mobile, message) {
            (Some(name), Some(email), Some(mobile), Some(message)) if errors.is_empty() => {
                Ok(NewInquiry {
                    name,
                    email,
                    mobile,
                    message,
                })
            }
            _ => Err(errors),
        }
    }
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Option<String> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        errors.push(field, "is required");
        return None;
    }
    if value.chars().count() > max {
        errors.push(field, format!("must be at most {max} characters"));
        return None;
    }
    Some(value.to_string())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
