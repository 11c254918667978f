//! Input validation for member-facing forms.
//!
//! Every validator collects all field errors before failing; the first
//! error's message doubles as the headline.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 72;
const EMAIL_MAX_LEN: usize = 254;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        Self {
            fields: vec![FieldError::new(field, message)],
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        self.fields
            .first()
            .map_or("validation failed", |f| f.message.as_str())
    }

    pub(crate) fn check(fields: Vec<FieldError>) -> Result<(), Self> {
        if fields.is_empty() {
            Ok(())
        } else {
            Err(Self { fields })
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ValidationError {}

pub(crate) fn check_len(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    if len < min {
        if min == 1 {
            errors.push(FieldError::new(field, format!("{field} is required")));
        } else {
            errors.push(FieldError::new(
                field,
                format!("{field} must be at least {min} characters"),
            ));
        }
    } else if len > max {
        errors.push(FieldError::new(
            field,
            format!("{field} must be at most {max} characters"),
        ));
    }
}

/// Trims and turns blank strings into `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn email_error(raw: &str) -> Result<String, FieldError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(FieldError::new("email", "email is required"));
    }
    if email.chars().count() > EMAIL_MAX_LEN {
        return Err(FieldError::new(
            "email",
            format!("email must be at most {EMAIL_MAX_LEN} characters"),
        ));
    }
    let invalid = || FieldError::new("email", "email address is not valid");
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(email)
}

fn password_error(field: &str, password: &str) -> Option<FieldError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Some(FieldError::new(
            field,
            format!("password must be at least {PASSWORD_MIN_LEN} characters"),
        ));
    }
    if len > PASSWORD_MAX_LEN {
        return Some(FieldError::new(
            field,
            format!("password must be at most {PASSWORD_MAX_LEN} characters"),
        ));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Some(FieldError::new(
            field,
            "password must contain both letters and digits",
        ));
    }
    None
}

/// Returns the normalised (trimmed, lower-cased) address.
pub fn validate_email(raw: &str) -> Result<String, ValidationError> {
    email_error(raw).map_err(|e| ValidationError { fields: vec![e] })
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    match password_error("password", password) {
        Some(e) => Err(ValidationError { fields: vec![e] }),
        None => Ok(()),
    }
}

pub fn validate_ref_code(raw: &str) -> Result<String, ValidationError> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(ValidationError::single("ref", "invite code is required"));
    }
    Ok(code.to_string())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignUpInput {
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub password: String,
    pub question: String,
    #[serde(rename = "ref")]
    pub ref_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub screening_answer: String,
    pub ref_code: String,
}

impl SignUpInput {
    pub fn validate(self) -> Result<SignUp, ValidationError> {
        let mut errors = Vec::new();
        let last_name = self.last_name.trim();
        let first_name = self.first_name.trim();
        check_len(&mut errors, "last_name", last_name, 1, 50);
        check_len(&mut errors, "first_name", first_name, 1, 50);
        let email = email_error(&self.email).map_err(|e| errors.push(e)).ok();
        if let Some(e) = password_error("password", &self.password) {
            errors.push(e);
        }
        let question = self.question.trim();
        check_len(&mut errors, "question", question, 10, 1000);
        let ref_code = self.ref_code.trim();
        if ref_code.is_empty() {
            errors.push(FieldError::new("ref", "invite code is required"));
        }
        ValidationError::check(errors)?;
        Ok(SignUp {
            display_name: format!("{last_name} {first_name}"),
            email: email.unwrap_or_default(),
            password: self.password,
            screening_answer: question.to_string(),
            ref_code: ref_code.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignIn {
    pub email: String,
    pub password: String,
}

impl SignInInput {
    pub fn validate(self) -> Result<SignIn, ValidationError> {
        let mut errors = Vec::new();
        let email = email_error(&self.email).map_err(|e| errors.push(e)).ok();
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "password is required"));
        }
        ValidationError::check(errors)?;
        Ok(SignIn {
            email: email.unwrap_or_default(),
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordInput {
    pub fn validate(self) -> Result<ChangePassword, ValidationError> {
        let mut errors = Vec::new();
        if self.current_password.is_empty() {
            errors.push(FieldError::new(
                "current_password",
                "current password is required",
            ));
        }
        if let Some(e) = password_error("new_password", &self.new_password) {
            errors.push(e);
        }
        if self.confirm_password != self.new_password {
            errors.push(FieldError::new(
                "confirm_password",
                "passwords do not match",
            ));
        }
        if !self.current_password.is_empty() && self.current_password == self.new_password {
            errors.push(FieldError::new(
                "new_password",
                "new password must differ from the current one",
            ));
        }
        ValidationError::check(errors)?;
        Ok(ChangePassword {
            current_password: self.current_password,
            new_password: self.new_password,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScreeningAnswerInput {
    pub answer: String,
}

impl ScreeningAnswerInput {
    pub fn validate(self) -> Result<String, ValidationError> {
        let mut errors = Vec::new();
        let answer = self.answer.trim();
        check_len(&mut errors, "answer", answer, 1, 1000);
        ValidationError::check(errors)?;
        Ok(answer.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedbackInput {
    pub message: String,
}

impl FeedbackInput {
    pub fn validate(self) -> Result<String, ValidationError> {
        let mut errors = Vec::new();
        let message = self.message.trim();
        check_len(&mut errors, "message", message, 1, 2000);
        ValidationError::check(errors)?;
        Ok(message.to_string())
    }
}
