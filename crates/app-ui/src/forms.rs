//! Form validation for the auth screens
//!
//! Client-side checks run before any request is made, mirroring what the
//! backend enforces: required fields, a minimum password length, a matching
//! confirmation, and the fixed-length reset code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the password reset code the backend emails out
pub const CODE_LENGTH: usize = 6;

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A single form validation failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    /// A required field was left empty
    #[error("{0} is required")]
    Required(&'static str),

    /// The email does not look like an email
    #[error("Enter a valid email address")]
    InvalidEmail,

    /// The password is too short
    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    /// Password and confirmation differ
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// The reset code is not exactly [`CODE_LENGTH`] digits
    #[error("Code must be {CODE_LENGTH} digits")]
    InvalidCode,
}

fn check_email(email: &str, errors: &mut Vec<FormError>) {
    let email = email.trim();
    if email.is_empty() {
        errors.push(FormError::Required("Email"));
    } else if !looks_like_email(email) {
        errors.push(FormError::InvalidEmail);
    }
}

fn check_password(password: &str, errors: &mut Vec<FormError>) {
    if password.is_empty() {
        errors.push(FormError::Required("Password"));
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(FormError::PasswordTooShort);
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

/// Reset code check: exactly [`CODE_LENGTH`] ASCII digits
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

// =============================================================================
// Login
// =============================================================================

/// State of the login form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginForm {
    /// Email field
    pub email: String,
    /// Password field
    pub password: String,
}

impl LoginForm {
    /// Validate the form, returning every failure at once
    pub fn validate(&self) -> Vec<FormError> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        if self.password.is_empty() {
            errors.push(FormError::Required("Password"));
        }
        errors
    }
}

// =============================================================================
// Register
// =============================================================================

/// State of the registration form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterForm {
    /// Display name field
    pub name: String,
    /// Email field
    pub email: String,
    /// Password field
    pub password: String,
    /// Password confirmation field
    pub confirm_password: String,
}

impl RegisterForm {
    /// Validate the form, returning every failure at once
    pub fn validate(&self) -> Vec<FormError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FormError::Required("Name"));
        }
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        if self.password != self.confirm_password {
            errors.push(FormError::PasswordMismatch);
        }
        errors
    }
}

// =============================================================================
// Password Reset Flow
// =============================================================================

/// Which step of the reset flow the user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResetStep {
    /// Enter the account email
    #[default]
    Email,
    /// Enter the emailed code
    Code,
    /// Pick a new password
    Password,
}

/// State machine for the three-step forgot-password screen
///
/// Each step validates its own inputs; `advance` only moves forward when the
/// current step is clean, so the screen can rely on the stored fields being
/// valid once it reaches the password step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForgotPasswordFlow {
    /// Current step
    pub step: ResetStep,
    /// Account email, filled on the first step
    pub email: String,
    /// Reset code, filled on the second step
    pub code: String,
    /// New password, filled on the last step
    pub password: String,
    /// New password confirmation
    pub confirm_password: String,
}

impl ForgotPasswordFlow {
    /// Start the flow at the email step
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the inputs of the current step
    pub fn validate(&self) -> Vec<FormError> {
        let mut errors = Vec::new();
        match self.step {
            ResetStep::Email => check_email(&self.email, &mut errors),
            ResetStep::Code => {
                if !is_valid_code(&self.code) {
                    errors.push(FormError::InvalidCode);
                }
            }
            ResetStep::Password => {
                check_password(&self.password, &mut errors);
                if self.password != self.confirm_password {
                    errors.push(FormError::PasswordMismatch);
                }
            }
        }
        errors
    }

    /// Move to the next step if the current one validates
    ///
    /// Returns the validation failures when it cannot advance. Advancing
    /// past the password step leaves the flow on the password step; the
    /// screen submits the reset request at that point.
    pub fn advance(&mut self) -> Result<ResetStep, Vec<FormError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        self.step = match self.step {
            ResetStep::Email => ResetStep::Code,
            ResetStep::Code => ResetStep::Password,
            ResetStep::Password => ResetStep::Password,
        };
        Ok(self.step)
    }

    /// Go back one step, keeping the entered values
    pub fn back(&mut self) {
        self.step = match self.step {
            ResetStep::Email | ResetStep::Code => ResetStep::Email,
            ResetStep::Password => ResetStep::Code,
        };
    }
}

// =============================================================================
// Tests
// =============================================================================
