//! Form validation.
//!
//! Every mutating flow validates its raw form input before any remote
//! call, collecting all field errors in one pass so a form can surface
//! every problem at once. Validated forms convert into the typed values
//! the commerce clients take.

use std::collections::BTreeMap;

use bookstall_core::Email;
use chrono::{Datelike, NaiveDate, Utc};
use secrecy::SecretString;

const NAME_MAX: usize = 20;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 20;
const STREET_MAX: usize = 100;
const POSTCODE_LEN: usize = 6;
const AGE_MIN: u32 = 13;
const AGE_MAX: u32 = 125;

/// Per-field validation failures, keyed by form field name.
#[derive(Debug, Default, Clone, thiserror::Error)]
#[error("validation failed for {} field(s)", fields.len())]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

fn check_email(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<Email> {
    match Email::parse(raw.trim()) {
        Ok(email) => Some(email),
        Err(e) => {
            errors.add(field, e.to_string());
            None
        }
    }
}

fn check_name(errors: &mut ValidationErrors, field: &str, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.add(field, "must not be empty");
    } else if trimmed.chars().count() > NAME_MAX {
        errors.add(field, format!("must be at most {NAME_MAX} characters"));
    } else if !trimmed.chars().all(char::is_alphabetic) {
        errors.add(field, "must contain only letters");
    }
}

fn check_password(errors: &mut ValidationErrors, field: &str, raw: &str) {
    if raw != raw.trim() {
        errors.add(field, "must not start or end with whitespace");
    }
    let len = raw.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        errors.add(
            field,
            format!("must be {PASSWORD_MIN} to {PASSWORD_MAX} characters"),
        );
    }
    if !raw.chars().any(char::is_uppercase) {
        errors.add(field, "must contain an uppercase letter");
    }
    if !raw.chars().any(char::is_lowercase) {
        errors.add(field, "must contain a lowercase letter");
    }
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        errors.add(field, "must contain a digit");
    }
}

/// Whole years elapsed between `born` and `today`.
fn age_on(born: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    u32::try_from(age).unwrap_or(0)
}

fn check_date_of_birth(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<NaiveDate> {
    let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") else {
        errors.add(field, "must be a valid date (YYYY-MM-DD)");
        return None;
    };
    let age = age_on(date, Utc::now().date_naive());
    if !(AGE_MIN..=AGE_MAX).contains(&age) {
        errors.add(field, format!("age must be between {AGE_MIN} and {AGE_MAX}"));
        return None;
    }
    Some(date)
}

fn check_street(errors: &mut ValidationErrors, field: &str, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.add(field, "must not be empty");
    } else if trimmed.chars().count() > STREET_MAX {
        errors.add(field, format!("must be at most {STREET_MAX} characters"));
    }
}

fn check_postcode(errors: &mut ValidationErrors, field: &str, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.chars().count() != POSTCODE_LEN || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, format!("must be exactly {POSTCODE_LEN} digits"));
    }
}

fn check_city(errors: &mut ValidationErrors, field: &str, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.add(field, "must not be empty");
    } else if !trimmed
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '-')
    {
        errors.add(field, "must contain only letters");
    }
}

fn check_country(errors: &mut ValidationErrors, field: &str, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_uppercase()) {
        errors.add(field, "must be a two-letter country code");
    }
}

/// Raw login form input.
#[derive(Debug, Default, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Validated login credentials.
pub struct Credentials {
    pub email: Email,
    pub password: SecretString,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns every field failure at once.
    pub fn validate(&self) -> Result<Credentials, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let email = check_email(&mut errors, "email", &self.email);
        if self.password.is_empty() {
            errors.add("password", "must not be empty");
        }
        match email {
            Some(email) if errors.is_empty() => Ok(Credentials {
                email,
                password: SecretString::from(self.password.clone()),
            }),
            _ => Err(errors),
        }
    }
}

/// Raw address form input, including the shipping/billing role checkboxes.
#[derive(Debug, Default, Clone)]
pub struct AddressForm {
    pub street_name: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub shipping: bool,
    pub billing: bool,
    pub shipping_default: bool,
    pub billing_default: bool,
}

/// Validated address fields plus the desired role.
#[derive(Debug)]
pub struct ValidAddress {
    pub street_name: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub shipping: bool,
    pub billing: bool,
    pub shipping_default: bool,
    pub billing_default: bool,
}

impl AddressForm {
    /// # Errors
    ///
    /// Returns every field failure at once. A default flag without its
    /// role flag is a failure; a default only makes sense for an address
    /// that holds the role.
    pub fn validate(&self) -> Result<ValidAddress, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_street(&mut errors, "streetName", &self.street_name);
        check_postcode(&mut errors, "postalCode", &self.postal_code);
        check_city(&mut errors, "city", &self.city);
        check_country(&mut errors, "country", &self.country);
        if self.shipping_default && !self.shipping {
            errors.add("shippingDefault", "requires the shipping role");
        }
        if self.billing_default && !self.billing {
            errors.add("billingDefault", "requires the billing role");
        }
        errors.into_result(ValidAddress {
            street_name: self.street_name.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            city: self.city.trim().to_string(),
            country: self.country.trim().to_string(),
            shipping: self.shipping,
            billing: self.billing,
            shipping_default: self.shipping_default,
            billing_default: self.billing_default,
        })
    }
}

/// Raw registration form input.
#[derive(Debug, Default, Clone)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub address: AddressForm,
}

/// Validated registration data.
#[derive(Debug)]
pub struct ValidRegistration {
    pub email: Email,
    pub password: SecretString,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub address: ValidAddress,
}

impl RegisterForm {
    /// # Errors
    ///
    /// Returns every field failure at once, address fields included.
    pub fn validate(&self) -> Result<ValidRegistration, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let email = check_email(&mut errors, "email", &self.email);
        check_password(&mut errors, "password", &self.password);
        check_name(&mut errors, "firstName", &self.first_name);
        check_name(&mut errors, "lastName", &self.last_name);
        let dob = check_date_of_birth(&mut errors, "dateOfBirth", &self.date_of_birth);
        let address = match self.address.validate() {
            Ok(address) => Some(address),
            Err(address_errors) => {
                for (field, messages) in address_errors.fields {
                    errors.fields.entry(field).or_default().extend(messages);
                }
                None
            }
        };
        match (email, dob, address) {
            (Some(email), Some(date_of_birth), Some(address)) if errors.is_empty() => {
                Ok(ValidRegistration {
                    email,
                    password: SecretString::from(self.password.clone()),
                    first_name: self.first_name.trim().to_string(),
                    last_name: self.last_name.trim().to_string(),
                    date_of_birth,
                    address,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Raw profile edit form input.
#[derive(Debug, Default, Clone)]
pub struct ProfileForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
}

/// Validated profile fields.
pub struct ValidProfile {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
}

impl ProfileForm {
    /// # Errors
    ///
    /// Returns every field failure at once.
    pub fn validate(&self) -> Result<ValidProfile, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let email = check_email(&mut errors, "email", &self.email);
        check_name(&mut errors, "firstName", &self.first_name);
        check_name(&mut errors, "lastName", &self.last_name);
        let dob = check_date_of_birth(&mut errors, "dateOfBirth", &self.date_of_birth);
        match (email, dob) {
            (Some(email), Some(date_of_birth)) if errors.is_empty() => Ok(ValidProfile {
                email,
                first_name: self.first_name.trim().to_string(),
                last_name: self.last_name.trim().to_string(),
                date_of_birth,
            }),
            _ => Err(errors),
        }
    }
}

/// Raw password change form input.
#[derive(Debug, Default, Clone)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
}

/// Validated password change.
pub struct ValidPasswordChange {
    pub current: SecretString,
    pub new: SecretString,
}

impl PasswordForm {
    /// # Errors
    ///
    /// Returns every field failure at once. Only the new password is held
    /// to the strength rules; the current one merely has to be present.
    pub fn validate(&self) -> Result<ValidPasswordChange, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.current_password.is_empty() {
            errors.add("currentPassword", "must not be empty");
        }
        check_password(&mut errors, "newPassword", &self.new_password);
        errors.into_result(ValidPasswordChange {
            current: SecretString::from(self.current_password.clone()),
            new: SecretString::from(self.new_password.clone()),
        })
    }
}
