//! Field constraints for the sign-in and sign-up forms.
//!
//! Both forms implement [`validator::Validate`] by hand so every rule reports
//! its own message, in a fixed order, against the field the user has to fix.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors, ValidationErrorsKind};

pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 50;
pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 20;

const MSG_EMAIL_FORMAT: &str = "Please enter a valid email address";
const MSG_EMAIL_REQUIRED: &str = "Email is required";
const MSG_PASSWORD_SHORT: &str = "Password must be at least 8 characters";
const MSG_PASSWORD_LONG: &str = "Password is too long";
const MSG_PASSWORD_UPPER: &str = "Must contain at least one uppercase letter";
const MSG_PASSWORD_LOWER: &str = "Must contain at least one lowercase letter";
const MSG_PASSWORD_DIGIT: &str = "Must contain at least one number";
const MSG_USERNAME_SHORT: &str = "Username must be at least 3 characters";
const MSG_USERNAME_LONG: &str = "Username is too long";
const MSG_USERNAME_CHARSET: &str = "Only letters, numbers and underscores allowed";
const MSG_CONFIRM_REQUIRED: &str = "Please confirm your password";
const MSG_CONFIRM_MISMATCH: &str = "Passwords don't match";

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("username pattern compiles"));

/// Input fields across both forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Username,
    Email,
    Password,
    ConfirmPassword,
}

impl Field {
    /// Key used in [`ValidationErrors`].
    pub fn name(self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirm_password",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Username => "Username",
            Field::Email => "Email",
            Field::Password => "Password",
            Field::ConfirmPassword => "Confirm Password",
        }
    }

    /// Whether the value should be masked unless visibility is toggled on.
    pub fn is_secret(self) -> bool {
        matches!(self, Field::Password | Field::ConfirmPassword)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Common access to a form's values, used by the controller and the UIs.
pub trait FormFields: Validate + Default + Clone {
    /// Fields in display order.
    fn fields() -> &'static [Field];

    fn value(&self, field: Field) -> &str;

    /// Sets a field value. Fields the form doesn't have are ignored.
    fn set(&mut self, field: Field, value: String);

    /// Runs validation and wraps the outcome.
    fn violations(&self) -> Violations {
        match self.validate() {
            Ok(()) => Violations::default(),
            Err(errors) => Violations(errors),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Validate for SignInForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, &self.email);
        check_password_length(&mut errors, &self.password);
        into_result(errors)
    }
}

impl Validate for SignUpForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_username(&mut errors, &self.username);
        check_email(&mut errors, &self.email);
        check_password_length(&mut errors, &self.password);
        check_password_composition(&mut errors, &self.password);
        check_confirmation(&mut errors, &self.password, &self.confirm_password);
        into_result(errors)
    }
}

impl FormFields for SignInForm {
    fn fields() -> &'static [Field] {
        &[Field::Email, Field::Password]
    }

    fn value(&self, field: Field) -> &str {
        match field {
            Field::Email => &self.email,
            Field::Password => &self.password,
            Field::Username | Field::ConfirmPassword => "",
        }
    }

    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Email => self.email = value,
            Field::Password => self.password = value,
            Field::Username | Field::ConfirmPassword => {}
        }
    }
}

impl FormFields for SignUpForm {
    fn fields() -> &'static [Field] {
        &[
            Field::Username,
            Field::Email,
            Field::Password,
            Field::ConfirmPassword,
        ]
    }

    fn value(&self, field: Field) -> &str {
        match field {
            Field::Username => &self.username,
            Field::Email => &self.email,
            Field::Password => &self.password,
            Field::ConfirmPassword => &self.confirm_password,
        }
    }

    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Username => self.username = value,
            Field::Email => self.email = value,
            Field::Password => self.password = value,
            Field::ConfirmPassword => self.confirm_password = value,
        }
    }
}

/// Per-field violation messages. Empty means the form is valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Violations(ValidationErrors);

impl Default for Violations {
    fn default() -> Self {
        Self(ValidationErrors::new())
    }
}

impl Violations {
    pub fn is_empty(&self) -> bool {
        self.0.errors().is_empty()
    }

    /// Messages for one field, in the order the rules ran.
    pub fn for_field(&self, field: Field) -> Vec<&str> {
        match self.0.errors().get(field.name()) {
            Some(ValidationErrorsKind::Field(list)) => list
                .iter()
                .filter_map(|error| error.message.as_deref())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// First message for a field, as shown inline under the input.
    pub fn first(&self, field: Field) -> Option<&str> {
        self.for_field(field).into_iter().next()
    }

    /// `(field, message)` pairs for the given field order.
    pub fn lines<'a>(&'a self, order: &'a [Field]) -> impl Iterator<Item = (Field, &'a str)> + 'a {
        order
            .iter()
            .flat_map(move |field| self.for_field(*field).into_iter().map(move |m| (*field, m)))
    }

    pub fn into_inner(self) -> ValidationErrors {
        self.0
    }
}

fn violation(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn into_result(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if !is_email_shaped(email) {
        errors.add(Field::Email.name(), violation("email", MSG_EMAIL_FORMAT));
    }
    if email.is_empty() {
        errors.add(Field::Email.name(), violation("required", MSG_EMAIL_REQUIRED));
    }
}

/// RFC-shaped address whose domain has a dot and an alphabetic TLD.
fn is_email_shaped(email: &str) -> bool {
    if email.is_empty() || !email.validate_email() {
        return false;
    }
    let Some((_, domain)) = email.rsplit_once('@') else {
        return false;
    };
    match domain.rsplit_once('.') {
        Some((host, tld)) => {
            !host.is_empty() && tld.chars().count() >= 2 && tld.chars().all(char::is_alphabetic)
        }
        None => false,
    }
}

fn check_password_length(errors: &mut ValidationErrors, password: &str) {
    let len = password.chars().count();
    if len < PASSWORD_MIN_CHARS {
        errors.add(Field::Password.name(), violation("length", MSG_PASSWORD_SHORT));
    }
    if len > PASSWORD_MAX_CHARS {
        errors.add(Field::Password.name(), violation("length", MSG_PASSWORD_LONG));
    }
}

fn check_password_composition(errors: &mut ValidationErrors, password: &str) {
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.add(Field::Password.name(), violation("uppercase", MSG_PASSWORD_UPPER));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.add(Field::Password.name(), violation("lowercase", MSG_PASSWORD_LOWER));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.add(Field::Password.name(), violation("digit", MSG_PASSWORD_DIGIT));
    }
}

fn check_username(errors: &mut ValidationErrors, username: &str) {
    let len = username.chars().count();
    if len < USERNAME_MIN_CHARS {
        errors.add(Field::Username.name(), violation("length", MSG_USERNAME_SHORT));
    }
    if len > USERNAME_MAX_CHARS {
        errors.add(Field::Username.name(), violation("length", MSG_USERNAME_LONG));
    }
    if !USERNAME_PATTERN.is_match(username) {
        errors.add(Field::Username.name(), violation("pattern", MSG_USERNAME_CHARSET));
    }
}

fn check_confirmation(errors: &mut ValidationErrors, password: &str, confirm: &str) {
    if confirm.is_empty() {
        errors.add(
            Field::ConfirmPassword.name(),
            violation("required", MSG_CONFIRM_REQUIRED),
        );
    }
    if password != confirm {
        errors.add(
            Field::ConfirmPassword.name(),
            violation("mismatch", MSG_CONFIRM_MISMATCH),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(username: &str, email: &str, password: &str, confirm: &str) -> SignUpForm {
        SignUpForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    fn sign_in(email: &str, password: &str) -> SignInForm {
        SignInForm {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_valid_forms_have_no_violations() {
        assert!(sign_in("ada@example.com", "whatever1").violations().is_empty());
        assert!(
            sign_up("valid_user1", "ada@example.com", "Abcdefg1", "Abcdefg1")
                .violations()
                .is_empty()
        );
    }

    #[test]
    fn test_malformed_email_rejected_on_both_tabs() {
        for email in ["ada", "ada@", "ada@example", "@example.com", "ada@example.c"] {
            let v = sign_in(email, "password1").violations();
            assert_eq!(v.for_field(Field::Email), vec![MSG_EMAIL_FORMAT], "{email}");

            let v = sign_up("ada", email, "Abcdefg1", "Abcdefg1").violations();
            assert_eq!(v.for_field(Field::Email), vec![MSG_EMAIL_FORMAT], "{email}");
        }
    }

    #[test]
    fn test_empty_email_reports_format_then_required() {
        let v = sign_in("", "password1").violations();
        assert_eq!(
            v.for_field(Field::Email),
            vec![MSG_EMAIL_FORMAT, MSG_EMAIL_REQUIRED]
        );
    }

    #[test]
    fn test_password_length_bounds_on_both_tabs() {
        let short = "Abc1";
        let long = format!("Ab1{}", "x".repeat(48));
        assert_eq!(long.chars().count(), 51);

        assert_eq!(
            sign_in("a@b.io", short).violations().for_field(Field::Password),
            vec![MSG_PASSWORD_SHORT]
        );
        assert_eq!(
            sign_in("a@b.io", &long).violations().for_field(Field::Password),
            vec![MSG_PASSWORD_LONG]
        );
        assert_eq!(
            sign_up("ada", "a@b.io", short, short)
                .violations()
                .first(Field::Password),
            Some(MSG_PASSWORD_SHORT)
        );
        assert_eq!(
            sign_up("ada", "a@b.io", &long, &long)
                .violations()
                .first(Field::Password),
            Some(MSG_PASSWORD_LONG)
        );
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // 8 chars, 16 bytes.
        let password = "Ää1ääääb";
        assert_eq!(password.chars().count(), 8);
        assert!(sign_in("a@b.io", password).violations().is_empty());
    }

    #[test]
    fn test_password_composition() {
        let v = sign_up("ada", "a@b.io", "abcdefgh", "abcdefgh").violations();
        assert_eq!(
            v.for_field(Field::Password),
            vec![MSG_PASSWORD_UPPER, MSG_PASSWORD_DIGIT]
        );

        let v = sign_up("ada", "a@b.io", "Abcdefg1", "Abcdefg1").violations();
        assert!(v.for_field(Field::Password).is_empty());

        let v = sign_up("ada", "a@b.io", "", "").violations();
        assert_eq!(
            v.for_field(Field::Password),
            vec![
                MSG_PASSWORD_SHORT,
                MSG_PASSWORD_UPPER,
                MSG_PASSWORD_LOWER,
                MSG_PASSWORD_DIGIT
            ]
        );
    }

    #[test]
    fn test_sign_in_does_not_check_composition() {
        assert!(sign_in("a@b.io", "abcdefgh").violations().is_empty());
    }

    #[test]
    fn test_confirm_mismatch_lands_on_confirm_field() {
        let v = sign_up("ada", "a@b.io", "Abcdefg1", "Abcdefg2").violations();
        assert!(v.for_field(Field::Password).is_empty());
        assert_eq!(v.for_field(Field::ConfirmPassword), vec![MSG_CONFIRM_MISMATCH]);

        let v = sign_up("ada", "a@b.io", "Abcdefg1", "").violations();
        assert_eq!(
            v.for_field(Field::ConfirmPassword),
            vec![MSG_CONFIRM_REQUIRED, MSG_CONFIRM_MISMATCH]
        );
    }

    #[test]
    fn test_username_rules() {
        let check = |name: &str| {
            sign_up(name, "a@b.io", "Abcdefg1", "Abcdefg1")
                .violations()
                .for_field(Field::Username)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        assert_eq!(check("ab"), vec![MSG_USERNAME_SHORT]);
        assert!(check("valid_user1").is_empty());
        assert_eq!(check("bad name!"), vec![MSG_USERNAME_CHARSET]);
        assert_eq!(check(&"a".repeat(21)), vec![MSG_USERNAME_LONG]);
        assert_eq!(check(""), vec![MSG_USERNAME_SHORT, MSG_USERNAME_CHARSET]);
    }

    #[test]
    fn test_lines_follow_field_order() {
        let v = sign_up("ab", "nope", "Abcdefg1", "x").violations();
        let lines: Vec<_> = v.lines(SignUpForm::fields()).collect();
        assert_eq!(
            lines,
            vec![
                (Field::Username, MSG_USERNAME_SHORT),
                (Field::Email, MSG_EMAIL_FORMAT),
                (Field::ConfirmPassword, MSG_CONFIRM_MISMATCH),
            ]
        );
    }

    #[test]
    fn test_set_ignores_fields_the_form_lacks() {
        let mut form = SignInForm::default();
        form.set(Field::Username, "ada".to_string());
        form.set(Field::Email, "ada@example.com".to_string());
        assert_eq!(form.value(Field::Username), "");
        assert_eq!(form.value(Field::Email), "ada@example.com");
    }
}
