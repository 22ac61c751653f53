//! Input validation utilities
//!
//! These checks run before any request is sent; a failure never reaches
//! the network.

use regex::Regex;
use std::sync::OnceLock;

/// Shortest search term that triggers a request
pub const MIN_SEARCH_TERM: usize = 3;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    let username = username.trim();
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() > 150 {
        return Err("Username must be at most 150 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(
            "Username can only contain letters, numbers and the characters @ . + - _".to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password for a new account
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate a Chilean national id (RUT), with or without dots
pub fn validate_national_id(national_id: &str) -> Result<(), String> {
    let national_id = national_id.trim();
    if national_id.is_empty() {
        return Err("National id (RUT) is required".to_string());
    }

    if national_id.len() > 12 {
        return Err("National id (RUT) must be at most 12 characters long".to_string());
    }

    static RUT_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = RUT_REGEX.get_or_init(|| {
        Regex::new(r"^\d{1,2}(\.?\d{3}){2}-?[\dkK]$|^\d{1,8}-?[\dkK]$")
            .expect("Failed to compile RUT regex")
    });

    if !regex.is_match(national_id) {
        return Err("Invalid national id (RUT) format".to_string());
    }

    Ok(())
}

/// Validate login credentials; only presence is checked
pub fn validate_credentials(username: &str, password: &str) -> Result<(), String> {
    if username.trim().is_empty() || password.is_empty() {
        return Err("Username and password are required".to_string());
    }

    Ok(())
}

/// Validate band name
pub fn validate_band_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Band name is required".to_string());
    }

    if name.chars().count() > 100 {
        return Err("Band name must be at most 100 characters long".to_string());
    }

    Ok(())
}

/// Normalised search term, or `None` when it is too short to search for
pub fn search_term(term: &str) -> Option<&str> {
    let term = term.trim();
    (term.chars().count() >= MIN_SEARCH_TERM).then_some(term)
}
