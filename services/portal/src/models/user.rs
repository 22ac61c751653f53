//! User model and related payloads

use serde::{Deserialize, Serialize};

use super::{Band, Id};

/// Email domain of university accounts
pub const UDP_EMAIL_DOMAIN: &str = "mail.udp.cl";

/// User entity as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// Whether the account belongs to a university student
    #[serde(rename = "is_udp", default)]
    pub is_udp_affiliated: bool,
    /// Chilean national id (RUT)
    #[serde(rename = "ruf", default)]
    pub national_id: String,
    #[serde(default)]
    pub current_band: Option<Band>,
}

impl User {
    /// A user known only by its id
    pub fn from_id(id: Id) -> Self {
        Self {
            id,
            username: String::new(),
            email: String::new(),
            is_udp_affiliated: false,
            national_id: String::new(),
            current_band: None,
        }
    }
}

/// User login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// New account registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    #[serde(rename = "ruf")]
    pub national_id: String,
    pub password: String,
    #[serde(rename = "is_udp")]
    pub is_udp_affiliated: bool,
}

impl Registration {
    /// Build a registration, deriving UDP affiliation from the email
    pub fn new(username: &str, email: &str, national_id: &str, password: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            national_id: national_id.trim().to_string(),
            password: password.to_string(),
            is_udp_affiliated: is_udp_email(email.trim()),
        }
    }
}

/// True for addresses of exactly the form `local@mail.udp.cl`
pub fn is_udp_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    parts.len() == 2 && parts[1] == UDP_EMAIL_DOMAIN
}
