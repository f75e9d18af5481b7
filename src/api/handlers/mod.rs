pub mod auth;
pub mod contact;
pub mod health;
pub mod password;

use regex::Regex;

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}
