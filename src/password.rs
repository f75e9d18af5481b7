//! Password complexity rules and the illustrative breach denylist.

use serde::Serialize;
use utoipa::ToSchema;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Symbols that satisfy the "special character" requirement.
pub const SPECIAL_CHARACTERS: &str = r#"!@#$%^&*()_+-=[]{};':"\|,.<>/?"#;

/// Stand-in for a real breach-credential service; matched case-insensitively.
const COMMON_BREACHED_PASSWORDS: [&str; 9] = [
    "password",
    "123456",
    "password123",
    "admin",
    "qwerty",
    "letmein",
    "welcome",
    "monkey",
    "1234567890",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PasswordRequirements {
    pub length: bool,
    pub uppercase: bool,
    pub lowercase: bool,
    pub number: bool,
    pub special: bool,
}

impl PasswordRequirements {
    #[must_use]
    pub const fn all_met(&self) -> bool {
        self.length && self.uppercase && self.lowercase && self.number && self.special
    }

    /// Human-readable names of the unmet requirements, in display order.
    fn missing(&self) -> Vec<&'static str> {
        [
            (self.length, "at least 8 characters"),
            (self.uppercase, "an uppercase letter"),
            (self.lowercase, "a lowercase letter"),
            (self.number, "a number"),
            (self.special, "a special character"),
        ]
        .into_iter()
        .filter_map(|(met, label)| (!met).then_some(label))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordValidation {
    pub is_valid: bool,
    /// Empty when the password is valid.
    pub message: String,
    pub requirements: PasswordRequirements,
}

#[must_use]
pub fn validate_password(password: &str) -> PasswordValidation {
    let requirements = PasswordRequirements {
        length: password.chars().count() >= MIN_PASSWORD_LENGTH,
        uppercase: password.chars().any(|c| c.is_ascii_uppercase()),
        lowercase: password.chars().any(|c| c.is_ascii_lowercase()),
        number: password.chars().any(|c| c.is_ascii_digit()),
        special: password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
    };

    let is_valid = requirements.all_met();
    let message = if is_valid {
        String::new()
    } else {
        format!("Password must contain {}", requirements.missing().join(", "))
    };

    PasswordValidation {
        is_valid,
        message,
        requirements,
    }
}

/// Check the password against the static denylist of common passwords.
#[must_use]
pub fn is_breached_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_BREACHED_PASSWORDS.contains(&lowered.as_str())
}
