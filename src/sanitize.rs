//! Pure helpers for redirect targets, free-text input and email display.
//!
//! The free-text sanitizer is a denylist and only a weak mitigation: it strips
//! angle brackets and `javascript:`/`data:` schemes, nothing more. Output that
//! lands in HTML still needs proper encoding at render time.

use regex::Regex;
use tracing::warn;
use url::Url;

/// Fallback target whenever a redirect cannot be proven same-origin.
pub const DEFAULT_REDIRECT: &str = "/dashboard";

/// Resolve `candidate` against `base` and return its path and query when the
/// result stays on the same origin, otherwise [`DEFAULT_REDIRECT`].
#[must_use]
pub fn restrict_redirect(candidate: &str, base: &Url) -> String {
    match base.join(candidate.trim()) {
        Ok(target) if target.origin() == base.origin() => {
            let mut location = target.path().to_string();
            if let Some(query) = target.query().filter(|query| !query.is_empty()) {
                location.push('?');
                location.push_str(query);
            }
            location
        }
        Ok(target) => {
            warn!(target = %target, "blocked redirect to external origin");
            DEFAULT_REDIRECT.to_string()
        }
        Err(err) => {
            warn!(candidate, error = %err, "invalid redirect URL");
            DEFAULT_REDIRECT.to_string()
        }
    }
}

/// Strip angle brackets and `javascript:`/`data:` schemes from user text.
///
/// Schemes are removed until none remain, so nested tricks such as
/// `javajavascript:script:` do not survive a single pass.
#[must_use]
pub fn sanitize_user_input(input: &str) -> String {
    let mut cleaned: String = input.chars().filter(|c| !matches!(c, '<' | '>')).collect();

    let Ok(schemes) = Regex::new(r"(?i)javascript:|data:") else {
        return cleaned.trim().to_string();
    };
    while schemes.is_match(&cleaned) {
        cleaned = schemes.replace_all(&cleaned, "").into_owned();
    }

    cleaned.trim().to_string()
}

/// Mask the local part of an email, keeping only its first and last character.
///
/// Local parts of one or two characters keep the first character followed by a
/// single `*`. Strings without a usable `local@domain` shape are returned as-is.
#[must_use]
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return email.to_string();
    };
    let chars: Vec<char> = local.chars().collect();
    let (Some(first), Some(last)) = (chars.first(), chars.last()) else {
        return email.to_string();
    };
    if domain.is_empty() {
        return email.to_string();
    }

    let masked = if chars.len() > 2 {
        format!("{first}{}{last}", "*".repeat(chars.len() - 2))
    } else {
        format!("{first}*")
    };

    format!("{masked}@{domain}")
}
