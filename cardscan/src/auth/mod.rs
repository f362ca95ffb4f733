//! Authentication: session verification and the sign-in redirect target for
//! protected pages.

mod session;

use regex::Regex;
use std::sync::OnceLock;

pub use session::{SessionClaims, SessionVerifier};

use crate::config::LocaleConfig;

/// The signed-in user attached to a request by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub session_id: Option<String>,
}

/// `/<segment>/dashboard...` with exactly one leading segment.
fn locale_segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^/([^/]+)/dashboard").expect("valid regex"))
}

/// Sign-in URL for an unauthenticated request to a protected path.
///
/// The locale segment in front of `/dashboard` is kept when it is a configured
/// locale (`/fr/dashboard` goes to `/fr/sign-in`). Any other shape falls back
/// to the default-locale `/sign-in`.
pub fn sign_in_url(path: &str, locales: &LocaleConfig) -> String {
    let locale = locale_segment_pattern()
        .captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|segment| locales.is_supported(segment));

    match locale {
        Some(locale) => format!("/{}/sign-in", locale.to_lowercase()),
        None => "/sign-in".to_string(),
    }
}
