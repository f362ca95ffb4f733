use serde::Deserialize;
use std::env;
use std::str::FromStr;

fn parse_env_or<T: FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Reads a variable, treating an empty value the same as an unset one.
fn env_non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Parse `LOCALES`. Format: comma-separated codes, e.g. `en,fr`
fn parse_locales(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app_name: String,
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub locale: LocaleConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for request bodies. Must stay above the 4 MiB upload limit
    /// so oversized images reach the handler and get a proper 400.
    pub body_limit_bytes: usize,
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Base64-encoded service-account JSON (`GOOGLE_CLOUD_KEY`).
    pub credentials: Option<String>,
    pub base_url: String,
    pub token_url: String,
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            base_url: "https://vision.googleapis.com".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            timeout_secs: 60,
        }
    }
}

/// When a locale code appears as the first path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalePrefix {
    Always,
    AsNeeded,
    Never,
}

impl FromStr for LocalePrefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "as-needed" | "as_needed" => Ok(Self::AsNeeded),
            "never" => Ok(Self::Never),
            other => Err(format!(
                "unknown locale prefix '{other}' (expected always, as-needed or never)"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocaleConfig {
    pub locales: Vec<String>,
    pub default_locale: String,
    pub prefix: LocalePrefix,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            locales: vec!["en".to_string(), "fr".to_string()],
            default_locale: "en".to_string(),
            prefix: LocalePrefix::AsNeeded,
        }
    }
}

impl LocaleConfig {
    pub fn is_supported(&self, locale: &str) -> bool {
        self.locales.iter().any(|l| l.eq_ignore_ascii_case(locale))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 shared secret for session tokens.
    pub jwt_secret: Option<String>,
    /// RS256 PEM public key for session tokens. Takes precedence over the secret.
    pub jwt_public_key: Option<String>,
    pub session_cookie: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_public_key: None,
            session_cookie: "__session".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let locale = {
            let defaults = LocaleConfig::default();
            let locales = env::var("LOCALES")
                .map(|raw| parse_locales(&raw))
                .ok()
                .filter(|l| !l.is_empty())
                .unwrap_or(defaults.locales);
            let default_locale = env_non_empty("DEFAULT_LOCALE")
                .map(|l| l.trim().to_lowercase())
                .unwrap_or(defaults.default_locale);

            let mut locales = locales;
            if !locales.contains(&default_locale) {
                tracing::warn!(
                    "DEFAULT_LOCALE '{}' is not listed in LOCALES; adding it",
                    default_locale
                );
                locales.insert(0, default_locale.clone());
            }

            LocaleConfig {
                locales,
                default_locale,
                prefix: parse_env_or("LOCALE_PREFIX", defaults.prefix),
            }
        };

        Self {
            app_name: env::var("CARDSCAN_APP_NAME")
                .unwrap_or_else(|_| "Verified-Insurances.com".to_string()),
            server: ServerConfig {
                host: env::var("CARDSCAN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("CARDSCAN_PORT", 3000),
                body_limit_bytes: parse_env_or("CARDSCAN_BODY_LIMIT", 10 * 1024 * 1024),
                static_dir: env_non_empty("STATIC_DIR"),
            },
            ocr: OcrConfig {
                credentials: env_non_empty("GOOGLE_CLOUD_KEY"),
                base_url: env::var("OCR_BASE_URL")
                    .unwrap_or_else(|_| OcrConfig::default().base_url),
                token_url: env::var("OCR_TOKEN_URL")
                    .unwrap_or_else(|_| OcrConfig::default().token_url),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 60),
            },
            locale,
            auth: AuthConfig {
                jwt_secret: env_non_empty("AUTH_JWT_SECRET"),
                jwt_public_key: env_non_empty("AUTH_JWT_PUBLIC_KEY"),
                session_cookie: env::var("AUTH_SESSION_COOKIE")
                    .unwrap_or_else(|_| "__session".to_string()),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
