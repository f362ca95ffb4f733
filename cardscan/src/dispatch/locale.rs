//! Locale negotiation.
//!
//! A locale in the first path segment wins. Otherwise the `NEXT_LOCALE`
//! cookie, then `Accept-Language`, then the default locale. The prefix policy
//! decides whether the URL has to be rewritten with a redirect.

use axum::http::{header, HeaderMap};
use axum_extra::extract::CookieJar;

use crate::config::{LocaleConfig, LocalePrefix};

pub const LOCALE_COOKIE: &str = "NEXT_LOCALE";

/// Locale chosen for a request, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocale(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocaleDecision {
    Continue { locale: String },
    Redirect { location: String, locale: String },
}

impl LocaleDecision {
    pub fn locale(&self) -> &str {
        match self {
            LocaleDecision::Continue { locale } | LocaleDecision::Redirect { locale, .. } => locale,
        }
    }
}

pub fn negotiate(
    config: &LocaleConfig,
    path: &str,
    query: Option<&str>,
    headers: &HeaderMap,
) -> LocaleDecision {
    match split_locale(config, path) {
        Some((locale, rest)) => {
            let strip = match config.prefix {
                LocalePrefix::Never => true,
                LocalePrefix::AsNeeded => locale == config.default_locale,
                LocalePrefix::Always => false,
            };
            if strip {
                // `/en//host/x` must not become the protocol-relative `//host/x`.
                let location = format!("/{}", rest.trim_start_matches('/'));
                LocaleDecision::Redirect {
                    location: with_query(&location, query),
                    locale,
                }
            } else {
                LocaleDecision::Continue { locale }
            }
        }
        None => {
            let locale = preferred_locale(config, headers);
            let prefix = match config.prefix {
                LocalePrefix::Always => true,
                LocalePrefix::AsNeeded => locale != config.default_locale,
                LocalePrefix::Never => false,
            };
            if prefix {
                let location = if path == "/" {
                    format!("/{locale}")
                } else {
                    format!("/{locale}{path}")
                };
                LocaleDecision::Redirect {
                    location: with_query(&location, query),
                    locale,
                }
            } else {
                LocaleDecision::Continue { locale }
            }
        }
    }
}

/// Split a leading locale segment off the path: `/fr/about` gives
/// `("fr", "/about")`, `/fr` gives `("fr", "/")`.
fn split_locale<'a>(config: &LocaleConfig, path: &'a str) -> Option<(String, &'a str)> {
    let trimmed = path.strip_prefix('/')?;
    let (segment, rest) = match trimmed.find('/') {
        Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
        None => (trimmed, "/"),
    };

    config
        .locales
        .iter()
        .find(|l| l.eq_ignore_ascii_case(segment))
        .map(|l| (l.clone(), rest))
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.to_string(),
    }
}

/// Locale stored in the `NEXT_LOCALE` cookie, if it is still supported.
pub fn cookie_locale(config: &LocaleConfig, headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    let value = jar.get(LOCALE_COOKIE)?.value().to_string();
    config
        .locales
        .iter()
        .find(|l| l.eq_ignore_ascii_case(&value))
        .cloned()
}

fn preferred_locale(config: &LocaleConfig, headers: &HeaderMap) -> String {
    if let Some(locale) = cookie_locale(config, headers) {
        return locale;
    }

    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| match_accept_language(config, h))
        .unwrap_or_else(|| config.default_locale.clone())
}

/// Parse an `Accept-Language` value into tags ordered by descending quality.
/// Tags with `q=0` are dropped; ties keep header order.
pub fn parse_accept_language(header: &str) -> Vec<(String, f32)> {
    let mut tags: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() {
                return None;
            }
            let quality = pieces
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then(|| (tag.to_lowercase(), quality))
        })
        .collect();

    tags.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    tags
}

fn match_accept_language(config: &LocaleConfig, header: &str) -> Option<String> {
    for (tag, _) in parse_accept_language(header) {
        if tag == "*" {
            return Some(config.default_locale.clone());
        }
        let primary = tag.split('-').next().unwrap_or(&tag);
        if let Some(locale) = config
            .locales
            .iter()
            .find(|l| l.eq_ignore_ascii_case(&tag) || l.eq_ignore_ascii_case(primary))
        {
            return Some(locale.clone());
        }
    }
    None
}
