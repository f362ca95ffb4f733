//! # Request dispatcher
//!
//! Runs in front of every route and picks one of three behaviours from the
//! request path:
//!
//! - excluded (API, static files): the request passes through untouched
//! - protected / auth pages: session check, then locale negotiation
//! - everything else: locale negotiation only
//!
//! Unauthenticated requests to protected pages are redirected to the sign-in
//! page of their locale. Locale redirects follow the configured prefix policy.

pub mod locale;
pub mod rules;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::api::AppState;
use crate::auth;

pub use locale::{LocaleDecision, ResolvedLocale, LOCALE_COOKIE};
pub use rules::{PathMatcher, RouteClass, RouteRule, RouteRules};

const LOCALE_COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

pub async fn dispatch_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let class = state.routes.classify(&path);

    if !class.runs_locale() {
        return next.run(request).await;
    }

    if class.runs_auth() {
        match state.sessions.authenticate(request.headers()) {
            Some(principal) => {
                debug!(path = %path, user_id = %principal.user_id, "Session resolved");
                request.extensions_mut().insert(principal);
            }
            None if class.requires_principal() => {
                let location = auth::sign_in_url(&path, &state.config.locale);
                debug!(path = %path, location = %location, "Redirecting signed-out request");
                return Redirect::temporary(&location).into_response();
            }
            None => {}
        }
    }

    let locale_config = &state.config.locale;
    let cookie = locale::cookie_locale(locale_config, request.headers());
    let decision = locale::negotiate(
        locale_config,
        &path,
        request.uri().query(),
        request.headers(),
    );

    let mut response = match &decision {
        LocaleDecision::Redirect { location, locale } => {
            debug!(path = %path, location = %location, locale = %locale, "Locale redirect");
            Redirect::temporary(location).into_response()
        }
        LocaleDecision::Continue { locale } => {
            request
                .extensions_mut()
                .insert(ResolvedLocale(locale.clone()));
            let mut response = next.run(request).await;
            if let Ok(value) = HeaderValue::from_str(locale) {
                response
                    .headers_mut()
                    .insert(header::CONTENT_LANGUAGE, value);
            }
            response
        }
    };

    if cookie.as_deref() != Some(decision.locale()) {
        let cookie = format!(
            "{LOCALE_COOKIE}={}; Path=/; Max-Age={LOCALE_COOKIE_MAX_AGE_SECS}; SameSite=Lax",
            decision.locale()
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}
