use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;

/// Optional `?delay=<ms>` artificial latency.
///
/// The first `delay` value is used. Anything that is not a finite number is
/// ignored; negative numbers mean no delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delay(pub Option<Duration>);

impl<S> FromRequestParts<S> for Delay
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let delay = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(pairs)| {
                pairs
                    .into_iter()
                    .find(|(key, _)| key == "delay")
                    .map(|(_, value)| value)
            })
            .and_then(|raw| parse_delay(&raw));

        Ok(Delay(delay))
    }
}

fn parse_delay(raw: &str) -> Option<Duration> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let millis: f64 = trimmed.parse().ok().filter(|v: &f64| v.is_finite())?;
    let nanos = (millis.max(0.0) * 1_000_000.0).round();
    if nanos >= u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos as u64))
}
