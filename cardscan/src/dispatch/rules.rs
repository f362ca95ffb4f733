//! Path classification for the request dispatcher.
//!
//! Rules are evaluated top to bottom and the first match wins. Keeping them as
//! data makes the table easy to read and to test on its own.

use regex::Regex;

/// What the dispatcher does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// No auth, no locale handling. API routes, static assets.
    Excluded,
    /// Signed-in principal required; locale handling afterwards.
    Protected,
    /// Sign-in / sign-up pages. Session is resolved but never enforced.
    AuthPage,
    /// Locale handling only.
    Public,
}

impl RouteClass {
    pub fn runs_auth(self) -> bool {
        matches!(self, RouteClass::Protected | RouteClass::AuthPage)
    }

    pub fn runs_locale(self) -> bool {
        !matches!(self, RouteClass::Excluded)
    }

    pub fn requires_principal(self) -> bool {
        matches!(self, RouteClass::Protected)
    }
}

#[derive(Debug)]
pub enum PathMatcher {
    Prefix(&'static str),
    Contains(&'static str),
    Pattern(Regex),
    Predicate(fn(&str) -> bool),
}

impl PathMatcher {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Prefix(prefix) => path.starts_with(prefix),
            PathMatcher::Contains(needle) => path.contains(needle),
            PathMatcher::Pattern(re) => re.is_match(path),
            PathMatcher::Predicate(f) => f(path),
        }
    }
}

#[derive(Debug)]
pub struct RouteRule {
    pub matcher: PathMatcher,
    pub class: RouteClass,
}

impl RouteRule {
    pub fn new(matcher: PathMatcher, class: RouteClass) -> Self {
        Self { matcher, class }
    }
}

#[derive(Debug)]
pub struct RouteRules {
    rules: Vec<RouteRule>,
    fallback: RouteClass,
}

impl RouteRules {
    pub fn new(rules: Vec<RouteRule>, fallback: RouteClass) -> Self {
        Self { rules, fallback }
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(path))
            .map(|rule| rule.class)
            .unwrap_or(self.fallback)
    }
}

impl Default for RouteRules {
    fn default() -> Self {
        Self::new(
            vec![
                RouteRule::new(PathMatcher::Prefix("/api"), RouteClass::Excluded),
                RouteRule::new(
                    PathMatcher::Predicate(outside_middleware_matcher),
                    RouteClass::Excluded,
                ),
                RouteRule::new(
                    PathMatcher::Pattern(Regex::new(r"^/dashboard.*$").expect("valid regex")),
                    RouteClass::Protected,
                ),
                RouteRule::new(
                    PathMatcher::Pattern(
                        Regex::new(r"^/[^/]+/dashboard.*$").expect("valid regex"),
                    ),
                    RouteClass::Protected,
                ),
                RouteRule::new(PathMatcher::Contains("/sign-in"), RouteClass::AuthPage),
                RouteRule::new(PathMatcher::Contains("/sign-up"), RouteClass::AuthPage),
            ],
            RouteClass::Public,
        )
    }
}

/// True for paths the page middleware never sees: files with an extension,
/// framework internals, the monitoring tunnel and the API. `/` and `/trpc...`
/// are always covered.
pub fn outside_middleware_matcher(path: &str) -> bool {
    if path == "/" || path.starts_with("/trpc") {
        return false;
    }

    let rest = path.strip_prefix('/').unwrap_or(path);
    ["_next", "monitoring", "api"]
        .iter()
        .any(|p| rest.starts_with(p))
        || has_file_extension(rest)
}

fn has_file_extension(rest: &str) -> bool {
    match rest.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}
