use axum_extra::extract::cookie::CookieJar;
use http::{header, HeaderMap, Uri};

/// Query parameter and cookie name checked for a token.
pub const TOKEN_PARAM: &str = "jwt";

const BEARER: &str = "bearer";

/// Where a candidate token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Query,
    QueryAlias,
    Header,
    Cookie,
}

/// Finds the candidate token string in a request.
///
/// Sources are checked in order and the first non-empty value wins:
///
/// 1. the `jwt` query parameter
/// 2. each alias query parameter, in the order given
/// 3. an `Authorization: Bearer <token>` header
/// 4. the `jwt` cookie
#[derive(Debug, Clone, Default)]
pub struct TokenLocator {
    aliases: Vec<String>,
}

impl TokenLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra query parameter names consulted when `jwt` is absent.
    pub fn with_aliases(aliases: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn locate(&self, uri: &Uri, headers: &HeaderMap) -> Option<(String, TokenSource)> {
        let query = query_params(uri);

        if let Some(token) = first_value(&query, TOKEN_PARAM) {
            return Some((token, TokenSource::Query));
        }

        if let Some(token) = self
            .aliases
            .iter()
            .find_map(|alias| first_value(&query, alias))
        {
            return Some((token, TokenSource::QueryAlias));
        }

        if let Some(token) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
        {
            return Some((token.to_owned(), TokenSource::Header));
        }

        CookieJar::from_headers(headers)
            .get(TOKEN_PARAM)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty())
            .map(|token| (token, TokenSource::Cookie))
    }
}

/// Token from an `Authorization` value: the scheme must be `Bearer` in any
/// case, followed by at least one whitespace character.
pub fn bearer_token(value: &str) -> Option<&str> {
    let scheme = value.get(..BEARER.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER) {
        return None;
    }
    let rest = &value[BEARER.len()..];
    if !rest.starts_with(|c: char| c.is_ascii_whitespace()) {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

/// Query pairs in request order. Decoding is lossy, so one bad escape does
/// not hide the other parameters.
fn query_params(uri: &Uri) -> Vec<(String, String)> {
    uri.query()
        .map(|q| {
            form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

/// First value of `name`, if it is non-empty. Later repeats are ignored.
fn first_value(query: &[(String, String)], name: &str) -> Option<String> {
    query
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
        .filter(|v| !v.is_empty())
        .cloned()
}
