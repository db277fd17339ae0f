//! Cookie storage and anti-forgery token discovery.
//!
//! # Design
//! `CookieJar` parses a `Cookie` header string (`name=value; name2=value2`)
//! into ordered pairs with the `cookie` crate instead of scanning substring
//! offsets, so token lookup does not depend on where the pair sits in the
//! string or on the spacing around separators. `CsrfPolicy` names the cookie
//! that carries the token and the header the server expects it in.

use cookie::time::OffsetDateTime;
use cookie::Cookie;
use tracing::debug;

/// Ordered name/value pairs read from a cookie header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    pairs: Vec<(String, String)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `Cookie` header string. Values are percent-decoded; segments
    /// that are not `name=value` pairs are skipped.
    pub fn parse(header: &str) -> Self {
        let mut jar = Self::new();
        for parsed in Cookie::split_parse_encoded(header) {
            match parsed {
                Ok(c) => jar.pairs.push((c.name().to_string(), c.value_trimmed().to_string())),
                Err(e) => debug!(error = %e, "skipping malformed cookie segment"),
            }
        }
        jar
    }

    /// First value stored under `name`. An empty value counts as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// First non-empty pair whose name starts with `prefix`.
    pub fn find_prefixed(&self, prefix: &str) -> Option<(&str, &str)> {
        self.pairs
            .iter()
            .find(|(k, v)| k.starts_with(prefix) && !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace the value of `name`, or append the pair if it is new.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == name) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.pairs.iter().position(|(k, _)| k == name)?;
        Some(self.pairs.remove(idx).1)
    }

    /// Apply one `Set-Cookie` header. A zero or negative `Max-Age`, an
    /// `Expires` date in the past, or an empty value deletes the cookie.
    pub fn apply_set_cookie(&mut self, header: &str) {
        let parsed = match Cookie::parse_encoded(header) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "ignoring malformed set-cookie header");
                return;
            }
        };
        let expired = match parsed.max_age() {
            Some(age) => age.is_zero() || age.is_negative(),
            None => parsed
                .expires_datetime()
                .is_some_and(|at| at <= OffsetDateTime::now_utc()),
        };
        if expired || parsed.value_trimmed().is_empty() {
            self.remove(parsed.name());
        } else {
            self.set(parsed.name(), parsed.value_trimmed());
        }
    }

    /// Serialize back into `Cookie` header form, or `None` when empty.
    pub fn header_value(&self) -> Option<String> {
        if self.pairs.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .pairs
            .iter()
            .map(|(k, v)| Cookie::new(k.as_str(), v.as_str()).encoded().to_string())
            .collect();
        Some(parts.join("; "))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Which cookie carries the anti-forgery token and which header sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfPolicy {
    pub cookie_name: String,
    pub header_name: String,
    /// Accept any cookie whose name starts with `cookie_name`.
    pub match_prefix: bool,
}

impl Default for CsrfPolicy {
    fn default() -> Self {
        Self {
            cookie_name: "csrftoken".to_string(),
            header_name: "X-CSRFToken".to_string(),
            match_prefix: false,
        }
    }
}

impl CsrfPolicy {
    pub fn new(cookie_name: impl Into<String>, header_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            header_name: header_name.into(),
            match_prefix: false,
        }
    }

    pub fn prefixed(mut self) -> Self {
        self.match_prefix = true;
        self
    }

    pub fn token<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        if self.match_prefix {
            jar.find_prefixed(&self.cookie_name).map(|(_, v)| v)
        } else {
            jar.get(&self.cookie_name)
        }
    }
}
