//! Cookie handling for the carrier session
//!
//! The portal answers login with several `Set-Cookie` headers, which some
//! stacks fold into one comma-joined value. Commas also appear inside
//! `Expires` attributes, so a comma only separates cookies when it is
//! followed by a `name=` token.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

fn next_cookie_re() -> &'static Regex {
    static NEXT_COOKIE: OnceLock<Regex> = OnceLock::new();
    NEXT_COOKIE.get_or_init(|| {
        Regex::new(r"^\s*[!#$%&'*+.^_`|~0-9A-Za-z-]+=").expect("Invalid regex pattern")
    })
}

/// Split a folded `Set-Cookie` value into individual cookie strings
pub fn split_set_cookie_header(value: &str) -> Vec<&str> {
    let re = next_cookie_re();
    let mut parts = Vec::new();
    let mut start = 0;

    for (idx, ch) in value.char_indices() {
        if ch == ',' && re.is_match(&value[idx + 1..]) {
            parts.push(value[start..idx].trim());
            start = idx + 1;
        }
    }
    parts.push(value[start..].trim());

    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

/// `name=value` pair of a single `Set-Cookie` string, attributes dropped
fn cookie_pair(set_cookie: &str) -> Option<(&str, &str)> {
    let pair = set_cookie.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}

/// Ordered name to value cookie map
///
/// Renders as a `Cookie` request header (`a=1; b=2`) and parses back to the
/// same map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a jar from raw `Set-Cookie` header values
    pub fn from_set_cookie<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut jar = Self::new();
        for header in headers {
            jar.absorb_set_cookie(header);
        }
        jar
    }

    /// Add every cookie of a (possibly folded) `Set-Cookie` value
    ///
    /// Later cookies with the same name win.
    pub fn absorb_set_cookie(&mut self, header: &str) {
        for part in split_set_cookie_header(header) {
            if let Some((name, value)) = cookie_pair(part) {
                self.insert(name, value);
            }
        }
    }

    /// Parse a `Cookie` request header
    pub fn parse_header(header: &str) -> Self {
        let mut jar = Self::new();
        for pair in header.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    jar.insert(name, value.trim());
                }
            }
        }
        jar
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Copy every cookie of `other` into this jar, overwriting on conflict
    pub fn merge(&mut self, other: &CookieJar) {
        for (name, value) in &other.cookies {
            self.cookies.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as a `Cookie` request header value
    pub fn to_header(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (name, value)) in self.cookies.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}
