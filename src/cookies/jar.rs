use serde::{Deserialize, Serialize};

/// A single name/value pair carried by a [`CookieSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

/// Session cookies for one account.
///
/// Names are unique; a later value for the same name overwrites the earlier
/// one while keeping its original position. Merging never drops a name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieSet {
    cookies: Vec<SessionCookie>,
}

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cookie, replacing any existing value for `name`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.cookies.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.value = value,
            None => self.cookies.push(SessionCookie { name, value }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies
            .iter()
            .map(|c| (c.name.as_str(), c.value.as_str()))
    }

    /// Merge every `Set-Cookie` line of a response into a new set.
    ///
    /// Header names are matched case-insensitively and may repeat. Only the
    /// `name=value` pair before the first attribute is kept. Lines that do
    /// not parse are skipped.
    pub fn merge<K, V>(&self, raw_headers: &[(K, V)]) -> CookieSet
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut merged = self.clone();
        for (name, value) in raw_headers {
            if !name.as_ref().eq_ignore_ascii_case("set-cookie") {
                continue;
            }
            match cookie::Cookie::parse(value.as_ref()) {
                Ok(parsed) => merged.set(parsed.name(), parsed.value()),
                Err(e) => tracing::debug!("Skipping malformed Set-Cookie line: {}", e),
            }
        }
        merged
    }

    /// Render the set as a `Cookie` request header value.
    ///
    /// Returns `None` when the set is empty so callers can omit the header.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Some(pairs.join("; "))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CookieSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = CookieSet::new();
        for (name, value) in iter {
            set.set(name, value);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_and_keeps() {
        let existing: CookieSet = [("a", "1"), ("b", "2")].into_iter().collect();
        let headers = vec![
            ("Set-Cookie", "b=20; Path=/; Secure"),
            ("set-cookie", "c=3; HttpOnly"),
            ("Content-Type", "application/x-apple-plist"),
        ];

        let merged = existing.merge(&headers);
        assert_eq!(merged.get("a"), Some("1"));
        assert_eq!(merged.get("b"), Some("20"));
        assert_eq!(merged.get("c"), Some("3"));
        assert_eq!(merged.len(), 3);

        // Input is untouched
        assert_eq!(existing.get("b"), Some("2"));
    }

    #[test]
    fn test_merge_skips_malformed_lines() {
        let headers = vec![
            ("SET-COOKIE", "no-equals-sign"),
            ("Set-Cookie", "=orphan"),
            ("Set-Cookie", "ok=yes"),
        ];
        let merged = CookieSet::new().merge(&headers);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("ok"), Some("yes"));
    }

    #[test]
    fn test_repeated_name_last_wins() {
        let headers = vec![("Set-Cookie", "x=first"), ("Set-Cookie", "x=second")];
        let merged = CookieSet::new().merge(&headers);
        assert_eq!(merged.get("x"), Some("second"));
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_header_value() {
        assert_eq!(CookieSet::new().header_value(), None);

        let set: CookieSet = [("mz_at0", "abc"), ("itspod", "25")].into_iter().collect();
        assert_eq!(set.header_value().as_deref(), Some("mz_at0=abc; itspod=25"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let set: CookieSet = [("a", "1")].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"[{"name":"a","value":"1"}]"#);
        let back: CookieSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
