#![forbid(unsafe_code)]

//! Typed environment overrides.
//!
//! Every helper takes a `get_env` closure instead of reading
//! `std::env::var` directly; production code passes [`process_env`].

use std::fmt;
use std::str::FromStr;

/// An override that is set but does not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvParseError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value '{}': {}", self.key, self.value, self.reason)
    }
}

impl std::error::Error for EnvParseError {}

/// Lookup backed by the real process environment.
#[must_use]
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Interpret a flag value. `1`, `true`, `yes` and `on` (any case) are true.
#[inline]
#[must_use]
pub fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Boolean override for `key`, if set.
pub fn lookup_flag<F>(get_env: F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    get_env(key).map(|v| env_flag(&v))
}

/// Parsed override for `key`: `Ok(None)` when unset, an error when set to
/// something that does not parse.
pub fn lookup_parsed<T, F>(get_env: F, key: &str) -> Result<Option<T>, EnvParseError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get_env(key) else {
        return Ok(None);
    };
    raw.trim().parse().map(Some).map_err(|e: T::Err| EnvParseError {
        key: key.to_owned(),
        value: raw.clone(),
        reason: e.to_string(),
    })
}

/// First non-empty value among `keys`.
pub fn lookup_first<F>(get_env: F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|k| get_env(*k))
        .find(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn fake_env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn flag_values() {
        for truthy in ["1", "true", "YES", " on "] {
            assert!(env_flag(truthy), "{truthy}");
        }
        for falsy in ["0", "false", "off", "", "maybe"] {
            assert!(!env_flag(falsy), "{falsy}");
        }
    }

    #[test]
    fn lookup_flag_absent_is_none() {
        let env = fake_env(&[("A", "1")]);
        assert_eq!(lookup_flag(&env, "A"), Some(true));
        assert_eq!(lookup_flag(&env, "B"), None);
    }

    #[test]
    fn lookup_parsed_rejects_garbage() {
        let env = fake_env(&[("N", " 12 "), ("BAD", "twelve")]);
        assert_eq!(lookup_parsed::<u32, _>(&env, "N"), Ok(Some(12)));
        assert_eq!(lookup_parsed::<u32, _>(&env, "UNSET"), Ok(None));

        let err = lookup_parsed::<u32, _>(&env, "BAD").unwrap_err();
        assert_eq!(err.key, "BAD");
        assert_eq!(err.value, "twelve");
        assert!(err.to_string().starts_with("invalid BAD value 'twelve'"));
    }

    #[test]
    fn lookup_first_skips_empty() {
        let env = fake_env(&[("PRIMARY", " "), ("FALLBACK", "debug")]);
        assert_eq!(
            lookup_first(&env, &["PRIMARY", "FALLBACK"]),
            Some("debug".to_string())
        );
        assert_eq!(lookup_first(&env, &["NONE"]), None);
    }

    proptest! {
        #[test]
        fn flag_is_case_insensitive(s in "[tT][rR][uU][eE]|[yY][eE][sS]|[oO][nN]") {
            prop_assert!(env_flag(&s));
        }
    }
}
