#![forbid(unsafe_code)]

//! Locale identifiers and system locale detection.

use std::env;

use crate::catalog::I18nError;

/// A BCP-47-ish locale tag such as `"en"` or `"de-AT"`.
pub type Locale = String;

/// Locale used when nothing better is known.
pub const DEFAULT_LOCALE: &str = "en";

/// Detect the system locale from environment variables.
///
/// Preference order: `LC_ALL`, then `LANG`. Falls back to `"en"` when unknown.
#[must_use]
pub fn detect_system_locale() -> Locale {
    let lc_all = env::var("LC_ALL").ok();
    let lang = env::var("LANG").ok();
    detect_from(lc_all.as_deref(), lang.as_deref())
}

/// Normalize a user-supplied locale tag (`"pt_BR.UTF-8"` -> `"pt-BR"`).
///
/// # Errors
///
/// [`I18nError::InvalidLocale`] when nothing usable remains after stripping
/// encoding and modifier suffixes, or the tag contains characters outside
/// `[A-Za-z0-9-]`.
pub fn parse_locale(raw: &str) -> Result<Locale, I18nError> {
    let normalized =
        normalize(raw).ok_or_else(|| I18nError::InvalidLocale(raw.to_owned()))?;
    if normalized
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        Ok(normalized)
    } else {
        Err(I18nError::InvalidLocale(raw.to_owned()))
    }
}

fn detect_from(lc_all: Option<&str>, lang: Option<&str>) -> Locale {
    lc_all
        .and_then(normalize)
        .or_else(|| lang.and_then(normalize))
        .unwrap_or_else(|| DEFAULT_LOCALE.to_owned())
}

fn normalize(raw: &str) -> Option<Locale> {
    let raw = raw.trim();
    let raw = raw.split('@').next().unwrap_or(raw);
    let raw = raw.split('.').next().unwrap_or(raw).trim();
    if raw.is_empty() {
        return None;
    }
    if raw.eq_ignore_ascii_case("c") || raw.eq_ignore_ascii_case("posix") {
        return Some(DEFAULT_LOCALE.to_owned());
    }
    Some(raw.replace('_', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lc_all_wins_over_lang() {
        assert_eq!(detect_from(Some("fr_FR.UTF-8"), Some("en_US.UTF-8")), "fr-FR");
    }

    #[test]
    fn lang_used_when_lc_all_missing_or_empty() {
        assert_eq!(detect_from(None, Some("en_US.UTF-8")), "en-US");
        assert_eq!(detect_from(Some(""), Some("de_DE")), "de-DE");
    }

    #[test]
    fn posix_and_nothing_map_to_default() {
        assert_eq!(detect_from(Some("C"), None), "en");
        assert_eq!(detect_from(Some("POSIX.UTF-8"), None), "en");
        assert_eq!(detect_from(None, None), "en");
    }

    #[test]
    fn parse_strips_modifiers() {
        assert_eq!(parse_locale("sr_RS@latin").unwrap(), "sr-RS");
        assert_eq!(parse_locale(" ja_JP.eucJP ").unwrap(), "ja-JP");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(
            parse_locale(".UTF-8"),
            Err(I18nError::InvalidLocale(".UTF-8".into()))
        );
        assert!(parse_locale("en US").is_err());
    }
}
