#![forbid(unsafe_code)]

//! Message catalog with locale fallback and interpolation.
//!
//! # Invariants
//!
//! 1. **Fallback chain terminates**: every lookup tries the requested locale,
//!    then its language root (`"de-AT"` -> `"de"`), then walks the chain
//!    once, returning `None` if no locale provides the key.
//!
//! 2. **Interpolation is single-pass**: `format()` replaces `{name}` tokens
//!    once; substituted text is never re-scanned.
//!
//! 3. **Immutable after construction**: lookups take `&self`, so a catalog
//!    can be shared behind an `Rc` by every binding of a context.
//!
//! An unknown key yields `None`, or the key itself through
//! [`MessageCatalog::format_or_key`]. A `{token}` without a matching argument
//! is copied verbatim.

use std::collections::HashMap;
use std::fmt;

use crate::locale::Locale;

/// Errors raised while building a catalog or parsing a locale tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I18nError {
    /// Nothing usable was left after normalizing the tag.
    InvalidLocale(String),
    /// `try_insert` found the key already present.
    DuplicateKey { locale: String, key: String },
}

impl fmt::Display for I18nError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLocale(tag) => write!(f, "unusable locale tag {tag:?}"),
            Self::DuplicateKey { locale, key } => {
                write!(f, "message {key:?} defined twice for {locale}")
            }
        }
    }
}

impl std::error::Error for I18nError {}

/// Messages for a single locale.
#[derive(Debug, Clone, Default)]
pub struct LocaleMessages {
    messages: HashMap<String, String>,
}

impl LocaleMessages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or overwrite) a message.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.messages.insert(key.into(), value.into());
    }

    /// Insert a message, refusing to overwrite an existing key.
    pub fn try_insert(
        &mut self,
        locale: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), I18nError> {
        let key = key.into();
        if self.messages.contains_key(&key) {
            return Err(I18nError::DuplicateKey {
                locale: locale.to_owned(),
                key,
            });
        }
        self.messages.insert(key, value.into());
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocaleMessages {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut messages = Self::new();
        for (k, v) in iter {
            messages.insert(k, v);
        }
        messages
    }
}

/// Central message catalog with locale fallback.
///
/// # Example
///
/// ```
/// use tether_i18n::catalog::{LocaleMessages, MessageCatalog};
///
/// let mut catalog = MessageCatalog::new();
///
/// let mut en = LocaleMessages::new();
/// en.insert("required", "{field} is required");
/// catalog.add_locale("en", en);
/// catalog.set_fallback_chain(vec!["en".into()]);
///
/// assert_eq!(
///     catalog.format("fr", "required", &[("field", "Age")]),
///     Some("Age is required".into())
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    locales: HashMap<Locale, LocaleMessages>,
    fallback_chain: Vec<Locale>,
}

impl MessageCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add messages for a locale, merging into any already present.
    pub fn add_locale(&mut self, locale: impl Into<String>, messages: LocaleMessages) {
        let entry = self.locales.entry(locale.into()).or_default();
        entry.messages.extend(messages.messages);
    }

    /// Locales consulted, in order, after the requested one and its root.
    pub fn set_fallback_chain(&mut self, chain: Vec<Locale>) {
        self.fallback_chain = chain;
    }

    /// Look up a message.
    ///
    /// Tries `locale`, then its language root, then the fallback chain.
    #[must_use]
    pub fn get(&self, locale: &str, key: &str) -> Option<&str> {
        let root = locale.split_once('-').map(|(root, _)| root);
        let chain = self
            .fallback_chain
            .iter()
            .map(String::as_str)
            .filter(|candidate| *candidate != locale);
        std::iter::once(locale)
            .chain(root)
            .chain(chain)
            .find_map(|candidate| self.locales.get(candidate).and_then(|m| m.get(key)))
    }

    /// Look up a message and perform `{name}` interpolation.
    #[must_use]
    pub fn format(&self, locale: &str, key: &str, args: &[(&str, &str)]) -> Option<String> {
        self.get(locale, key)
            .map(|template| interpolate(template, args))
    }

    /// Like [`format`](Self::format), but never fails: a missing key renders
    /// as the key itself so a message is always shown.
    #[must_use]
    pub fn format_or_key(&self, locale: &str, key: &str, args: &[(&str, &str)]) -> String {
        self.format(locale, key, args)
            .unwrap_or_else(|| key.to_owned())
    }

    #[must_use]
    pub fn locales(&self) -> Vec<&str> {
        let mut loaded: Vec<&str> = self.locales.keys().map(String::as_str).collect();
        loaded.sort_unstable();
        loaded
    }
}

/// Replaces `{name}` tokens from `args` in one pass.
#[must_use]
pub fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template.chars();

    while let Some(ch) = rest.next() {
        if ch != '{' {
            out.push(ch);
            continue;
        }

        let mut name = String::new();
        let mut closed = false;
        for c in rest.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            name.push(c);
        }

        let value = args.iter().find(|(arg, _)| *arg == name).map(|(_, v)| *v);
        match (closed, value) {
            (true, Some(value)) => out.push_str(value),
            (true, None) => {
                out.push('{');
                out.push_str(&name);
                out.push('}');
            }
            (false, _) => {
                out.push('{');
                out.push_str(&name);
            }
        }
    }

    out
}
