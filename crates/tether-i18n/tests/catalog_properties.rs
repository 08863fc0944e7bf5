//! Property tests for catalog lookup and interpolation.

use proptest::prelude::*;
use tether_i18n::{LocaleMessages, MessageCatalog, interpolate, parse_locale};

fn plain_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?]{0,40}"
}

proptest! {
    #[test]
    fn text_without_braces_is_unchanged(s in plain_text()) {
        prop_assert_eq!(interpolate(&s, &[("x", "y")]), s);
    }

    #[test]
    fn every_named_token_is_replaced(
        prefix in plain_text(),
        suffix in plain_text(),
        value in plain_text(),
    ) {
        let template = format!("{prefix}{{name}}{suffix}");
        prop_assert_eq!(
            interpolate(&template, &[("name", &value)]),
            format!("{prefix}{value}{suffix}")
        );
    }

    #[test]
    fn fallback_chain_finds_key_from_any_locale(
        lang in "[a-z]{2}",
        region in "[A-Z]{2}",
        message in plain_text(),
    ) {
        let mut catalog = MessageCatalog::new();
        catalog.add_locale("en", [("k", message.as_str())].into_iter().collect::<LocaleMessages>());
        catalog.set_fallback_chain(vec!["en".into()]);
        let locale = format!("{lang}-{region}");
        prop_assert_eq!(catalog.get(&locale, "k"), Some(message.as_str()));
    }

    #[test]
    fn posix_style_tags_normalize(lang in "[a-z]{2}", region in "[A-Z]{2}") {
        let raw = format!("{lang}_{region}.UTF-8");
        prop_assert_eq!(parse_locale(&raw).unwrap(), format!("{lang}-{region}"));
    }
}
