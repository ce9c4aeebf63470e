//! Properties of catalog-key path normalization

use std::path::PathBuf;

use proptest::prelude::*;

use rescomp::paths::{catalog_key, forward_slashes, lexical_normalize, relative_to};

fn component() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9]{0,5}").unwrap()
}

fn clean_relative_path() -> impl Strategy<Value = PathBuf> {
    proptest::collection::vec(component(), 1..5).prop_map(|parts| parts.iter().collect())
}

fn absolute_base() -> impl Strategy<Value = PathBuf> {
    proptest::collection::vec(component(), 1..4).prop_map(|parts| {
        let mut base = PathBuf::from("/");
        for part in parts {
            base.push(part);
        }
        base
    })
}

/// A path built from clean components plus noise (`.` and `..` pairs)
/// that normalization must cancel out.
fn noisy_variant(clean: &PathBuf) -> PathBuf {
    let mut noisy = PathBuf::new();
    for part in clean.iter() {
        noisy.push(part);
        noisy.push("extra");
        noisy.push("..");
        noisy.push(".");
    }
    noisy
}

proptest! {
    #[test]
    fn normalize_is_idempotent(base in absolute_base(), rel in clean_relative_path()) {
        let path = base.join(noisy_variant(&rel));
        let once = lexical_normalize(&path);
        prop_assert_eq!(lexical_normalize(&once), once);
    }

    #[test]
    fn relative_to_round_trips_under_the_base(
        base in absolute_base(),
        rel in clean_relative_path()
    ) {
        let full = base.join(&rel);
        prop_assert_eq!(relative_to(&full, &base), rel);
    }

    #[test]
    fn equivalent_spellings_share_one_catalog_key(
        base in absolute_base(),
        rel in clean_relative_path()
    ) {
        // The invariant that makes missing-directive deduplication work:
        // two spellings of the same logical path must collide.
        let clean_key = catalog_key(&base.join(&rel), &base);
        let noisy_key = catalog_key(&base.join(noisy_variant(&rel)), &base);
        prop_assert_eq!(&clean_key, &noisy_key);
        prop_assert!(!clean_key.contains('\\'));
    }

    #[test]
    fn catalog_keys_use_forward_slashes(rel in clean_relative_path()) {
        let rendered = forward_slashes(&rel);
        prop_assert!(!rendered.contains('\\'));
        prop_assert_eq!(rendered.split('/').count(), rel.iter().count());
    }
}
