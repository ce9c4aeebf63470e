//! Properties of the directive scanner

use proptest::prelude::*;

use rescomp::directive::{scan_directives, Directive, DirectiveKind};

fn kind_strategy() -> impl Strategy<Value = DirectiveKind> {
    prop_oneof![Just(DirectiveKind::Base), Just(DirectiveKind::Include)]
}

fn path_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z0-9_][a-z0-9_/.]{0,18}").unwrap()
}

fn render_all(directives: &[(DirectiveKind, String)]) -> String {
    directives
        .iter()
        .map(|(kind, path)| Directive::render(*kind, path))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The first occurrence of each literal path wins; later duplicates drop.
fn first_occurrences(directives: &[(DirectiveKind, String)]) -> Vec<(DirectiveKind, String)> {
    let mut seen: Vec<(DirectiveKind, String)> = Vec::new();
    for (kind, path) in directives {
        if !seen.iter().any(|(_, p)| p == path) {
            seen.push((*kind, path.clone()));
        }
    }
    seen
}

proptest! {
    #[test]
    fn scan_finds_exactly_the_rendered_directives(
        directives in proptest::collection::vec((kind_strategy(), path_strategy()), 0..12)
    ) {
        let text = render_all(&directives);
        let scanned: Vec<(DirectiveKind, String)> = scan_directives(&text)
            .into_iter()
            .map(|d| (d.kind, d.target))
            .collect();
        prop_assert_eq!(scanned, first_occurrences(&directives));
    }

    #[test]
    fn scan_is_idempotent_over_reemitted_output(
        directives in proptest::collection::vec((kind_strategy(), path_strategy()), 0..12)
    ) {
        // Re-emitting what one scan found and scanning again must detect
        // exactly the same directives.
        let first = scan_directives(&render_all(&directives));
        let reemitted = first
            .iter()
            .map(|d| Directive::render(d.kind, &d.target))
            .collect::<Vec<_>>()
            .join("\n");
        let second = scan_directives(&reemitted);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn scan_ignores_surrounding_document_text(
        directives in proptest::collection::vec((kind_strategy(), path_strategy()), 1..6)
    ) {
        let mut text = String::from("\"Root\"\n{\n\"key\" \"value\"\n}\n");
        text.push_str(&render_all(&directives));
        text.push_str("\n\"tail\" \"value\"\n");

        let scanned = scan_directives(&text);
        prop_assert_eq!(scanned.len(), first_occurrences(&directives).len());
    }
}
