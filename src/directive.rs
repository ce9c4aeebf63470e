//! `#base` / `#include` directive extraction
//!
//! A directive is a line beginning (after optional whitespace) with `#base`
//! or `#include`, case-insensitive, followed by a double-quoted path.
//! Anything after the closing quote on that line is ignored.

use serde::Serialize;

use crate::error::{RescompError, RescompResult};

/// Kind of inclusion directive, determined solely by the keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    /// `#base` - merged as fallback values (existing keys win)
    Base,
    /// `#include` - merged as overrides (loaded keys win)
    Include,
}

impl DirectiveKind {
    /// The literal keyword, as re-emitted for unresolved directives.
    pub fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::Base => "#base",
            DirectiveKind::Include => "#include",
        }
    }

    /// Parse a lowercased keyword token.
    ///
    /// The scan pattern only ever produces the two known keywords; anything
    /// else reaching this point is an invariant violation and fatal.
    pub fn from_keyword(keyword: &str) -> RescompResult<Self> {
        match keyword {
            "#base" => Ok(DirectiveKind::Base),
            "#include" => Ok(DirectiveKind::Include),
            other => Err(RescompError::UnrecognizedDirectiveKeyword {
                keyword: other.to_string(),
            }),
        }
    }
}

/// One inclusion directive as written in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Target path exactly as spelled between the quotes.
    pub target: String,
}

impl Directive {
    /// Render the literal directive line, quoting the given path.
    pub fn render(kind: DirectiveKind, target: &str) -> String {
        format!("{} \"{}\"", kind.keyword(), target)
    }
}

/// Extract every directive from raw text, in order of appearance.
///
/// The first occurrence of a given literal path wins; later duplicates are
/// dropped. Pure and deterministic: re-scanning the same text always yields
/// the same list.
pub fn scan_directives(text: &str) -> Vec<Directive> {
    let mut found: Vec<Directive> = Vec::new();
    for line in text.lines() {
        if let Some(directive) = parse_directive_line(line) {
            if !found.iter().any(|d| d.target == directive.target) {
                found.push(directive);
            }
        }
    }
    found
}

/// Look up the directive in `text` naming `target` exactly.
pub fn find_directive<'a>(directives: &'a [Directive], target: &str) -> Option<&'a Directive> {
    directives.iter().find(|d| d.target == target)
}

fn parse_directive_line(line: &str) -> Option<Directive> {
    let rest = line.trim_start();
    if !rest.starts_with('#') {
        return None;
    }

    let keyword_len = rest
        .char_indices()
        .skip(1)
        .find(|(_, c)| !c.is_ascii_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let keyword = rest[..keyword_len].to_ascii_lowercase();
    if keyword != "#base" && keyword != "#include" {
        return None;
    }
    let kind = DirectiveKind::from_keyword(&keyword).ok()?;

    let rest = rest[keyword_len..].trim_start();
    let rest = rest.strip_prefix('"')?;
    let close = rest.find('"')?;
    let target = &rest[..close];
    if target.is_empty() {
        return None;
    }

    Some(Directive {
        kind,
        target: target.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_basic_pair() {
        let text = "#base \"scheme.res\"\n#include \"layout.res\"\n\"root\"\n{\n}\n";
        let found = scan_directives(text);
        assert_eq!(
            found,
            vec![
                Directive {
                    kind: DirectiveKind::Base,
                    target: "scheme.res".to_string()
                },
                Directive {
                    kind: DirectiveKind::Include,
                    target: "layout.res".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_scan_keyword_case_insensitive() {
        let found = scan_directives("  #BASE \"a.res\"\n\t#Include \"b.res\"\n");
        assert_eq!(found[0].kind, DirectiveKind::Base);
        assert_eq!(found[1].kind, DirectiveKind::Include);
    }

    #[test]
    fn test_scan_first_occurrence_of_path_wins() {
        let text = "#include \"a.res\"\n#base \"a.res\"\n";
        let found = scan_directives(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DirectiveKind::Include);
    }

    #[test]
    fn test_scan_allows_leading_whitespace_and_trailing_comment() {
        let found = scan_directives("   #base \"x/y.res\" // fallback scheme\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target, "x/y.res");
    }

    #[test]
    fn test_scan_ignores_unknown_hash_lines() {
        let found = scan_directives("#pragma \"x.res\"\n#basement \"y.res\"\n");
        assert!(found.is_empty());
    }

    #[test]
    fn test_scan_ignores_unquoted_target() {
        assert!(scan_directives("#base x.res\n").is_empty());
        assert!(scan_directives("#base \"\"\n").is_empty());
    }

    #[test]
    fn test_scan_ignores_mid_line_directives() {
        // Directives are line-anchored; a quoted value mentioning one is not
        // a directive.
        let found = scan_directives("\"label\" \"#base \\\"a.res\\\"\"\n");
        assert!(found.is_empty());
    }

    #[test]
    fn test_from_keyword_rejects_unknown() {
        let err = DirectiveKind::from_keyword("#import").unwrap_err();
        assert!(matches!(
            err,
            crate::error::RescompError::UnrecognizedDirectiveKeyword { .. }
        ));
    }

    #[test]
    fn test_render_round_trips_through_scan() {
        let line = Directive::render(DirectiveKind::Base, "sub/missing.res");
        let found = scan_directives(&line);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DirectiveKind::Base);
        assert_eq!(found[0].target, "sub/missing.res");
    }
}
