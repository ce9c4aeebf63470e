//! KeyValues pretty-printer
//!
//! Scalars render as the quoted name padded with spaces out to a fixed
//! value column, then the quoted value. Containers render as the quoted
//! name, an open brace, one blank-line-separated indented block per child,
//! and a close brace. Tab width and value column come from
//! [`FormatConfig`].

use unicode_width::UnicodeWidthStr;

use crate::config::FormatConfig;

use super::KvNode;

/// Render a document. The result ends with a trailing newline when
/// non-empty.
pub fn serialize(nodes: &[KvNode], style: &FormatConfig) -> String {
    let mut out = String::new();
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_node(&mut out, node, 0, style);
    }
    out
}

fn write_node(out: &mut String, node: &KvNode, depth: usize, style: &FormatConfig) {
    let indent = " ".repeat(depth * style.tab_width);
    match node {
        KvNode::Scalar { name, value } => {
            let name = quote(name);
            let used = indent.len() + name.width();
            let pad = style.value_column.saturating_sub(used).max(1);
            out.push_str(&indent);
            out.push_str(&name);
            out.push_str(&" ".repeat(pad));
            out.push_str(&quote(value));
            out.push('\n');
        }
        KvNode::Container { name, children } => {
            out.push_str(&indent);
            out.push_str(&quote(name));
            out.push('\n');
            out.push_str(&indent);
            out.push_str("{\n");
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                write_node(out, child, depth + 1, style);
            }
            out.push_str(&indent);
            out.push_str("}\n");
        }
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(name: &str, value: &str) -> KvNode {
        KvNode::Scalar {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_scalar_pads_to_value_column() {
        let style = FormatConfig {
            tab_width: 4,
            value_column: 16,
        };
        let text = serialize(&[scalar("xpos", "c-100")], &style);
        assert_eq!(text, "\"xpos\"          \"c-100\"\n");
        // Value starts exactly at the configured column.
        assert_eq!(text.find("\"c-100\""), Some(16));
    }

    #[test]
    fn test_long_name_still_gets_one_space() {
        let style = FormatConfig {
            tab_width: 4,
            value_column: 8,
        };
        let text = serialize(&[scalar("averylongfieldname", "1")], &style);
        assert_eq!(text, "\"averylongfieldname\" \"1\"\n");
    }

    #[test]
    fn test_container_layout_with_blank_lines_between_children() {
        let style = FormatConfig {
            tab_width: 4,
            value_column: 16,
        };
        let doc = KvNode::Container {
            name: "root".to_string(),
            children: vec![
                scalar("a", "1"),
                KvNode::Container {
                    name: "inner".to_string(),
                    children: vec![scalar("b", "2")],
                },
            ],
        };
        let text = serialize(&[doc], &style);
        insta::assert_snapshot!(text.trim_end(), @r#"
"root"
{
    "a"         "1"

    "inner"
    {
        "b"     "2"
    }
}
"#);
    }

    #[test]
    fn test_escapes_quotes_and_backslashes() {
        let style = FormatConfig::default();
        let text = serialize(&[scalar("k", "a\"b\\c")], &style);
        assert!(text.contains("\"a\\\"b\\\\c\""));
    }

    #[test]
    fn test_empty_container() {
        let style = FormatConfig::default();
        let text = serialize(&[KvNode::Container {
            name: "empty".to_string(),
            children: Vec::new(),
        }], &style);
        assert_eq!(text, "\"empty\"\n{\n}\n");
    }
}
