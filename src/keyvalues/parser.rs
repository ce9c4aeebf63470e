//! KeyValues deserializer
//!
//! `deserialize(text, loader, conditions)` parses a document into a list of
//! [`KvNode`]s. Directives (`#base`/`#include`) are resolved through the
//! loader callback, synchronously and in document order, and the loaded
//! document is merged into the current one. Bracket conditions are
//! evaluated against the fixed condition set; a false condition drops the
//! node it annotates.

use std::collections::HashSet;

use crate::directive::DirectiveKind;
use crate::error::{RescompError, RescompResult};

use super::KvNode;

/// Callback that turns a directive's relative path into file bytes.
///
/// An empty byte stream is a valid answer (a tolerated missing target).
pub type FileLoader<'a> = dyn FnMut(&str) -> RescompResult<Vec<u8>> + 'a;

/// Include expansion cap; guards against directive cycles.
const MAX_INCLUDE_DEPTH: usize = 64;

/// Parse a KeyValues document.
pub fn deserialize(
    text: &str,
    loader: &mut FileLoader,
    conditions: &HashSet<String>,
) -> RescompResult<Vec<KvNode>> {
    let mut tokens = Tokenizer::new(text);
    let mut nodes = Vec::new();
    parse_items(&mut tokens, &mut nodes, loader, conditions, 0, 0)?;
    Ok(nodes)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Text { value: String, quoted: bool },
    Cond(String),
}

struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    peeked: Option<Option<Token>>,
}

impl<'a> Tokenizer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            peeked: None,
        }
    }

    fn next(&mut self) -> RescompResult<Option<Token>> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }
        self.lex()
    }

    fn peek(&mut self) -> RescompResult<Option<Token>> {
        if self.peeked.is_none() {
            let token = self.lex()?;
            self.peeked = Some(token);
        }
        Ok(self.peeked.clone().unwrap_or(None))
    }

    fn line(&self) -> usize {
        self.src[..self.pos].matches('\n').count() + 1
    }

    fn malformed(&self, message: impl Into<String>) -> RescompError {
        RescompError::MalformedKeyValues {
            message: format!("line {}: {}", self.line(), message.into()),
        }
    }

    fn lex(&mut self) -> RescompResult<Option<Token>> {
        self.skip_trivia();
        let bytes = self.src.as_bytes();
        if self.pos >= bytes.len() {
            return Ok(None);
        }

        match bytes[self.pos] {
            b'{' => {
                self.pos += 1;
                Ok(Some(Token::Open))
            }
            b'}' => {
                self.pos += 1;
                Ok(Some(Token::Close))
            }
            b'"' => {
                self.pos += 1;
                let value = self.lex_quoted()?;
                Ok(Some(Token::Text {
                    value,
                    quoted: true,
                }))
            }
            b'[' => {
                self.pos += 1;
                let start = self.pos;
                match self.src[start..].find(']') {
                    Some(offset) => {
                        let inner = self.src[start..start + offset].to_string();
                        self.pos = start + offset + 1;
                        Ok(Some(Token::Cond(inner)))
                    }
                    None => Err(self.malformed("unterminated '[' condition")),
                }
            }
            _ => {
                let start = self.pos;
                while self.pos < bytes.len()
                    && !matches!(bytes[self.pos], b'"' | b'{' | b'}' | b'[')
                    && !bytes[self.pos].is_ascii_whitespace()
                {
                    self.pos += 1;
                }
                Ok(Some(Token::Text {
                    value: self.src[start..self.pos].to_string(),
                    quoted: false,
                }))
            }
        }
    }

    fn lex_quoted(&mut self) -> RescompResult<String> {
        let bytes = self.src.as_bytes();
        let mut value = String::new();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'"' => {
                    self.pos += 1;
                    return Ok(value);
                }
                b'\\' if self.pos + 1 < bytes.len() => {
                    let escaped = bytes[self.pos + 1];
                    value.push(match escaped {
                        b'n' => '\n',
                        b't' => '\t',
                        b'"' => '"',
                        b'\\' => '\\',
                        other => other as char,
                    });
                    self.pos += 2;
                }
                _ => {
                    let ch = self.src[self.pos..].chars().next().unwrap_or('\u{fffd}');
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
        Err(self.malformed("unterminated quoted string"))
    }

    fn skip_trivia(&mut self) {
        let bytes = self.src.as_bytes();
        loop {
            while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.src[self.pos..].starts_with("//") {
                match self.src[self.pos..].find('\n') {
                    Some(offset) => self.pos += offset + 1,
                    None => self.pos = bytes.len(),
                }
            } else {
                return;
            }
        }
    }
}

fn parse_items(
    tokens: &mut Tokenizer,
    dest: &mut Vec<KvNode>,
    loader: &mut FileLoader,
    conditions: &HashSet<String>,
    block_depth: usize,
    include_depth: usize,
) -> RescompResult<()> {
    loop {
        let token = match tokens.next()? {
            Some(token) => token,
            None if block_depth == 0 => return Ok(()),
            None => return Err(tokens.malformed("unexpected end of input inside a block")),
        };

        match token {
            Token::Close if block_depth > 0 => return Ok(()),
            Token::Close => return Err(tokens.malformed("unexpected '}' at document level")),
            Token::Open => return Err(tokens.malformed("'{' without a preceding key")),
            Token::Cond(_) => return Err(tokens.malformed("condition without a preceding key")),
            Token::Text { value, quoted } if !quoted && value.starts_with('#') => {
                let kind = DirectiveKind::from_keyword(&value.to_ascii_lowercase())?;
                let target = match tokens.next()? {
                    Some(Token::Text { value, quoted: true }) => value,
                    _ => {
                        return Err(
                            tokens.malformed(format!("{} without a quoted path", kind.keyword()))
                        )
                    }
                };
                if include_depth >= MAX_INCLUDE_DEPTH {
                    return Err(tokens.malformed(format!(
                        "include depth exceeds {} at \"{}\"",
                        MAX_INCLUDE_DEPTH, target
                    )));
                }
                let bytes = loader(&target)?;
                let text = String::from_utf8_lossy(&bytes).into_owned();
                let mut loaded = Vec::new();
                let mut sub = Tokenizer::new(&text);
                parse_items(&mut sub, &mut loaded, loader, conditions, 0, include_depth + 1)?;
                merge_nodes(dest, loaded, kind);
            }
            Token::Text { value: key, .. } => {
                parse_pair(tokens, dest, key, loader, conditions, block_depth, include_depth)?;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn parse_pair(
    tokens: &mut Tokenizer,
    dest: &mut Vec<KvNode>,
    key: String,
    loader: &mut FileLoader,
    conditions: &HashSet<String>,
    block_depth: usize,
    include_depth: usize,
) -> RescompResult<()> {
    let mut keep = true;
    let mut token = tokens.next()?;

    // `"key" [$COND] { ... }` - condition between key and block.
    if let Some(Token::Cond(cond)) = &token {
        keep = evaluate_condition(cond, conditions);
        token = tokens.next()?;
    }

    match token {
        Some(Token::Open) => {
            let mut children = Vec::new();
            parse_items(
                tokens,
                &mut children,
                loader,
                conditions,
                block_depth + 1,
                include_depth,
            )?;
            if keep {
                insert_node(dest, KvNode::Container { name: key, children });
            }
        }
        Some(Token::Text { value, .. }) => {
            // `"key" "value" [$COND]` - condition after the pair.
            if let Some(Token::Cond(cond)) = tokens.peek()? {
                tokens.next()?;
                keep = keep && evaluate_condition(&cond, conditions);
            }
            if keep {
                insert_node(dest, KvNode::Scalar { name: key, value });
            }
        }
        _ => return Err(tokens.malformed(format!("key \"{}\" has no value or block", key))),
    }

    Ok(())
}

/// Evaluate a bracket condition (`$WIN32`, `!$X360`, `$A&&$B`, `$A||$B`)
/// against the build-condition set. `||` binds looser than `&&`.
fn evaluate_condition(cond: &str, conditions: &HashSet<String>) -> bool {
    if cond.trim().is_empty() {
        return true;
    }
    cond.split("||").any(|clause| {
        clause.split("&&").all(|term| {
            let term = term.trim();
            let (negated, term) = match term.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, term),
            };
            let name = term.trim().trim_start_matches('$').to_ascii_uppercase();
            conditions.contains(&name) != negated
        })
    })
}

/// Merge a directive-loaded document into `dest`.
fn merge_nodes(dest: &mut Vec<KvNode>, loaded: Vec<KvNode>, kind: DirectiveKind) {
    for node in loaded {
        match kind {
            DirectiveKind::Include => insert_node(dest, node),
            DirectiveKind::Base => insert_fallback(dest, node),
        }
    }
}

/// Sibling collision policy: names compare ASCII-case-insensitively,
/// containers merge recursively, a later scalar wins.
fn insert_node(dest: &mut Vec<KvNode>, node: KvNode) {
    match dest
        .iter()
        .position(|n| n.name().eq_ignore_ascii_case(node.name()))
    {
        Some(i) if dest[i].is_container() && node.is_container() => {
            if let (
                KvNode::Container { children, .. },
                KvNode::Container {
                    children: incoming, ..
                },
            ) = (&mut dest[i], node)
            {
                for child in incoming {
                    insert_node(children, child);
                }
            }
        }
        Some(i) => dest[i] = node,
        None => dest.push(node),
    }
}

/// `#base` merge: existing keys win, containers still merge recursively.
fn insert_fallback(dest: &mut Vec<KvNode>, node: KvNode) {
    match dest
        .iter()
        .position(|n| n.name().eq_ignore_ascii_case(node.name()))
    {
        Some(i) if dest[i].is_container() && node.is_container() => {
            if let (
                KvNode::Container { children, .. },
                KvNode::Container {
                    children: incoming, ..
                },
            ) = (&mut dest[i], node)
            {
                for child in incoming {
                    insert_fallback(children, child);
                }
            }
        }
        Some(_) => {}
        None => dest.push(node),
    }
}
