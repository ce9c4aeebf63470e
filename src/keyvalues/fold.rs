//! Pre-parse identifier case-folding
//!
//! Any line of the shape `<quote?>IDENT<quote?> <[condition]?> { <comment?>`
//! has IDENT lowercased before the text reaches the parser. Sibling keys
//! that differ only in case therefore collide during deserialization. All
//! other lines pass through untouched.

/// Lowercase block identifiers in `text`, line by line.
pub fn fold_identifiers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut first = true;
    for line in text.lines() {
        if !first {
            out.push('\n');
        }
        first = false;
        match identifier_span(line) {
            Some((start, end)) => {
                out.push_str(&line[..start]);
                out.push_str(&line[start..end].to_lowercase());
                out.push_str(&line[end..]);
            }
            None => out.push_str(line),
        }
    }
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Byte span of the identifier when the whole line matches the fold
/// pattern; `None` otherwise.
fn identifier_span(line: &str) -> Option<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut pos = skip_spaces(bytes, 0);

    let quoted = pos < bytes.len() && bytes[pos] == b'"';
    if quoted {
        pos += 1;
    }

    let start = pos;
    while pos < bytes.len() && !matches!(bytes[pos], b'"' | b'{' | b'[' | b' ' | b'\t') {
        pos += 1;
    }
    if pos == start {
        return None;
    }
    let end = pos;

    if quoted {
        if pos >= bytes.len() || bytes[pos] != b'"' {
            return None;
        }
        pos += 1;
    }

    pos = skip_spaces(bytes, pos);
    if pos < bytes.len() && bytes[pos] == b'[' {
        let close = line[pos..].find(']')?;
        pos += close + 1;
        pos = skip_spaces(bytes, pos);
    }

    if pos >= bytes.len() || bytes[pos] != b'{' {
        return None;
    }
    pos = skip_spaces(bytes, pos + 1);

    if pos < bytes.len() && !line[pos..].starts_with("//") {
        return None;
    }

    Some((start, end))
}

fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t') {
        pos += 1;
    }
    pos
}
