//! Normalized signal and slot signatures.
//!
//! Signatures registered by generated code and by dynamic subclasses are
//! compared textually, so both sides spell them the same way: no
//! whitespace except between two identifier characters, and `const T&`
//! parameters written as plain `T`.
//!
//! ```
//! use wrapgen_core::normalize_signature;
//!
//! assert_eq!(normalize_signature(" valueChanged ( const QString & , int )"), "valueChanged(QString,int)");
//! assert_eq!(normalize_signature("moved(unsigned  int)"), "moved(unsigned int)");
//! ```

fn is_ident(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space && is_ident(ch) && out.chars().last().is_some_and(is_ident) {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    out
}

/// Split a parameter list on commas outside template brackets.
fn split_parameters(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in list.char_indices() {
        match ch {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

fn normalize_parameter(param: &str) -> &str {
    match param.strip_prefix("const ").and_then(|p| p.strip_suffix('&')) {
        Some(inner) if !inner.ends_with('&') => inner,
        _ => param,
    }
}

/// Canonical spelling of `name(params)`.
pub fn normalize_signature(signature: &str) -> String {
    let collapsed = collapse_whitespace(signature);
    let (Some(open), Some(close)) = (collapsed.find('('), collapsed.rfind(')')) else {
        return collapsed;
    };
    if close < open {
        return collapsed;
    }
    let params = &collapsed[open + 1..close];
    let normalized: Vec<&str> = if params.is_empty() {
        Vec::new()
    } else {
        split_parameters(params).into_iter().map(normalize_parameter).collect()
    };
    format!("{}({}){}", &collapsed[..open], normalized.join(","), &collapsed[close + 1..])
}
