//! `{name}` placeholder handling shared by the HTTP and shell adapters.
//!
//! Rendering is a single pass over the template: substituted values are never
//! scanned again, so a value that itself looks like `{other}` stays literal.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\$?)\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex"))
}

/// `${NAME}` is an environment reference, not a placeholder.
fn is_env_reference(cap: &Captures) -> bool {
    cap.get(1).is_some_and(|m| !m.as_str().is_empty())
}

/// Names referenced by `{name}` placeholders, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    placeholder_regex()
        .captures_iter(template)
        .filter(|cap| !is_env_reference(cap))
        .filter_map(|cap| cap.get(2).map(|m| m.as_str()))
        .collect()
}

/// If the whole token is one placeholder, return its name.
pub fn sole_placeholder(token: &str) -> Option<&str> {
    let cap = placeholder_regex().captures(token)?;
    let whole = cap.get(0)?;
    if !is_env_reference(&cap) && whole.start() == 0 && whole.end() == token.len() {
        cap.get(2).map(|m| m.as_str())
    } else {
        None
    }
}

/// Replace every placeholder with its argument value. Absent arguments render
/// as an empty string; `${NAME}` is left untouched.
pub fn render(template: &str, arguments: &Map<String, Value>) -> String {
    let rendered = render_with(template, arguments, |_, value| {
        Ok::<_, Infallible>(value.map(value_to_string).unwrap_or_default())
    });
    match rendered {
        Ok(text) => text,
        Err(never) => match never {},
    }
}

/// Like [`render`], but each substitution is produced by `encode`, which gets
/// the byte offset of the placeholder in `template` and the argument value
/// (`None` when absent).
pub fn render_with<E>(
    template: &str,
    arguments: &Map<String, Value>,
    mut encode: impl FnMut(usize, Option<&Value>) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for cap in placeholder_regex().captures_iter(template) {
        if is_env_reference(&cap) {
            continue;
        }
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(2)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        out.push_str(&encode(whole.start(), arguments.get(name.as_str()))?);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Split a command line into argv tokens.
///
/// Whitespace separates tokens; single and double quotes group. There is no
/// escaping, variable expansion or globbing: the template is split once, and
/// argument values are later rendered into individual tokens.
pub fn split_command(command: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in command.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("unterminated {} quote in command '{}'", q, command));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
