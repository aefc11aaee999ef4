//! Named-parameter compilation.
//!
//! Turns `INSERT INTO users (name) VALUES (:name)` into the positional form
//! `INSERT INTO users (name) VALUES (?)` plus the ordered list of names, so
//! drivers without native named parameters can bind a [`NamedArgs`] map.
//!
//! Rules:
//! - a name is `[A-Za-z0-9_.]+` following a single `:`
//! - `::` is an escaped literal `:`
//! - quoted literals (`'…'`, `"…"`, `` `…` ``) are copied verbatim

use thiserror::Error;

use crate::driver::value::{NamedArgs, Value};

/// Failure binding named arguments to a compiled query.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("missing named argument `{0}`")]
    Missing(String),

    #[error("unterminated quoted literal starting at byte {0}")]
    UnterminatedLiteral(usize),
}

/// A query rewritten to positional placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
    pub sql: String,
    pub names: Vec<String>,
}

impl NamedQuery {
    /// Resolve the ordered positional values from `args`.
    pub fn bind(&self, args: &NamedArgs) -> Result<Vec<Value>, BindError> {
        self.names
            .iter()
            .map(|name| {
                args.get(name)
                    .cloned()
                    .ok_or_else(|| BindError::Missing(name.clone()))
            })
            .collect()
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Compile `query`, emitting `placeholder` for every named parameter.
pub fn compile(query: &str, placeholder: &str) -> Result<NamedQuery, BindError> {
    let mut sql = String::with_capacity(query.len());
    let mut names = Vec::new();
    let mut chars = query.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                sql.push(c);
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    sql.push(inner);
                    if inner == c {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(BindError::UnterminatedLiteral(pos));
                }
            }
            ':' => match chars.peek() {
                Some((_, ':')) => {
                    chars.next();
                    sql.push(':');
                }
                Some((_, next)) if is_name_char(*next) => {
                    let mut name = String::new();
                    while let Some((_, n)) = chars.peek() {
                        if !is_name_char(*n) {
                            break;
                        }
                        name.push(*n);
                        chars.next();
                    }
                    sql.push_str(placeholder);
                    names.push(name);
                }
                _ => sql.push(':'),
            },
            _ => sql.push(c),
        }
    }

    Ok(NamedQuery { sql, names })
}
