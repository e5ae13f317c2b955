//! Indentation-aware lexer for the restricted scripting subset.
//!
//! Produces a flat token stream with `Indent`/`Dedent` markers synthesized
//! from leading whitespace, the way CPython's tokenizer does, so the parser
//! never has to look at raw columns.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Keyword(&'static str),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    Eof,
}

/// A token paired with its 0-based source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub line: u32,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

const KEYWORDS: &[&str] = &[
    "def", "class", "return", "if", "elif", "else", "while", "for", "in", "not", "and", "or", "is", "True", "False",
    "None", "pass", "break", "continue", "import", "from", "as", "global",
];

const OPERATORS: &[&str] = &[
    "**=", "//=", "**", "//", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=", "->", "(", ")", "[", "]", "{",
    "}", ":", ",", ".", "+", "-", "*", "/", "%", "=", "<", ">",
];

pub fn lex(source: &str) -> Result<Vec<Spanned>, LexError> {
    let mut tokens = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    let mut paren_depth: i32 = 0;
    let mut at_line_start = true;
    let mut pending_logical_line_has_tokens = false;

    let lines: Vec<&str> = source.split('\n').collect();
    for (line_no, raw_line) in lines.iter().enumerate() {
        let line = line_no as u32;
        let mut chars = raw_line.char_indices().peekable();

        if at_line_start && paren_depth == 0 {
            let mut col = 0usize;
            while let Some(&(_, c)) = chars.peek() {
                if c == ' ' {
                    col += 1;
                    chars.next();
                } else if c == '\t' {
                    col += 8 - (col % 8);
                    chars.next();
                } else {
                    break;
                }
            }
            let rest = &raw_line[chars.peek().map_or(raw_line.len(), |&(i, _)| i)..];
            if rest.is_empty() || rest.trim_start().starts_with('#') {
                // blank or comment-only line: no indent change, no tokens
                continue;
            }
            let current = *indents.last().unwrap();
            if col > current {
                indents.push(col);
                tokens.push(Spanned { token: Token::Indent, line });
            } else {
                while col < *indents.last().unwrap() {
                    indents.pop();
                    tokens.push(Spanned { token: Token::Dedent, line });
                }
                if col != *indents.last().unwrap() {
                    return Err(LexError { message: "inconsistent indentation".into(), line });
                }
            }
            at_line_start = false;
        }

        while let Some(&(i, c)) = chars.peek() {
            if c == '#' {
                break;
            }
            if c == ' ' || c == '\t' {
                chars.next();
                continue;
            }
            if c == '\\' && i == raw_line.len() - c.len_utf8() {
                // line continuation: swallow, rest handled by next source line
                chars.next();
                break;
            }
            if c.is_ascii_digit() {
                let start = i;
                let mut end = i;
                let mut is_float = false;
                while let Some(&(j, d)) = chars.peek() {
                    if d.is_ascii_digit() {
                        end = j + d.len_utf8();
                        chars.next();
                    } else if d == '.' && !is_float {
                        is_float = true;
                        end = j + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &raw_line[start..end];
                if is_float {
                    let value: f64 = text.parse().map_err(|_| LexError { message: format!("bad float literal {text}"), line })?;
                    tokens.push(Spanned { token: Token::Float(value), line });
                } else {
                    let value: i64 = text.parse().map_err(|_| LexError { message: format!("bad int literal {text}"), line })?;
                    tokens.push(Spanned { token: Token::Int(value), line });
                }
                pending_logical_line_has_tokens = true;
                continue;
            }
            if c.is_alphabetic() || c == '_' {
                let start = i;
                let mut end = i;
                while let Some(&(j, d)) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        end = j + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &raw_line[start..end];
                if let Some(&kw) = KEYWORDS.iter().find(|k| **k == text) {
                    tokens.push(Spanned { token: Token::Keyword(kw), line });
                } else {
                    tokens.push(Spanned { token: Token::Name(text.to_owned()), line });
                }
                pending_logical_line_has_tokens = true;
                continue;
            }
            if c == '"' || c == '\'' {
                let quote = c;
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, ch)) if ch == quote => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, '\\')) => value.push('\\'),
                            Some((_, q)) if q == '\'' || q == '"' => value.push(q),
                            Some((_, other)) => value.push(other),
                            None => return Err(LexError { message: "unterminated string escape".into(), line }),
                        },
                        Some((_, ch)) => value.push(ch),
                        None => return Err(LexError { message: "unterminated string literal".into(), line }),
                    }
                }
                tokens.push(Spanned { token: Token::Str(value), line });
                pending_logical_line_has_tokens = true;
                continue;
            }
            if c == '(' || c == '[' || c == '{' {
                paren_depth += 1;
            } else if c == ')' || c == ']' || c == '}' {
                paren_depth -= 1;
            }
            let rest = &raw_line[i..];
            if let Some(&op) = OPERATORS.iter().find(|op| rest.starts_with(*op)) {
                for _ in 0..op.chars().count() {
                    chars.next();
                }
                tokens.push(Spanned { token: Token::Op(op), line });
                pending_logical_line_has_tokens = true;
                continue;
            }
            return Err(LexError { message: format!("unexpected character '{c}'"), line });
        }

        if paren_depth <= 0 {
            if pending_logical_line_has_tokens {
                tokens.push(Spanned { token: Token::Newline, line });
                pending_logical_line_has_tokens = false;
            }
            at_line_start = true;
        }
    }

    let last_line = lines.len().saturating_sub(1) as u32;
    while indents.len() > 1 {
        indents.pop();
        tokens.push(Spanned { token: Token::Dedent, line: last_line });
    }
    tokens.push(Spanned { token: Token::Eof, line: last_line });
    Ok(tokens)
}
