//! Query tokenizer.

use crate::core::error::{TesseraError, TesseraResult};

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare identifier or keyword.
    Ident(String),
    /// Double-quoted identifier; never a keyword.
    QuotedIdent(String),
    Int(i64),
    Float(f64),
    /// Single-quoted string literal.
    Str(String),
    /// Positional parameter `$n` (1-based).
    Param(usize),
    Comma,
    Dot,
    Slash,
    Star,
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Token {
    /// Whether this is the given keyword, ignoring case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Self::Ident(word) if word.eq_ignore_ascii_case(keyword))
    }
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

fn syntax(offset: usize, message: impl Into<String>) -> TesseraError {
    TesseraError::QuerySyntax {
        offset,
        message: message.into(),
    }
}

/// Split query text into tokens.
pub fn tokenize(text: &str) -> TesseraResult<Vec<Spanned>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let c = bytes[pos];

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let token = match c {
            b',' => {
                pos += 1;
                Token::Comma
            }
            b'.' if !bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                pos += 1;
                Token::Dot
            }
            b'/' => {
                pos += 1;
                Token::Slash
            }
            b'*' => {
                pos += 1;
                Token::Star
            }
            b'(' => {
                pos += 1;
                Token::LParen
            }
            b')' => {
                pos += 1;
                Token::RParen
            }
            b'=' => {
                pos += 1;
                Token::Eq
            }
            b'!' if bytes.get(pos + 1) == Some(&b'=') => {
                pos += 2;
                Token::Ne
            }
            b'<' => match bytes.get(pos + 1) {
                Some(b'=') => {
                    pos += 2;
                    Token::Le
                }
                Some(b'>') => {
                    pos += 2;
                    Token::Ne
                }
                _ => {
                    pos += 1;
                    Token::Lt
                }
            },
            b'>' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    pos += 2;
                    Token::Ge
                } else {
                    pos += 1;
                    Token::Gt
                }
            }
            b'$' => {
                pos += 1;
                let digits = take_while(bytes, &mut pos, |b| b.is_ascii_digit());
                match digits.parse::<usize>() {
                    Ok(n) if n > 0 => Token::Param(n),
                    _ => return Err(syntax(start, "parameter must be $1 or higher")),
                }
            }
            b'\'' => Token::Str(quoted(text, &mut pos, b'\'')?),
            b'"' => Token::QuotedIdent(quoted(text, &mut pos, b'"')?),
            b'-' | b'.' | b'0'..=b'9' => number(bytes, &mut pos)?,
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let word = take_while(bytes, &mut pos, |b| b.is_ascii_alphanumeric() || b == b'_');
                Token::Ident(word.to_string())
            }
            _ => {
                let ch = text[start..].chars().next().unwrap_or('?');
                return Err(syntax(start, format!("unexpected character '{ch}'")));
            }
        };

        tokens.push(Spanned {
            token,
            offset: start,
        });
    }

    Ok(tokens)
}

fn take_while<'a>(bytes: &'a [u8], pos: &mut usize, pred: impl Fn(u8) -> bool) -> &'a str {
    let start = *pos;
    while *pos < bytes.len() && pred(bytes[*pos]) {
        *pos += 1;
    }
    // Only ASCII bytes satisfy the predicates used here.
    std::str::from_utf8(&bytes[start..*pos]).unwrap_or_default()
}

/// Read a quoted run; a doubled quote stands for itself.
fn quoted(text: &str, pos: &mut usize, quote: u8) -> TesseraResult<String> {
    let bytes = text.as_bytes();
    let start = *pos;
    *pos += 1;
    let mut out = String::new();
    let mut run = *pos;

    loop {
        match bytes.get(*pos) {
            None => return Err(syntax(start, "unterminated quoted text")),
            Some(&b) if b == quote => {
                out.push_str(&text[run..*pos]);
                if bytes.get(*pos + 1) == Some(&quote) {
                    out.push(quote as char);
                    *pos += 2;
                    run = *pos;
                } else {
                    *pos += 1;
                    return Ok(out);
                }
            }
            Some(_) => *pos += 1,
        }
    }
}

fn number(bytes: &[u8], pos: &mut usize) -> TesseraResult<Token> {
    let start = *pos;
    if bytes[*pos] == b'-' {
        *pos += 1;
    }
    let mut is_float = false;
    while let Some(&b) = bytes.get(*pos) {
        match b {
            b'0'..=b'9' => {}
            b'.' if !is_float => is_float = true,
            b'e' | b'E' => {
                is_float = true;
                if matches!(bytes.get(*pos + 1), Some(b'+' | b'-')) {
                    *pos += 1;
                }
            }
            _ => break,
        }
        *pos += 1;
    }

    let text = std::str::from_utf8(&bytes[start..*pos]).unwrap_or_default();
    // Trailing type suffixes such as 5d or 5L.
    if matches!(bytes.get(*pos), Some(b'd' | b'D' | b'f' | b'F')) {
        *pos += 1;
        is_float = true;
    } else if matches!(bytes.get(*pos), Some(b'l' | b'L')) {
        *pos += 1;
    }

    let parsed = if is_float {
        text.parse::<f64>().ok().map(Token::Float)
    } else {
        text.parse::<i64>().ok().map(Token::Int)
    };
    parsed.ok_or_else(|| syntax(start, format!("invalid number '{text}'")))
}
