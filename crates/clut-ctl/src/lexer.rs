//! Tokenizer.

use crate::{CtlError, CtlResult};

/// Token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    /// Identifier or keyword.
    Ident(String),
    /// Integer literal.
    Int(i64),
    /// Floating-point literal.
    Float(f64),
    /// String literal (only used by `import`).
    Str(String),
    /// Operator or punctuation.
    Punct(&'static str),
    /// End of input.
    Eof,
}

/// A token and the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Kind and payload.
    pub tok: Tok,
    /// 1-based line.
    pub line: usize,
}

/// Longest first, so `<=` wins over `<`.
const PUNCT: &[&str] = &[
    "+=", "-=", "*=", "/=", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+", "-", "*", "/", "%",
    "=", "<", ">", "!", "(", ")", "{", "}", "[", "]", ";", ",", "?", ":", ".",
];

/// Splits source text into tokens, dropping comments and whitespace.
pub fn tokenize(src: &str) -> CtlResult<Vec<Token>> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_ascii_whitespace() => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = line;
                i += 2;
                loop {
                    match bytes.get(i) {
                        None => {
                            return Err(CtlError::Lex { line: start, msg: "unterminated comment".into() });
                        }
                        Some(b'*') if bytes.get(i + 1) == Some(&b'/') => {
                            i += 2;
                            break;
                        }
                        Some(b'\n') => {
                            line += 1;
                            i += 1;
                        }
                        Some(_) => i += 1,
                    }
                }
            }
            b'"' => {
                let start = i + 1;
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\n' {
                    i += 1;
                }
                if bytes.get(i) != Some(&b'"') {
                    return Err(CtlError::Lex { line, msg: "unterminated string".into() });
                }
                out.push(Token { tok: Tok::Str(src[start..i].to_string()), line });
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                out.push(Token { tok: Tok::Ident(src[start..i].to_string()), line });
            }
            c if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) => {
                let (tok, len) = number(&src[i..], line)?;
                out.push(Token { tok, line });
                i += len;
            }
            _ => {
                let rest = &src[i..];
                let Some(p) = PUNCT.iter().find(|p| rest.starts_with(**p)) else {
                    let ch = rest.chars().next().unwrap_or('?');
                    return Err(CtlError::Lex { line, msg: format!("unexpected character '{}'", ch) });
                };
                out.push(Token { tok: Tok::Punct(p), line });
                i += p.len();
            }
        }
    }

    out.push(Token { tok: Tok::Eof, line });
    Ok(out)
}

/// Scans a numeric literal at the start of `s`.
fn number(s: &str, line: usize) -> CtlResult<(Tok, usize)> {
    let b = s.as_bytes();
    let mut i = 0;
    let mut float = false;

    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    if i < b.len() && b[i] == b'.' {
        float = true;
        i += 1;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if j < b.len() && (b[j] == b'+' || b[j] == b'-') {
            j += 1;
        }
        if j < b.len() && b[j].is_ascii_digit() {
            float = true;
            i = j;
            while i < b.len() && b[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    let text = &s[..i];
    let bad = || CtlError::Lex { line, msg: format!("bad number '{}'", text) };
    let tok = if float {
        Tok::Float(text.parse().map_err(|_| bad())?)
    } else {
        Tok::Int(text.parse().map_err(|_| bad())?)
    };

    // optional float suffix
    if i < b.len() && (b[i] == b'f' || b[i] == b'F') {
        let tok = match tok {
            Tok::Int(v) => Tok::Float(v as f64),
            t => t,
        };
        return Ok((tok, i + 1));
    }
    Ok((tok, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Tok> {
        tokenize(src).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 .5 1e3 2.0f 3f"),
            vec![
                Tok::Int(1),
                Tok::Float(2.5),
                Tok::Float(0.5),
                Tok::Float(1000.0),
                Tok::Float(2.0),
                Tok::Float(3.0),
                Tok::Eof
            ]
        );
    }

    #[test]
    fn test_operators_and_comments() {
        let toks = kinds("a <= b // note\n/* block\n */ c += 1;");
        assert_eq!(toks[1], Tok::Punct("<="));
        assert_eq!(toks[3], Tok::Ident("c".into()));
        assert_eq!(toks[4], Tok::Punct("+="));
    }

    #[test]
    fn test_lines() {
        let toks = tokenize("a\n/* x\ny */\nb").unwrap();
        assert_eq!(toks[0].line, 1);
        assert_eq!(toks[1].line, 4);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(tokenize("a @ b"), Err(CtlError::Lex { line: 1, .. })));
        assert!(tokenize("/* open").is_err());
        assert!(tokenize("\"open").is_err());
    }
}
