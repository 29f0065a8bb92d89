//! Tokenizer for setting `value` expression strings.

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Null,
    True,
    False,
    Or,
    And,
    Not,
    If,
    Else,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    NotEq,
    Comma,
    LParen,
    RParen,
}

fn parse_err(message: impl Into<String>) -> CoreError {
    CoreError::ExprParse { message: message.into() }
}

pub fn lex(src: &str) -> Result<Vec<Token>, CoreError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::StarStar);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
                continue;
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
                continue;
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
                continue;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                    continue;
                }
                return Err(parse_err("'=' must be followed by '=' "));
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                    continue;
                }
                return Err(parse_err("'!' must be followed by '=' "));
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
                continue;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
                continue;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
                continue;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
                continue;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
                continue;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
                continue;
            }
            '"' | '\'' => {
                let (text, consumed) = lex_string(&chars[i..])?;
                tokens.push(Token::Str(text));
                i += consumed;
                continue;
            }
            _ => {}
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(lex_number(&text)?);
            continue;
        }

        if c.is_alphabetic() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(lex_bareword(text));
            continue;
        }

        return Err(parse_err(format!("unexpected character '{c}'")));
    }

    Ok(tokens)
}

fn lex_number(text: &str) -> Result<Token, CoreError> {
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Token::Integer(i));
        }
    }
    text.parse::<f64>()
        .map(Token::Float)
        .map_err(|_| parse_err(format!("invalid numeric literal '{text}'")))
}

fn lex_bareword(text: String) -> Token {
    match text.as_str() {
        "or" => Token::Or,
        "and" => Token::And,
        "not" => Token::Not,
        "if" => Token::If,
        "else" => Token::Else,
        "null" => Token::Null,
        "true" => Token::True,
        "false" => Token::False,
        _ => Token::Ident(text),
    }
}

/// Consumes a quoted string starting at `chars[0]`; returns the decoded
/// text and the number of source characters consumed (including quotes).
fn lex_string(chars: &[char]) -> Result<(String, usize), CoreError> {
    let quote = chars[0];
    let mut out = String::new();
    let mut i = 1usize;

    loop {
        let Some(&c) = chars.get(i) else {
            return Err(parse_err("unterminated string literal"));
        };
        if c == quote {
            i += 1;
            break;
        }
        if c == '\\' {
            let Some(&escaped) = chars.get(i + 1) else {
                return Err(parse_err("unterminated escape in string literal"));
            };
            let decoded = match escaped {
                'b' => '\u{8}',
                'f' => '\u{c}',
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                other => other,
            };
            out.push(decoded);
            i += 2;
        } else {
            out.push(c);
            i += 1;
        }
    }

    Ok((out, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_operators_and_numbers() {
        let tokens = lex("5 + 3*4**test+2*3").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Integer(5),
                Token::Plus,
                Token::Integer(3),
                Token::Star,
                Token::Integer(4),
                Token::StarStar,
                Token::Ident("test".to_owned()),
                Token::Plus,
                Token::Integer(2),
                Token::Star,
                Token::Integer(3),
            ]
        );
    }

    #[test]
    fn lexes_keywords_distinctly_from_idents() {
        let tokens = lex("a if b else c").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("a".to_owned()),
                Token::If,
                Token::Ident("b".to_owned()),
                Token::Else,
                Token::Ident("c".to_owned()),
            ]
        );
    }

    #[test]
    fn string_literal_handles_escapes() {
        let tokens = lex(r#"'a\tb\qc'"#).unwrap();
        assert_eq!(tokens, vec![Token::Str("a\tbqc".to_owned())]);
    }

    #[test]
    fn number_falls_back_to_float_on_dot() {
        let tokens = lex("3.14").unwrap();
        assert_eq!(tokens, vec![Token::Float(3.14)]);
    }

    #[test]
    fn rejects_bare_equals() {
        assert!(lex("a = b").is_err());
    }
}
