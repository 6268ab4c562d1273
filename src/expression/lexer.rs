//! Tokenizer for metric and threshold expressions

use super::ExpressionError;

/// Lexical token with its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    And,
    Or,
    Not,
}

impl TokenKind {
    /// Human readable form used in error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::Plus => "'+'".into(),
            TokenKind::Minus => "'-'".into(),
            TokenKind::Star => "'*'".into(),
            TokenKind::Slash => "'/'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::Lt => "'<'".into(),
            TokenKind::Le => "'<='".into(),
            TokenKind::Gt => "'>'".into(),
            TokenKind::Ge => "'>='".into(),
            TokenKind::EqEq => "'=='".into(),
            TokenKind::NotEq => "'!='".into(),
            TokenKind::And => "'and'".into(),
            TokenKind::Or => "'or'".into(),
            TokenKind::Not => "'not'".into(),
        }
    }
}

/// Split an expression into tokens.
///
/// `and`, `or` and `not` are keywords; `&&`, `||` and `!` are accepted as aliases.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch.is_ascii_digit() || ch == '.' {
            let mut end = offset;
            let mut seen_exponent = false;
            while let Some(&(i, c)) = chars.peek() {
                let exponent_sign = seen_exponent
                    && (c == '+' || c == '-')
                    && matches!(source[..i].chars().last(), Some('e') | Some('E'));
                if c.is_ascii_digit() || c == '.' || exponent_sign {
                    end = i + c.len_utf8();
                    chars.next();
                } else if (c == 'e' || c == 'E') && !seen_exponent {
                    seen_exponent = true;
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let literal = &source[offset..end];
            let value: f64 = literal.parse().map_err(|_| ExpressionError::InvalidNumber {
                literal: literal.to_string(),
                offset,
            })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                offset,
            });
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let mut end = offset;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let word = &source[offset..end];
            let kind = match word {
                "and" => TokenKind::And,
                "or" => TokenKind::Or,
                "not" => TokenKind::Not,
                _ => TokenKind::Ident(word.to_string()),
            };
            tokens.push(Token { kind, offset });
            continue;
        }

        chars.next();
        let next = chars.peek().map(|&(_, c)| c);
        let (kind, consumed_next) = match (ch, next) {
            ('+', _) => (TokenKind::Plus, false),
            ('-', _) => (TokenKind::Minus, false),
            ('*', _) => (TokenKind::Star, false),
            ('/', _) => (TokenKind::Slash, false),
            ('(', _) => (TokenKind::LParen, false),
            (')', _) => (TokenKind::RParen, false),
            (',', _) => (TokenKind::Comma, false),
            ('<', Some('=')) => (TokenKind::Le, true),
            ('<', _) => (TokenKind::Lt, false),
            ('>', Some('=')) => (TokenKind::Ge, true),
            ('>', _) => (TokenKind::Gt, false),
            ('=', Some('=')) => (TokenKind::EqEq, true),
            ('!', Some('=')) => (TokenKind::NotEq, true),
            ('!', _) => (TokenKind::Not, false),
            ('&', Some('&')) => (TokenKind::And, true),
            ('|', Some('|')) => (TokenKind::Or, true),
            _ => return Err(ExpressionError::UnexpectedChar { ch, offset }),
        };
        if consumed_next {
            chars.next();
        }
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_ratio() {
        assert_eq!(
            kinds("r / g"),
            vec![
                TokenKind::Ident("r".into()),
                TokenKind::Slash,
                TokenKind::Ident("g".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_comparisons() {
        assert_eq!(
            kinds("1.5 <= value != 2"),
            vec![
                TokenKind::Number(1.5),
                TokenKind::Le,
                TokenKind::Ident("value".into()),
                TokenKind::NotEq,
                TokenKind::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_tokenize_keywords_and_aliases() {
        assert_eq!(
            kinds("and && or || not !"),
            vec![
                TokenKind::And,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Not,
            ]
        );
    }

    #[test]
    fn test_tokenize_exponent() {
        assert_eq!(kinds("1e-3"), vec![TokenKind::Number(0.001)]);
        assert_eq!(kinds("2.5E2"), vec![TokenKind::Number(250.0)]);
    }

    #[test]
    fn test_tokenize_rejects_code() {
        assert!(matches!(
            tokenize("__import__('os')"),
            Err(ExpressionError::UnexpectedChar { ch: '\'', .. })
        ));
        assert!(matches!(
            tokenize("r; g"),
            Err(ExpressionError::UnexpectedChar { ch: ';', offset: 1 })
        ));
    }

    #[test]
    fn test_tokenize_invalid_number() {
        assert!(matches!(
            tokenize("1.2.3"),
            Err(ExpressionError::InvalidNumber { .. })
        ));
    }
}
