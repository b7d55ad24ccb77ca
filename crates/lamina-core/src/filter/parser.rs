//! Recursive-descent parser for filter text.
//!
//! Grammar (whitespace between tokens is ignored):
//!
//! ```text
//! expr  := term ('*' term)*
//! term  := label | '(' expr ')' '^' count
//! label := [A-Za-z0-9]{1,16}
//! count := [0-9]+            (1..=10000)
//! ```
//!
//! Groups may nest to any depth; the expander bounds the total layer count
//! ([`super::expand::MAX_EXPANDED_LAYERS`]). An empty or all-whitespace text parses to
//! an empty sequence.

use super::{ExpandError, MAX_LABEL_LEN};

/// Largest accepted repetition count.
pub const MAX_REPEAT: u32 = 10_000;

/// Parsed filter text.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Terms joined by `*`, in order.
    Sequence(Vec<FilterExpr>),
    /// `(body)^count`.
    Repeat { body: Box<FilterExpr>, count: u32 },
    /// A material or array label.
    Reference(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Star,
    Open,
    Close,
    Caret,
}

/// Token with its 1-based column.
type Spanned = (Token, usize);

fn tokenize(text: &str) -> Result<Vec<Spanned>, ExpandError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let column = i + 1;
        match c {
            '*' => tokens.push((Token::Star, column)),
            '(' => tokens.push((Token::Open, column)),
            ')' => tokens.push((Token::Close, column)),
            '^' => tokens.push((Token::Caret, column)),
            c if c.is_whitespace() => {}
            c if c.is_ascii_alphanumeric() => {
                let mut word = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if !next.is_ascii_alphanumeric() {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push((Token::Word(word), column));
            }
            other => {
                return Err(ExpandError::malformed(
                    column,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end_column: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn column(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.end_column, |&(_, column)| column)
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ExpandError> {
        let column = self.column();
        match self.next() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, _)) => Err(ExpandError::malformed(
                column,
                format!("expected {}, found {}", what, describe(&token)),
            )),
            None => Err(ExpandError::malformed(
                column,
                format!("expected {}, found end of text", what),
            )),
        }
    }

    fn expr(&mut self) -> Result<FilterExpr, ExpandError> {
        let mut terms = vec![self.term()?];
        while self.peek() == Some(&Token::Star) {
            self.next();
            terms.push(self.term()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            FilterExpr::Sequence(terms)
        })
    }

    fn term(&mut self) -> Result<FilterExpr, ExpandError> {
        let column = self.column();
        match self.next() {
            Some((Token::Word(label), _)) => {
                if label.len() > MAX_LABEL_LEN {
                    return Err(ExpandError::malformed(
                        column,
                        format!("label '{}' is longer than {} characters", label, MAX_LABEL_LEN),
                    ));
                }
                Ok(FilterExpr::Reference(label))
            }
            Some((Token::Open, _)) => {
                let body = self.expr()?;
                self.expect(Token::Close, "')'")?;
                self.expect(Token::Caret, "'^' after group")?;
                let count = self.count()?;
                Ok(FilterExpr::Repeat {
                    body: Box::new(body),
                    count,
                })
            }
            Some((token, _)) => Err(ExpandError::malformed(
                column,
                format!("expected a label or '(', found {}", describe(&token)),
            )),
            None => Err(ExpandError::malformed(
                column,
                "expected a label or '(', found end of text",
            )),
        }
    }

    fn count(&mut self) -> Result<u32, ExpandError> {
        let column = self.column();
        let word = match self.next() {
            Some((Token::Word(word), _)) => word,
            _ => return Err(ExpandError::malformed(column, "expected a repetition count")),
        };
        let count: u32 = word
            .parse()
            .map_err(|_| ExpandError::malformed(column, format!("invalid repetition count '{}'", word)))?;
        if count == 0 || count > MAX_REPEAT {
            return Err(ExpandError::malformed(
                column,
                format!("repetition count {} outside 1..={}", count, MAX_REPEAT),
            ));
        }
        Ok(count)
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Word(w) => format!("'{}'", w),
        Token::Star => "'*'".into(),
        Token::Open => "'('".into(),
        Token::Close => "')'".into(),
        Token::Caret => "'^'".into(),
    }
}

/// Parse filter text into an expression tree.
pub fn parse(text: &str) -> Result<FilterExpr, ExpandError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Ok(FilterExpr::Sequence(Vec::new()));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end_column: text.len() + 1,
    };
    let expr = parser.expr()?;
    if let Some((token, column)) = parser.next() {
        return Err(ExpandError::malformed(
            column,
            format!("unexpected {} after complete expression", describe(&token)),
        ));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(label: &str) -> FilterExpr {
        FilterExpr::Reference(label.into())
    }

    #[test]
    fn test_single_label() {
        assert_eq!(parse("SiO2").unwrap(), r("SiO2"));
    }

    #[test]
    fn test_sequence_and_repeat() {
        let expr = parse("H * (L*H)^3 * Sub").unwrap();
        assert_eq!(
            expr,
            FilterExpr::Sequence(vec![
                r("H"),
                FilterExpr::Repeat {
                    body: Box::new(FilterExpr::Sequence(vec![r("L"), r("H")])),
                    count: 3,
                },
                r("Sub"),
            ])
        );
    }

    #[test]
    fn test_nested_groups() {
        let expr = parse("((A*B)^2*C)^2").unwrap();
        let FilterExpr::Repeat { body, count: 2 } = expr else {
            panic!("expected outer repeat");
        };
        let FilterExpr::Sequence(items) = *body else {
            panic!("expected sequence");
        };
        assert!(matches!(items[0], FilterExpr::Repeat { count: 2, .. }));
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(parse("   ").unwrap(), FilterExpr::Sequence(vec![]));
    }

    #[test]
    fn test_malformed_inputs() {
        for text in [
            "(A*B",
            "A*B)",
            "(A*B)",
            "(A*B)^",
            "(A*B)^0",
            "(A*B)^x",
            "(A)^10001",
            "A**B",
            "A*",
            "*A",
            "A B",
            "A+B",
            "A*ABCDEFGHIJKLMNOPQ",
            "()^2",
        ] {
            assert!(
                matches!(parse(text), Err(ExpandError::MalformedExpression { .. })),
                "'{}' should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_error_column() {
        let err = parse("A*B$").unwrap_err();
        assert_eq!(
            err,
            ExpandError::MalformedExpression {
                column: 4,
                message: "unexpected character '$'".into()
            }
        );
    }
}
