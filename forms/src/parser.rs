//! Parser for GraphQL fragment documents.
//!
//! Only the subset needed to describe form data is supported: fragment
//! definitions, nested field selections and fragment spreads. Commas and
//! `#` comments are ignored as in GraphQL.

use crate::{
    error::ParseError,
    fragment::{Fragment, Selection},
};

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Name(String),
    LBrace,
    RBrace,
    Spread,
    Eof,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Name(name) => format!("{name:?}"),
            TokenKind::LBrace => "\"{\"".to_string(),
            TokenKind::RBrace => "\"}\"".to_string(),
            TokenKind::Spread => "\"...\"".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
    column: usize,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_ignored(&mut self) {
        while let Some(&c) = self.chars.peek() {
            match c {
                c if c.is_whitespace() || c == ',' => {
                    self.next_char();
                }
                '#' => {
                    while let Some(c) = self.next_char() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_ignored();

        let (line, column) = (self.line, self.column);
        let token = |kind| Token { kind, line, column };

        let Some(c) = self.next_char() else {
            return Ok(token(TokenKind::Eof));
        };

        let kind = match c {
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '.' => {
                for _ in 0..2 {
                    if self.next_char() != Some('.') {
                        return Err(ParseError::new("expected \"...\"", line, column));
                    }
                }
                TokenKind::Spread
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                let mut name = c.to_string();
                while let Some(&c) = self.chars.peek() {
                    if c == '_' || c.is_ascii_alphanumeric() {
                        name.push(c);
                        self.next_char();
                    } else {
                        break;
                    }
                }
                TokenKind::Name(name)
            }
            c => {
                return Err(ParseError::new(
                    format!("unexpected character {c:?}"),
                    line,
                    column,
                ))
            }
        };

        Ok(token(kind))
    }
}

/// Deepest selection set nesting accepted
const MAX_DEPTH: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always ends with Eof, and pos never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn unexpected(token: &Token, expected: &str) -> ParseError {
        ParseError::new(
            format!("expected {expected}, found {}", token.kind.describe()),
            token.line,
            token.column,
        )
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<(), ParseError> {
        let token = self.advance();
        if token.kind != kind {
            return Err(Self::unexpected(&token, expected));
        }
        Ok(())
    }

    fn name(&mut self) -> Result<String, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Name(name) => Ok(name),
            _ => Err(Self::unexpected(&token, "a name")),
        }
    }

    fn keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Name(name) if name == keyword => Ok(()),
            _ => Err(Self::unexpected(&token, &format!("{keyword:?}"))),
        }
    }

    fn document(&mut self) -> Result<Vec<Fragment>, ParseError> {
        let mut fragments = vec![];
        while self.peek().kind != TokenKind::Eof {
            fragments.push(self.fragment()?);
        }

        if fragments.is_empty() {
            let token = self.peek();
            return Err(Self::unexpected(token, "a fragment definition"));
        }

        Ok(fragments)
    }

    fn fragment(&mut self) -> Result<Fragment, ParseError> {
        self.keyword("fragment")?;
        let name = self.name()?;
        if name == "on" {
            let token = &self.tokens[self.pos - 1];
            return Err(ParseError::new(
                "fragment cannot be named \"on\"",
                token.line,
                token.column,
            ));
        }
        self.keyword("on")?;
        let type_condition = self.name()?;
        let selections = self.selection_set(1)?;

        Ok(Fragment {
            name,
            type_condition,
            selections,
        })
    }

    fn selection_set(&mut self, depth: usize) -> Result<Vec<Selection>, ParseError> {
        if depth > MAX_DEPTH {
            let token = self.peek();
            return Err(ParseError::new(
                "selection set nested too deeply",
                token.line,
                token.column,
            ));
        }
        self.expect(TokenKind::LBrace, "\"{\"")?;

        let mut selections = vec![];
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::RBrace if !selections.is_empty() => break,
                TokenKind::Spread => selections.push(Selection::Spread { name: self.name()? }),
                TokenKind::Name(name) => {
                    let selections_ = if self.peek().kind == TokenKind::LBrace {
                        self.selection_set(depth + 1)?
                    } else {
                        vec![]
                    };
                    selections.push(Selection::Field {
                        name,
                        selections: selections_,
                    });
                }
                _ => return Err(Self::unexpected(&token, "a field or fragment spread")),
            }
        }

        Ok(selections)
    }
}

/// Parses every fragment definition in `input`
pub fn parse_fragments(input: &str) -> Result<Vec<Fragment>, ParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    Parser { tokens, pos: 0 }.document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_fragment() {
        let fragments = parse_fragments(
            r#"
            # form fields
            fragment MovieItem on Movie {
                _id, name
                director { name }
                ...MovieDates
            }
            "#,
        )
        .unwrap();

        assert_eq!(
            fragments,
            vec![Fragment::new(
                "MovieItem",
                "Movie",
                vec![
                    Selection::field("_id"),
                    Selection::field("name"),
                    Selection::Field {
                        name: "director".to_string(),
                        selections: vec![Selection::field("name")],
                    },
                    Selection::Spread {
                        name: "MovieDates".to_string()
                    },
                ],
            )]
        );
    }

    #[test]
    fn test_parse_multiple() {
        let fragments =
            parse_fragments("fragment A on Movie { _id } fragment B on Movie { name }").unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].name, "B");
    }

    #[test]
    fn test_roundtrip_display() {
        let source = "fragment MovieItem on Movie {\n  _id\n  director {\n    name\n  }\n}";
        let fragments = parse_fragments(source).unwrap();
        assert_eq!(fragments[0].to_graphql(), source);
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| {
            format!(
                "fragment A on Movie {{ {} b {} }}",
                "a { ".repeat(depth),
                "} ".repeat(depth)
            )
        };

        let fragments = parse_fragments(&nested(MAX_DEPTH - 1)).unwrap();
        assert_eq!(fragments[0].field_names(), vec!["a"]);

        let err = parse_fragments(&nested(MAX_DEPTH)).unwrap_err();
        assert_eq!(err.message, "selection set nested too deeply");
        assert_eq!(err.line, 1);

        let err = parse_fragments(&nested(200_000)).unwrap_err();
        assert_eq!(err.message, "selection set nested too deeply");
    }

    #[test]
    fn test_errors() {
        let err = parse_fragments("").unwrap_err();
        assert_eq!(err.message, "expected a fragment definition, found end of input");

        let err = parse_fragments("fragment A on Movie {}").unwrap_err();
        assert_eq!(err.message, "expected a field or fragment spread, found \"}\"");
        assert_eq!((err.line, err.column), (1, 22));

        let err = parse_fragments("fragment A on Movie {\n  name(id: 1)\n}").unwrap_err();
        assert_eq!(err.message, "unexpected character '('");
        assert_eq!((err.line, err.column), (2, 7));

        let err = parse_fragments("query A { name }").unwrap_err();
        assert_eq!(err.message, "expected \"fragment\", found \"query\"");

        let err = parse_fragments("fragment A on Movie { name").unwrap_err();
        assert_eq!(
            err.message,
            "expected a field or fragment spread, found end of input"
        );
    }
}
