//! Recursive-descent parser for `SELECT` statements.
//!
//! ```text
//! query      := SELECT [DISTINCT] projection FROM iter (',' iter)* [WHERE expr]
//! iter       := ['/'] region [[AS] alias] | path [[AS] alias]
//! projection := '*' | path
//! expr       := or
//! or         := and (OR and)*
//! and        := unary (AND unary)*
//! unary      := NOT unary | comparison
//! comparison := operand [op operand | IS [NOT] NULL]
//! operand    := literal | $n | path | '(' expr ')'
//! ```

use super::ast::{CompareOp, Expr, FromItem, Path, Projection, Query, Source};
use super::lexer::{tokenize, Spanned, Token};
use crate::core::error::{TesseraError, TesseraResult};
use crate::store::document::Document;

const RESERVED: &[&str] = &[
    "select", "distinct", "from", "where", "and", "or", "not", "is", "null", "true", "false",
    "as",
];

/// Maximum nesting of parentheses and `NOT` in a predicate.
const MAX_EXPR_DEPTH: usize = 64;

/// Parse query text.
pub fn parse(text: &str) -> TesseraResult<Query> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: text.len(),
        depth: 0,
    };
    let query = parser.query()?;
    if let Some(extra) = parser.peek() {
        return Err(parser.error_at(extra.offset, "unexpected trailing input"));
    }
    Ok(query)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.peek().map_or(self.end, |s| s.offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> TesseraError {
        TesseraError::QuerySyntax {
            offset,
            message: message.into(),
        }
    }

    fn error(&self, message: impl Into<String>) -> TesseraError {
        self.error_at(self.offset(), message)
    }

    fn enter(&mut self) -> TesseraResult<()> {
        if self.depth >= MAX_EXPR_DEPTH {
            return Err(self.error(format!(
                "expression nested deeper than {}",
                MAX_EXPR_DEPTH
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek_token().is_some_and(|t| t.is_keyword(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> TesseraResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", keyword.to_ascii_uppercase())))
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek_token() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn query(&mut self) -> TesseraResult<Query> {
        self.expect_keyword("select")?;
        let distinct = self.eat_keyword("distinct");

        let projection = if self.eat(&Token::Star) {
            Projection::All
        } else {
            Projection::Path(self.path()?)
        };

        self.expect_keyword("from")?;
        let mut from = vec![self.from_item(true)?];
        while self.eat(&Token::Comma) {
            from.push(self.from_item(false)?);
        }

        let filter = if self.eat_keyword("where") {
            Some(self.expr()?)
        } else {
            None
        };

        Ok(Query {
            distinct,
            projection,
            from,
            filter,
        })
    }

    fn from_item(&mut self, first: bool) -> TesseraResult<FromItem> {
        let source = if first {
            self.eat(&Token::Slash);
            Source::Region(self.ident()?)
        } else {
            Source::Path(self.path()?)
        };

        let alias = if self.eat_keyword("as") {
            Some(self.ident()?)
        } else if self.at_alias() {
            Some(self.ident()?)
        } else {
            None
        };

        Ok(FromItem { source, alias })
    }

    fn at_alias(&self) -> bool {
        match self.peek_token() {
            Some(Token::Ident(word)) => !is_reserved(word),
            Some(Token::QuotedIdent(_)) => true,
            _ => false,
        }
    }

    fn ident(&mut self) -> TesseraResult<String> {
        match self.peek_token() {
            Some(Token::Ident(word)) if !is_reserved(word) => {
                let word = word.clone();
                self.pos += 1;
                Ok(word)
            }
            Some(Token::QuotedIdent(word)) => {
                let word = word.clone();
                self.pos += 1;
                Ok(word)
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    fn path(&mut self) -> TesseraResult<Path> {
        let mut segments = vec![self.ident()?];
        while self.eat(&Token::Dot) {
            segments.push(self.ident()?);
        }
        Ok(Path { segments })
    }

    fn expr(&mut self) -> TesseraResult<Expr> {
        let mut lhs = self.and()?;
        while self.eat_keyword("or") {
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> TesseraResult<Expr> {
        let mut lhs = self.unary()?;
        while self.eat_keyword("and") {
            let rhs = self.unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> TesseraResult<Expr> {
        if self.eat_keyword("not") {
            self.enter()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> TesseraResult<Expr> {
        let lhs = self.operand()?;

        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            self.expect_keyword("null")?;
            return Ok(Expr::IsNull {
                expr: Box::new(lhs),
                negated,
            });
        }

        let op = match self.peek_token() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Ne) => CompareOp::Ne,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Ge) => CompareOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.operand()?;

        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn operand(&mut self) -> TesseraResult<Expr> {
        let offset = self.offset();
        match self.peek_token().cloned() {
            Some(Token::LParen) => {
                self.pos += 1;
                self.enter()?;
                let inner = self.expr()?;
                self.depth -= 1;
                if !self.eat(&Token::RParen) {
                    return Err(self.error("expected ')'"));
                }
                Ok(inner)
            }
            Some(Token::Int(n)) => {
                self.advance();
                Ok(Expr::Literal(Document::Int(n)))
            }
            Some(Token::Float(f)) => {
                self.advance();
                Ok(Expr::Literal(Document::Float(f)))
            }
            Some(Token::Str(s)) => {
                self.advance();
                Ok(Expr::Literal(Document::String(s)))
            }
            Some(Token::Param(n)) => {
                self.advance();
                Ok(Expr::Param(n))
            }
            Some(token) if token.is_keyword("true") => {
                self.advance();
                Ok(Expr::Literal(Document::Bool(true)))
            }
            Some(token) if token.is_keyword("false") => {
                self.advance();
                Ok(Expr::Literal(Document::Bool(false)))
            }
            Some(token) if token.is_keyword("null") => {
                self.advance();
                Ok(Expr::Literal(Document::Null))
            }
            Some(Token::Ident(_)) | Some(Token::QuotedIdent(_)) => Ok(Expr::Path(self.path()?)),
            Some(_) => Err(self.error_at(offset, "expected value")),
            None => Err(self.error_at(offset, "unexpected end of query")),
        }
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| word.eq_ignore_ascii_case(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unnest_query() {
        let query = parse(
            "SELECT book.displayprice FROM /regionA e, e.store.book book WHERE book.displayprice > $1",
        )
        .unwrap();

        assert_eq!(query.region(), "regionA");
        assert_eq!(query.from.len(), 2);
        assert_eq!(query.from[0].alias.as_deref(), Some("e"));
        assert_eq!(
            query.from[1].source,
            Source::Path(Path::new(["e", "store", "book"]))
        );
        assert_eq!(
            query.projection,
            Projection::Path(Path::new(["book", "displayprice"]))
        );
        assert_eq!(query.parameter_count(), 1);
    }

    #[test]
    fn test_parse_boolean_precedence() {
        let query = parse("select * from r where a = 1 or b = 2 and not c is null").unwrap();
        let Some(Expr::Or(_, rhs)) = query.filter else {
            panic!("expected OR at the root");
        };
        assert!(matches!(*rhs, Expr::And(_, _)));
    }

    #[test]
    fn test_parse_quoted_segments() {
        let query = parse(r#"SELECT e.store.bicycle."dash-notation" FROM regionA e"#).unwrap();
        assert_eq!(
            query.projection,
            Projection::Path(Path::new(["e", "store", "bicycle", "dash-notation"]))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("SELECT FROM r"),
            Err(TesseraError::QuerySyntax { .. })
        ));
        assert!(parse("SELECT * r").is_err());
        assert!(parse("SELECT * FROM r WHERE").is_err());
        assert!(parse("SELECT * FROM r extra junk").is_err());
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let nested = format!(
            "SELECT * FROM r WHERE {}a = 1{}",
            "(".repeat(5_000),
            ")".repeat(5_000)
        );
        assert!(matches!(parse(&nested), Err(TesseraError::QuerySyntax { .. })));

        let negated = format!("SELECT * FROM r WHERE {}a = 1", "NOT ".repeat(5_000));
        assert!(matches!(parse(&negated), Err(TesseraError::QuerySyntax { .. })));

        let shallow = format!(
            "SELECT * FROM r WHERE {}a = 1{}",
            "(".repeat(MAX_EXPR_DEPTH),
            ")".repeat(MAX_EXPR_DEPTH)
        );
        assert!(parse(&shallow).is_ok());
    }
}
