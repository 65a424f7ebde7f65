//! Precedence-climbing parser for expression text

use super::{ExprNode, LookupPath, PathRoot, TemplatePart};
use crate::grammar::GrammarConfig;
use crate::lexer::{unescape, Lexer, Token, TokenKind};
use crate::value::{Color, CvuValue};
use cvu_core::ExpressionError;

/// Root segment that addresses the current item explicitly.
const ITEM_ROOT: &str = "dataItem";

pub(crate) fn parse_expression(source: &str, grammar: &GrammarConfig) -> Result<ExprNode, ExpressionError> {
    let tokens = Lexer::with_grammar(source, grammar)
        .tokenize()
        .map_err(|e| ExpressionError::Syntax {
            message: e.to_string(),
            column: e.column(),
        })?
        .into_iter()
        .filter(|t| t.kind != TokenKind::Newline)
        .collect();

    let mut parser = ExprParser {
        tokens,
        pos: 0,
        grammar,
    };
    let node = parser.parse_binary(0)?;
    if parser.current().kind != TokenKind::Eof {
        return Err(parser.error("end of expression"));
    }
    Ok(node)
}

/// Split a template body into text and `{expr}` parts. `\{` is a literal
/// brace; other escapes are applied to the text.
pub(crate) fn parse_template(raw: &str, grammar: &GrammarConfig) -> Result<Vec<TemplatePart>, ExpressionError> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = raw.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    text.push(unescape(escaped));
                }
            }
            '{' => {
                let start = i + 1;
                let mut quote: Option<char> = None;
                let mut end = None;
                while let Some((j, d)) = chars.next() {
                    match d {
                        '\\' if quote.is_some() => {
                            chars.next();
                        }
                        q @ ('"' | '\'') if quote.is_none() => quote = Some(q),
                        q if Some(q) == quote => quote = None,
                        '}' if quote.is_none() => {
                            end = Some(j);
                            break;
                        }
                        _ => {}
                    }
                }
                let end = end.ok_or(ExpressionError::Syntax {
                    message: "unterminated '{' in string template".to_string(),
                    column: i + 1,
                })?;

                if !text.is_empty() {
                    parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                }
                parts.push(TemplatePart::Expr(parse_expression(&raw[start..end], grammar)?));
            }
            _ => text.push(c),
        }
    }

    if !text.is_empty() {
        parts.push(TemplatePart::Text(text));
    }
    Ok(parts)
}

/// Turn a dotted identifier into a lookup path.
fn path_from_identifier(ident: &str) -> LookupPath {
    let mut segments: Vec<String> = ident.split('.').map(str::to_string).collect();
    if segments.first().map(String::as_str) == Some(ITEM_ROOT) {
        segments.remove(0);
        LookupPath {
            root: PathRoot::Item,
            segments,
        }
    } else {
        LookupPath {
            root: PathRoot::Argument,
            segments,
        }
    }
}

struct ExprParser<'g> {
    tokens: Vec<Token>,
    pos: usize,
    grammar: &'g GrammarConfig,
}

impl ExprParser<'_> {
    fn parse_binary(&mut self, min_precedence: u8) -> Result<ExprNode, ExpressionError> {
        let mut lhs = self.parse_unary()?;

        while let TokenKind::Operator(op) = self.current().kind {
            if op.precedence() < min_precedence {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(op.precedence() + 1)?;
            lhs = ExprNode::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ExprNode, ExpressionError> {
        if self.current().kind == TokenKind::Negation {
            self.advance();
            return Ok(ExprNode::Negation(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ExprNode, ExpressionError> {
        let kind = self.current().kind.clone();
        let node = match kind {
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_binary(0)?;
                self.expect_rparen()?;
                return Ok(inner);
            }
            TokenKind::Bool(b) => ExprNode::Literal(CvuValue::Bool(b)),
            TokenKind::Number(n) => ExprNode::Literal(CvuValue::Number(n)),
            TokenKind::String(s) => ExprNode::Literal(CvuValue::String(s)),
            TokenKind::Nil => ExprNode::Literal(CvuValue::Nil),
            TokenKind::Color(hex) => match Color::from_hex(&hex) {
                Some(color) => ExprNode::Literal(CvuValue::Color(color)),
                None => return Err(self.error("color")),
            },
            TokenKind::StringExpression(raw) => ExprNode::Template(parse_template(&raw, self.grammar)?),
            TokenKind::NamedIdentifier(path) => ExprNode::Lookup(LookupPath {
                root: PathRoot::Item,
                segments: path.split('.').map(str::to_string).collect(),
            }),
            TokenKind::Identifier(name) if name != "*" => {
                self.advance();
                if self.current().kind == TokenKind::LParen {
                    self.advance();
                    let args = self.parse_call_arguments()?;
                    return Ok(ExprNode::Call { name, args });
                }
                return Ok(ExprNode::Lookup(path_from_identifier(&name)));
            }
            _ => return Err(self.error("operand")),
        };
        self.advance();
        Ok(node)
    }

    /// Arguments after the opening paren, through the closing one.
    fn parse_call_arguments(&mut self) -> Result<Vec<ExprNode>, ExpressionError> {
        let mut args = Vec::new();
        if self.current().kind == TokenKind::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_binary(0)?);
            match self.current().kind {
                TokenKind::Comma => self.advance(),
                TokenKind::RParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(self.error("',' or ')'")),
            }
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ExpressionError> {
        if self.current().kind == TokenKind::RParen {
            self.advance();
            Ok(())
        } else {
            Err(self.error("')'"))
        }
    }

    fn current(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error(&self, expected: &str) -> ExpressionError {
        let token = self.current();
        ExpressionError::Syntax {
            message: format!("expected {}, found {}", expected, token.kind),
            column: token.span.column,
        }
    }
}
