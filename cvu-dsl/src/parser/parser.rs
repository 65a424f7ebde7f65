//! Recursive descent parser for CVU source

use super::ast::*;
use crate::expression::Expression;
use crate::grammar::{default_grammar, GrammarConfig};
use crate::lexer::{Lexer, Operator, Span, Token, TokenKind};
use crate::value::{Color, CvuValue, PropertyDict};
use cvu_core::{Domain, ParseError, UIElementKind};
use tracing::trace;

// ============================================================================
// PARSER
// ============================================================================

/// Parser for CVU view definitions.
pub struct Parser<'g> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) grammar: &'g GrammarConfig,
    pub(crate) domain: Domain,
}

impl Parser<'static> {
    /// Create a parser over `tokens` using the default grammar.
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser::with_grammar(tokens, default_grammar())
    }
}

impl<'g> Parser<'g> {
    pub fn with_grammar(mut tokens: Vec<Token>, grammar: &'g GrammarConfig) -> Self {
        if tokens.last().map(|t| t.kind != TokenKind::Eof).unwrap_or(true) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                span,
            });
        }
        Self {
            tokens,
            pos: 0,
            grammar,
            domain: Domain::Defaults,
        }
    }

    /// Domain stamped on every parsed selector.
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    /// Parse `Selector* EOF`.
    pub fn parse(&mut self) -> Result<Vec<ViewSelector>, ParseError> {
        let mut selectors = Vec::new();

        loop {
            self.skip_newlines();
            if self.is_at_end() {
                break;
            }
            let selector = self.parse_selector()?;
            trace!(selector = %selector.selector, keys = selector.properties.len(), "parsed selector");
            selectors.push(selector);
        }

        Ok(selectors)
    }

    /// `Primary [':'] '{' PropertyDict '}'`
    fn parse_selector(&mut self) -> Result<ViewSelector, ParseError> {
        let (kind, name) = self.parse_primary()?;
        let properties = self.parse_block()?;
        Ok(ViewSelector::new(kind, name, self.domain).with_properties(properties))
    }

    fn parse_primary(&mut self) -> Result<(SelectorKind, Option<String>), ParseError> {
        match self.current().kind.clone() {
            TokenKind::Identifier(type_name) => {
                self.advance();
                let mut list = false;
                if self.check(&TokenKind::LBracket) {
                    self.advance();
                    self.expect(TokenKind::RBracket, "']'")?;
                    list = true;
                }
                Ok((SelectorKind::View(ViewTarget::Type { type_name, list }), None))
            }
            TokenKind::NamedIdentifier(name) | TokenKind::String(name) => {
                self.advance();
                Ok((SelectorKind::View(ViewTarget::Named), Some(name)))
            }
            TokenKind::LBracket => self.parse_bracket_selector(),
            _ => Err(self.unexpected("selector")),
        }
    }

    /// `'[' kind ['=' name] ']'`
    pub(crate) fn parse_bracket_selector(&mut self) -> Result<(SelectorKind, Option<String>), ParseError> {
        self.expect(TokenKind::LBracket, "'['")?;

        let span = self.current().span;
        let kind_name = self.expect_identifier()?;
        let kind = self
            .grammar
            .bracket_kind(&kind_name)
            .ok_or(ParseError::UnknownDefinition {
                name: kind_name,
                line: span.line,
                column: span.column,
            })?;

        let mut name = None;
        if matches!(self.current().kind, TokenKind::Operator(Operator::Equals)) {
            self.advance();
            name = Some(match self.current().kind.clone() {
                TokenKind::String(s) | TokenKind::Identifier(s) => {
                    self.advance();
                    s
                }
                _ => return Err(self.unexpected("definition name")),
            });
        }

        if name.is_none() && kind.requires_name() {
            return Err(self.unexpected("'='"));
        }
        self.expect(TokenKind::RBracket, "']'")?;

        Ok((SelectorKind::from_bracket(kind), name))
    }

    /// Optional `:` then a braced property dictionary.
    pub(crate) fn parse_block(&mut self) -> Result<PropertyDict, ParseError> {
        self.skip_newlines();
        if self.check(&TokenKind::Colon) {
            self.advance();
            self.skip_newlines();
        }
        self.expect(TokenKind::LBrace, "'{'")?;
        self.parse_dict()
    }

    /// `Kind ['{' PropertyDict '}']`; the current token is the element name.
    pub(crate) fn parse_ui_element(&mut self, kind: UIElementKind) -> Result<UIElement, ParseError> {
        self.advance();
        let mut properties = PropertyDict::new();
        if self.check(&TokenKind::LBrace) {
            self.advance();
            properties = self.parse_dict()?;
        }

        let mut children = Vec::new();
        if let Some(CvuValue::Array(items)) = properties.get("children") {
            if !items.is_empty() && items.iter().all(|v| matches!(v, CvuValue::Element(_))) {
                if let Some(CvuValue::Array(items)) = properties.remove("children") {
                    children = items
                        .into_iter()
                        .filter_map(|v| match v {
                            CvuValue::Element(element) => Some(element),
                            _ => None,
                        })
                        .collect();
                }
            }
        }

        Ok(UIElement {
            kind,
            properties,
            children,
        })
    }

    /// Action name, optional `(args)`, optional `{options}`. A top-level
    /// `arguments` option is moved into the positional arguments.
    pub(crate) fn parse_action(&mut self, kind: cvu_core::ActionKind) -> Result<Action, ParseError> {
        self.advance();
        let mut action = Action::new(kind);

        if self.check(&TokenKind::LParen) {
            self.advance();
            loop {
                self.skip_separators();
                if self.check(&TokenKind::RParen) {
                    self.advance();
                    break;
                }
                let value = self.parse_value()?;
                action.arguments.push(value);
            }
        }

        if self.check(&TokenKind::LBrace) {
            self.advance();
            let mut options = self.parse_dict()?;
            match options.remove("arguments") {
                Some(CvuValue::Array(items)) => action.arguments.extend(items),
                Some(value) => action.arguments.push(value),
                None => {}
            }
            action.options = options;
        }

        Ok(action)
    }

    /// `'[' value* ']'` with commas and newlines as separators.
    pub(crate) fn parse_array(&mut self) -> Result<Vec<CvuValue>, ParseError> {
        self.expect(TokenKind::LBracket, "'['")?;
        let mut items = Vec::new();
        loop {
            self.skip_separators();
            if self.check(&TokenKind::RBracket) {
                self.advance();
                return Ok(items);
            }
            items.push(self.parse_value()?);
        }
    }

    /// A single value in array, argument or property position.
    pub(crate) fn parse_value(&mut self) -> Result<CvuValue, ParseError> {
        let token = self.current().clone();
        let value = match token.kind {
            TokenKind::Bool(b) => CvuValue::Bool(b),
            TokenKind::Number(n) => CvuValue::Number(n),
            TokenKind::String(s) => CvuValue::String(s),
            TokenKind::Nil => CvuValue::Nil,
            TokenKind::Color(hex) => match Color::from_hex(&hex) {
                Some(color) => CvuValue::Color(color),
                None => return Err(self.unexpected("color")),
            },
            TokenKind::Expression(text) => {
                CvuValue::Expression(self.compile(Expression::compile_with(&text, self.grammar), token.span)?)
            }
            TokenKind::StringExpression(raw) => CvuValue::Expression(
                self.compile(Expression::compile_template_with(&raw, self.grammar), token.span)?,
            ),
            TokenKind::Negation => {
                self.advance();
                return match self.current().kind {
                    TokenKind::Bool(b) => {
                        self.advance();
                        Ok(CvuValue::Bool(!b))
                    }
                    _ => Err(self.unexpected("bool after '!'")),
                };
            }
            TokenKind::LBrace => {
                self.advance();
                return self.parse_dict().map(CvuValue::Dictionary);
            }
            TokenKind::LBracket => return self.parse_array().map(CvuValue::Array),
            TokenKind::Identifier(name) => {
                if let Some(action) = self.grammar.action(&name) {
                    return self.parse_action(action).map(CvuValue::Action);
                }
                if let Some(kind) = self.grammar.ui_element(&name) {
                    if self.peek_kind(1) == Some(&TokenKind::LBrace) {
                        return self.parse_ui_element(kind).map(CvuValue::Element);
                    }
                }
                CvuValue::String(name)
            }
            _ => return Err(self.unexpected("value")),
        };
        self.advance();
        Ok(value)
    }

    fn compile(
        &self,
        result: Result<Expression, cvu_core::ExpressionError>,
        span: Span,
    ) -> Result<Expression, ParseError> {
        result.map_err(|e| ParseError::InvalidExpression {
            message: e.to_string(),
            line: span.line,
            column: span.column,
        })
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    pub(crate) fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Identifier(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    pub(crate) fn skip_separators(&mut self) {
        while self.check(&TokenKind::Newline) || self.check(&TokenKind::Comma) {
            self.advance();
        }
    }

    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.describe(),
            line: token.span.line,
            column: token.span.column,
        }
    }
}

// ============================================================================
// CONVENIENCE FUNCTIONS
// ============================================================================

/// Parse CVU source with the default grammar into the defaults domain.
pub fn parse(source: &str) -> Result<Vec<ViewSelector>, ParseError> {
    parse_with(source, default_grammar(), Domain::Defaults)
}

/// Parse CVU source with an explicit grammar and domain.
pub fn parse_with(source: &str, grammar: &GrammarConfig, domain: Domain) -> Result<Vec<ViewSelector>, ParseError> {
    let tokens = Lexer::with_grammar(source, grammar).tokenize()?;
    Parser::with_grammar(tokens, grammar).with_domain(domain).parse()
}

// ============================================================================
// TESTS
// ============================================================================
