//! Grammar tables injected into the lexer and parser
//!
//! Reserved words, action names, known UI elements and bracket-selector kinds
//! are configuration rather than globals, so tests can run against reduced
//! grammars and hosts can load their own tables from TOML.

use crate::lexer::{Operator, TokenKind};
use cvu_core::{ActionKind, ConfigError, UIElementKind};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Reserved word recognized by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    True,
    False,
    And,
    Or,
    Equals,
    Not,
    Nil,
}

impl Keyword {
    pub fn token(&self) -> TokenKind {
        match self {
            Keyword::True => TokenKind::Bool(true),
            Keyword::False => TokenKind::Bool(false),
            Keyword::And => TokenKind::Operator(Operator::And),
            Keyword::Or => TokenKind::Operator(Operator::Or),
            Keyword::Equals => TokenKind::Operator(Operator::Equals),
            Keyword::Not => TokenKind::Negation,
            Keyword::Nil => TokenKind::Nil,
        }
    }
}

impl FromStr for Keyword {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "true" => Ok(Keyword::True),
            "false" => Ok(Keyword::False),
            "and" => Ok(Keyword::And),
            "or" => Ok(Keyword::Or),
            "equals" => Ok(Keyword::Equals),
            "not" => Ok(Keyword::Not),
            "nil" => Ok(Keyword::Nil),
            _ => Err(ConfigError::InvalidValue {
                field: "keywords".to_string(),
                value: s.to_string(),
                reason: "not a keyword token".to_string(),
            }),
        }
    }
}

/// Kind named on the left-hand side of a bracket selector (`[renderer = "list"]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BracketKind {
    Style,
    Color,
    Renderer,
    Language,
    Session,
    Sessions,
}

impl BracketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketKind::Style => "style",
            BracketKind::Color => "color",
            BracketKind::Renderer => "renderer",
            BracketKind::Language => "language",
            BracketKind::Session => "session",
            BracketKind::Sessions => "sessions",
        }
    }

    /// Session kinds may omit the `= name` part.
    pub fn requires_name(&self) -> bool {
        !matches!(self, BracketKind::Session | BracketKind::Sessions)
    }
}

impl fmt::Display for BracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BracketKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "style" => Ok(BracketKind::Style),
            "color" => Ok(BracketKind::Color),
            "renderer" => Ok(BracketKind::Renderer),
            "language" => Ok(BracketKind::Language),
            "session" => Ok(BracketKind::Session),
            "sessions" => Ok(BracketKind::Sessions),
            _ => Err(ConfigError::InvalidValue {
                field: "definitions".to_string(),
                value: s.to_string(),
                reason: "not a bracket definition kind".to_string(),
            }),
        }
    }
}

static DEFAULT_GRAMMAR: Lazy<GrammarConfig> = Lazy::new(GrammarConfig::default);

/// Shared default grammar used by [`crate::Lexer::new`] and [`crate::parse`].
pub fn default_grammar() -> &'static GrammarConfig {
    &DEFAULT_GRAMMAR
}

/// Tables consulted by [`crate::Lexer`] and [`crate::Parser`].
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarConfig {
    /// Lowercased word -> keyword
    pub keywords: BTreeMap<String, Keyword>,
    pub actions: BTreeSet<ActionKind>,
    pub ui_elements: BTreeSet<UIElementKind>,
    pub definitions: BTreeSet<BracketKind>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        let keywords = [
            ("true", Keyword::True),
            ("false", Keyword::False),
            ("and", Keyword::And),
            ("or", Keyword::Or),
            ("equals", Keyword::Equals),
            ("not", Keyword::Not),
            ("nil", Keyword::Nil),
        ]
        .into_iter()
        .map(|(word, keyword)| (word.to_string(), keyword))
        .collect();

        Self {
            keywords,
            actions: ActionKind::ALL.into_iter().collect(),
            ui_elements: UIElementKind::ALL.into_iter().collect(),
            definitions: [
                BracketKind::Style,
                BracketKind::Color,
                BracketKind::Renderer,
                BracketKind::Language,
            ]
            .into_iter()
            .collect(),
        }
    }
}

impl GrammarConfig {
    /// Default grammar plus `[session]` / `[sessions]` selectors, used when
    /// loading persisted session state.
    pub fn with_session_definitions(mut self) -> Self {
        self.definitions.insert(BracketKind::Session);
        self.definitions.insert(BracketKind::Sessions);
        self
    }

    pub fn keyword(&self, word: &str) -> Option<Keyword> {
        self.keywords.get(&word.to_lowercase()).copied()
    }

    pub fn action(&self, name: &str) -> Option<ActionKind> {
        ActionKind::from_str(name)
            .ok()
            .filter(|kind| self.actions.contains(kind))
    }

    pub fn ui_element(&self, name: &str) -> Option<UIElementKind> {
        UIElementKind::from_str(name)
            .ok()
            .filter(|kind| self.ui_elements.contains(kind))
    }

    pub fn bracket_kind(&self, name: &str) -> Option<BracketKind> {
        BracketKind::from_str(name)
            .ok()
            .filter(|kind| self.definitions.contains(kind))
    }

    /// Load a grammar from TOML. Omitted tables keep their defaults.
    ///
    /// ```toml
    /// actions = ["back", "openView"]
    /// ui_elements = ["VStack", "Text"]
    /// definitions = ["renderer"]
    ///
    /// [keywords]
    /// yes = "true"
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: GrammarFile = toml::from_str(source).map_err(|e| ConfigError::Malformed {
            reason: e.to_string(),
        })?;

        let mut config = GrammarConfig::default();

        if let Some(keywords) = file.keywords {
            config.keywords = keywords
                .into_iter()
                .map(|(word, keyword)| Ok((word.to_lowercase(), keyword.parse::<Keyword>()?)))
                .collect::<Result<_, ConfigError>>()?;
        }
        if let Some(actions) = file.actions {
            config.actions = actions
                .iter()
                .map(|name| {
                    ActionKind::from_str(name).map_err(|e| invalid("actions", name, e))
                })
                .collect::<Result<_, _>>()?;
        }
        if let Some(elements) = file.ui_elements {
            config.ui_elements = elements
                .iter()
                .map(|name| {
                    UIElementKind::from_str(name).map_err(|e| invalid("ui_elements", name, e))
                })
                .collect::<Result<_, _>>()?;
        }
        if let Some(definitions) = file.definitions {
            config.definitions = definitions
                .iter()
                .map(|name| BracketKind::from_str(name))
                .collect::<Result<_, _>>()?;
        }

        Ok(config)
    }
}

fn invalid(field: &str, value: &str, err: impl fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: err.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GrammarFile {
    keywords: Option<BTreeMap<String, String>>,
    actions: Option<Vec<String>>,
    ui_elements: Option<Vec<String>>,
    definitions: Option<Vec<String>>,
}
