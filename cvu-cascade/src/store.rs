//! Definition store - parsed selectors per domain

use cvu_core::{CvuResult, Domain, ParseError, SerializationError};
use cvu_dsl::pretty_printer::is_valid_key;
use cvu_dsl::{
    default_grammar, fold_compound_properties, parse_with, serialize, unfold_compound_properties,
    CvuValue, GrammarConfig, ViewSelector,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Holds every parsed [`ViewSelector`], grouped by domain, in the order they
/// were added. This is the only place definitions are mutated.
#[derive(Debug, Clone, Default)]
pub struct DefinitionStore {
    grammar: GrammarConfig,
    selectors: BTreeMap<Domain, Vec<ViewSelector>>,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self::with_grammar(default_grammar().clone())
    }

    pub fn with_grammar(grammar: GrammarConfig) -> Self {
        Self {
            grammar,
            selectors: BTreeMap::new(),
        }
    }

    pub fn grammar(&self) -> &GrammarConfig {
        &self.grammar
    }

    /// Parse `source` into `domain`. Nothing is added if parsing fails.
    /// Returns the number of selectors added.
    pub fn add_source(&mut self, domain: Domain, source: &str) -> Result<usize, ParseError> {
        let parsed = parse_with(source, &self.grammar, domain)?;
        let count = parsed.len();
        debug!(domain = %domain, count, "Added CVU definitions");
        self.selectors.entry(domain).or_default().extend(parsed);
        Ok(count)
    }

    /// Add an already parsed selector under its own domain.
    pub fn add(&mut self, selector: ViewSelector) {
        self.selectors.entry(selector.domain).or_default().push(selector);
    }

    pub fn selectors(&self, domain: Domain) -> &[ViewSelector] {
        self.selectors.get(&domain).map(Vec::as_slice).unwrap_or_default()
    }

    /// All selectors, defaults first.
    pub fn iter(&self) -> impl Iterator<Item = &ViewSelector> {
        Domain::CASCADE.into_iter().flat_map(move |d| self.selectors(d).iter())
    }

    pub fn len(&self) -> usize {
        self.selectors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last selector in `domain` whose canonical text is `pattern`.
    pub fn find(&self, domain: Domain, pattern: &str) -> Option<&ViewSelector> {
        self.selectors(domain).iter().rev().find(|s| s.selector == pattern)
    }

    /// Remove every selector in `domain` matching `pattern`. Returns how many
    /// were removed.
    pub fn remove(&mut self, domain: Domain, pattern: &str) -> usize {
        let Some(list) = self.selectors.get_mut(&domain) else {
            return 0;
        };
        let before = list.len();
        list.retain(|s| s.selector != pattern);
        before - list.len()
    }

    pub fn clear(&mut self, domain: Domain) {
        self.selectors.remove(&domain);
    }

    /// Set one property on the user-domain selector `pattern`, creating the
    /// selector if the user domain has none. `nil` removes the key.
    ///
    /// Returns the canonical text of the updated selector for persistence.
    /// The store is left unchanged on error.
    pub fn set_property(&mut self, pattern: &str, key: &str, value: CvuValue) -> CvuResult<String> {
        if !is_valid_key(key) {
            return Err(SerializationError::InvalidKey { key: key.to_string() }.into());
        }

        let existing = self
            .selectors(Domain::User)
            .iter()
            .rposition(|s| s.selector == pattern);

        let mut selector = match existing {
            Some(index) => self.selectors(Domain::User)[index].clone(),
            None => self.blank_selector(pattern)?,
        };

        // Layout keys live inside `frame`/`cornerborder`; edit them unfolded.
        let compound = matches!(key, "frame" | "cornerborder");
        if !compound {
            unfold_compound_properties(&mut selector.properties);
        }
        if value.is_nil() {
            selector.properties.remove(key);
        } else {
            selector.properties.insert(key.to_string(), value);
        }
        if !compound {
            fold_compound_properties(&mut selector.properties);
        }

        let text = serialize(std::slice::from_ref(&selector))?;

        let list = self.selectors.entry(Domain::User).or_default();
        match existing {
            Some(index) => list[index] = selector,
            None => list.push(selector),
        }
        debug!(selector = pattern, key, "Updated user definition");

        Ok(text)
    }

    /// Canonical text of every selector in `domain`.
    pub fn serialize_domain(&self, domain: Domain) -> Result<String, SerializationError> {
        serialize(self.selectors(domain))
    }

    fn blank_selector(&self, pattern: &str) -> Result<ViewSelector, ParseError> {
        let source = format!("{} {{}}", pattern);
        let mut parsed = parse_with(&source, &self.grammar, Domain::User)?;
        match parsed.len() {
            1 => Ok(parsed.remove(0)),
            _ => Err(ParseError::UnexpectedToken {
                expected: "a single selector".to_string(),
                found: pattern.to_string(),
                line: 1,
                column: 1,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvu_core::CvuError;

    #[test]
    fn test_add_source_by_domain() -> Result<(), ParseError> {
        let mut store = DefinitionStore::new();
        assert_eq!(store.add_source(Domain::Defaults, "Note { title: \"a\" }\nPerson[] {}")?, 2);
        assert_eq!(store.add_source(Domain::User, "Note { title: \"b\" }")?, 1);

        assert_eq!(store.len(), 3);
        assert_eq!(store.selectors(Domain::Defaults).len(), 2);
        assert_eq!(store.selectors(Domain::User)[0].domain, Domain::User);

        let order: Vec<Domain> = store.iter().map(|s| s.domain).collect();
        assert_eq!(order, vec![Domain::Defaults, Domain::Defaults, Domain::User]);
        Ok(())
    }

    #[test]
    fn test_add_source_failure_adds_nothing() {
        let mut store = DefinitionStore::new();
        assert!(store.add_source(Domain::User, "Note { title: \"a\" }\nPerson {").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_property_creates_selector() -> CvuResult<()> {
        let mut store = DefinitionStore::new();
        let text = store.set_property("Note[]", "columns", CvuValue::Number(4.0))?;
        assert_eq!(text, "Note[] {\n    columns: 4\n}\n");
        assert_eq!(
            store.find(Domain::User, "Note[]").and_then(|s| s.get("columns")),
            Some(&CvuValue::Number(4.0))
        );
        Ok(())
    }

    #[test]
    fn test_set_property_updates_and_removes() -> CvuResult<()> {
        let mut store = DefinitionStore::new();
        store.add_source(Domain::User, "Note { title: \"a\" subtitle: \"b\" }")?;

        store.set_property("Note", "title", CvuValue::from("c"))?;
        let text = store.set_property("Note", "subtitle", CvuValue::Nil)?;

        assert_eq!(store.selectors(Domain::User).len(), 1);
        assert_eq!(text, "Note {\n    title: \"c\"\n}\n");
        Ok(())
    }

    fn frame(store: &DefinitionStore) -> Option<&CvuValue> {
        store.find(Domain::User, "Note").and_then(|s| s.get("frame"))
    }

    #[test]
    fn test_set_property_edits_folded_frame() -> CvuResult<()> {
        let mut store = DefinitionStore::new();
        store.add_source(Domain::User, "Note { maxWidth: 100 }")?;

        let text = store.set_property("Note", "maxWidth", CvuValue::Number(200.0))?;
        assert_eq!(text, "Note {\n    maxWidth: 200\n}\n");
        assert_eq!(
            frame(&store),
            Some(&CvuValue::Array(vec![
                CvuValue::Nil,
                CvuValue::Number(200.0),
                CvuValue::Nil,
                CvuValue::Nil,
                CvuValue::Nil,
            ]))
        );
        let note = store.find(Domain::User, "Note");
        assert!(note.is_some_and(|s| s.get("maxWidth").is_none()));

        store.set_property("Note", "minWidth", CvuValue::Number(50.0))?;
        assert!(matches!(
            frame(&store),
            Some(CvuValue::Array(parts)) if parts[0] == CvuValue::Number(50.0) && parts[1] == CvuValue::Number(200.0)
        ));

        store.set_property("Note", "minWidth", CvuValue::Nil)?;
        let text = store.set_property("Note", "maxWidth", CvuValue::Nil)?;
        assert!(frame(&store).is_none());
        assert!(!text.contains("Width"));
        Ok(())
    }

    #[test]
    fn test_set_property_edits_folded_cornerborder() -> CvuResult<()> {
        let mut store = DefinitionStore::new();
        store.add_source(Domain::User, "Note { border: #000 1\n cornerRadius: 5 }")?;

        store.set_property("Note", "cornerRadius", CvuValue::Number(8.0))?;
        let note = store.find(Domain::User, "Note");
        assert!(note.is_some_and(|s| s.get("cornerRadius").is_none()));
        assert!(matches!(
            note.and_then(|s| s.get("cornerborder")),
            Some(CvuValue::Array(parts)) if parts.len() == 2 && parts[1] == CvuValue::Number(8.0)
        ));

        let text = store.set_property("Note", "border", CvuValue::Nil)?;
        let note = store.find(Domain::User, "Note");
        assert!(note.is_some_and(|s| s.get("cornerborder").is_none()));
        assert_eq!(note.and_then(|s| s.get("cornerRadius")), Some(&CvuValue::Number(8.0)));
        assert_eq!(text, "Note {\n    cornerRadius: 8\n}\n");
        Ok(())
    }

    #[test]
    fn test_set_property_rejects_bad_input_without_mutation() -> CvuResult<()> {
        let mut store = DefinitionStore::new();
        store.add_source(Domain::User, "Note { columns: 2 }")?;

        let bad_key = store.set_property("Note", "two words", CvuValue::Bool(true));
        assert!(matches!(bad_key, Err(CvuError::Serialization(_))));

        let bad_value = store.set_property("Note", "columns", CvuValue::Number(f64::NAN));
        assert!(matches!(bad_value, Err(CvuError::Serialization(_))));

        assert_eq!(
            store.find(Domain::User, "Note").and_then(|s| s.get("columns")),
            Some(&CvuValue::Number(2.0))
        );
        Ok(())
    }

    #[test]
    fn test_remove_and_clear() -> Result<(), ParseError> {
        let mut store = DefinitionStore::new();
        store.add_source(Domain::User, "Note {}\nNote {}\nPerson {}")?;
        assert_eq!(store.remove(Domain::User, "Note"), 2);
        assert_eq!(store.remove(Domain::Defaults, "Note"), 0);
        store.clear(Domain::User);
        assert!(store.is_empty());
        Ok(())
    }
}
