//! Parser scenarios over realistic definition files
//!
//! Exercises the full pipeline (lexer, parser, expression compiler and
//! serializer) against the shared fixtures rather than single constructs.

use cvu_dsl::{tokenize, TokenKind};
use cvu_test_utils::assertions::*;
use cvu_test_utils::fixtures;
use cvu_test_utils::*;

fn find<'a>(selectors: &'a [ViewSelector], pattern: &str) -> &'a ViewSelector {
    selectors
        .iter()
        .find(|s| s.selector == pattern)
        .unwrap_or_else(|| panic!("no selector {}", pattern))
}

// ============================================================================
// DEFINITION FILES
// ============================================================================

#[test]
fn test_default_definitions_selector_kinds() -> Result<(), ParseError> {
    let selectors = fixtures::default_selectors()?;
    let patterns: Vec<&str> = selectors.iter().map(|s| s.selector.as_str()).collect();
    assert_eq!(
        patterns,
        vec![
            "*",
            "*[]",
            "[renderer = \"list\"]",
            "[renderer = \"grid\"]",
            "[renderer = \"generalEditor\"]",
            "Note",
            "Note[]",
            "Person",
            "Person[]",
            ".allNotes",
        ]
    );

    assert!(find(&selectors, "*").is_wildcard());
    assert!(find(&selectors, "*[]").is_list());
    assert_eq!(find(&selectors, "[renderer = \"grid\"]").kind, SelectorKind::Renderer);

    let all_notes = find(&selectors, ".allNotes");
    assert!(all_notes.is_named_view());
    assert_eq!(all_notes.name.as_deref(), Some("allNotes"));
    assert_eq!(all_notes.query(), Some("Note"));
    Ok(())
}

#[test]
fn test_note_definition_contents() -> Result<(), ParseError> {
    let selectors = fixtures::default_selectors()?;
    let note = find(&selectors, "Note");

    match note.get("editActionButton") {
        Some(CvuValue::Action(action)) => assert_eq!(action.kind, ActionKind::ToggleEditMode),
        other => panic!("Expected action, got: {:?}", other),
    }
    assert!(matches!(note.get("title"), Some(CvuValue::Expression(_))));

    let children = match note.get(cvu_dsl::CHILDREN_KEY) {
        Some(CvuValue::Array(items)) => items,
        other => panic!("Expected children, got: {:?}", other),
    };
    assert_eq!(children.len(), 1);
    let stack = match &children[0] {
        CvuValue::Element(element) => element,
        other => panic!("Expected element, got: {:?}", other),
    };
    assert_eq!(stack.kind, UIElementKind::VStack);
    let texts: Vec<&UIElement> = stack.children.iter().collect();
    assert_element_kinds(&texts, &[UIElementKind::Text, UIElementKind::Text]);
    assert_eq!(texts[0].get("font"), Some(&CvuValue::Number(18.0)));
    Ok(())
}

#[test]
fn test_nested_renderer_definition() -> Result<(), ParseError> {
    let selectors = fixtures::default_selectors()?;
    let notes = find(&selectors, "Note[]");

    let definitions = match notes.get(cvu_dsl::RENDER_DEFINITIONS_KEY) {
        Some(CvuValue::Array(items)) => items,
        other => panic!("Expected renderDefinitions, got: {:?}", other),
    };
    assert_eq!(definitions.len(), 1);
    match &definitions[0] {
        CvuValue::Definition(definition) => {
            assert_eq!(definition.kind, SelectorKind::Renderer);
            assert_eq!(definition.name.as_deref(), Some("list"));
            assert_eq!(definition.domain, Domain::Defaults);
            assert!(definition.get(cvu_dsl::CHILDREN_KEY).is_some());
        }
        other => panic!("Expected definition, got: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_person_title_is_template() -> Result<(), ParseError> {
    let selectors = fixtures::default_selectors()?;
    let title = match find(&selectors, "Person").get("title") {
        Some(CvuValue::Expression(expression)) => expression.clone(),
        other => panic!("Expected template, got: {:?}", other),
    };

    let host = DefaultHost::with_builtins();
    let item = fixtures::person_item();
    let arguments = ViewArguments::new();
    let context = EvalContext::new(Some(&item), &arguments);
    assert_eq!(
        title.evaluate_string(&host, &context, EvalMode::Strict).ok().as_deref(),
        Some("Ada Lovelace")
    );
    Ok(())
}

#[test]
fn test_user_overrides_land_in_user_domain() -> Result<(), ParseError> {
    let selectors = fixtures::user_selectors()?;
    assert!(selectors.iter().all(|s| s.domain == Domain::User));

    let notes = find(&selectors, "Note[]");
    match notes.get(cvu_dsl::RENDER_DEFINITIONS_KEY) {
        Some(CvuValue::Array(items)) => match &items[0] {
            CvuValue::Definition(definition) => assert_eq!(definition.domain, Domain::User),
            other => panic!("Expected definition, got: {:?}", other),
        },
        other => panic!("Expected renderDefinitions, got: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_session_view_definitions() -> Result<(), ParseError> {
    let session = fixtures::session_view()?;
    assert_eq!(session.kind, SelectorKind::Session);
    assert_eq!(session.get("defaultRenderer"), Some(&CvuValue::from("grid")));
    assert!(matches!(
        session.get(cvu_dsl::RENDER_DEFINITIONS_KEY),
        Some(CvuValue::Array(items)) if items.len() == 1
    ));
    Ok(())
}

// ============================================================================
// SMALL SOURCES
// ============================================================================

#[test]
fn test_single_quoted_renderer_name() -> Result<(), ParseError> {
    let selectors = parse("[renderer = 'list'] { columns: 3 }")?;
    assert_eq!(selectors[0].kind, SelectorKind::Renderer);
    assert_eq!(selectors[0].name.as_deref(), Some("list"));
    assert_eq!(selectors[0].selector, "[renderer = \"list\"]");
    assert_eq!(selectors[0].get("columns"), Some(&CvuValue::Number(3.0)));
    Ok(())
}

#[test]
fn test_untitled_note() -> Result<(), ParseError> {
    let selectors = parse("Note { title: \"Untitled\" }")?;
    assert_eq!(selectors.len(), 1);
    assert_eq!(selectors[0].type_name(), Some("Note"));
    assert!(!selectors[0].is_list());
    assert_eq!(selectors[0].get("title"), Some(&CvuValue::from("Untitled")));
    Ok(())
}

#[test]
fn test_multiple_values_become_array() -> Result<(), ParseError> {
    let selectors = parse("Note {\n    padding: 5 10 5 10\n}")?;
    assert_eq!(
        selectors[0].get("padding"),
        Some(&CvuValue::Array(vec![
            CvuValue::Number(5.0),
            CvuValue::Number(10.0),
            CvuValue::Number(5.0),
            CvuValue::Number(10.0),
        ]))
    );
    Ok(())
}

#[test]
fn test_frame_folding_scenario() -> Result<(), ParseError> {
    let selectors = parse("Note {\n    maxWidth: 300\n    align: center\n}")?;
    assert_eq!(
        selectors[0].get("frame"),
        Some(&CvuValue::Array(vec![
            CvuValue::Nil,
            CvuValue::Number(300.0),
            CvuValue::Nil,
            CvuValue::Nil,
            CvuValue::from("center"),
        ]))
    );
    assert!(selectors[0].get("maxWidth").is_none());
    Ok(())
}

#[test]
fn test_missing_value_position() {
    assert_parse_error_at(&parse("Note {\n    title:\n}"), 2, 5);
}

#[test]
fn test_unclosed_body_position() {
    let result = parse("Note {\n    title: \"a\"\n");
    assert!(matches!(result, Err(ParseError::UnexpectedToken { .. })));
}

#[test]
fn test_line_comment_rejected() {
    assert_lex_error(&parse("// not a comment\nNote { }"));
}

#[test]
fn test_block_comment_skipped() -> Result<(), ParseError> {
    let selectors = parse("/* header\n   spans lines */\nNote { /* inline */ title: \"a\" }")?;
    assert_eq!(selectors[0].get("title"), Some(&CvuValue::from("a")));
    Ok(())
}

#[test]
fn test_minus_boundaries() -> Result<(), LexError> {
    let kinds: Vec<TokenKind> = tokenize("a-1 -1")?.into_iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Identifier("a-1".to_string()),
            TokenKind::Number(-1.0),
            TokenKind::Eof,
        ]
    );
    assert!(tokenize("- 1").is_err());
    Ok(())
}

#[test]
fn test_dotted_lookup_paths() -> Result<(), ExpressionError> {
    let expression = Expression::compile("dataItem.owner.name")?;
    let path = expression.path().cloned();
    assert_eq!(path, Some(LookupPath::item(&["owner", "name"])));

    let expression = Expression::compile("a.b.c")?;
    assert_eq!(expression.path().cloned(), Some(LookupPath::argument(&["a", "b", "c"])));
    Ok(())
}

#[test]
fn test_fixture_canonical_text_is_stable() {
    let printed = assert_round_trip(fixtures::DEFAULT_DEFINITIONS);
    assert!(printed.starts_with("* {\n"));
    assert!(!printed.contains("/*"));
}
