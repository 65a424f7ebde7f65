//! CVU Cascade - View Resolution
//!
//! Selects the definitions that apply to a rendering situation and merges
//! them into one [`ResolvedView`]:
//!
//! ```text
//! DefinitionStore (defaults, user)
//!     ↓ match (datatype axis, renderer axis)
//! CascadePlan (domain → cascadeOrder axes → specificity, session last)
//!     ↓ merge
//! ResolvedView (validated, cached per slot)
//! ```

pub mod config;
pub mod matcher;
pub mod merge;
pub mod resolved;
pub mod resolver;
pub mod store;

pub use config::{CascadeAxis, CascadeConflictPolicy, ResolverConfig};
pub use matcher::{Layer, Situation, Specificity};
pub use merge::{merge_dict, CascadePlan, MergeAction, MergeDecision, CASCADE_ORDER_KEY, DEFAULT_RENDERER_KEY};
pub use resolved::{ResolvedView, VIEW_ARGUMENTS_KEY};
pub use resolver::ViewResolver;
pub use store::DefinitionStore;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cvu_core::{CvuResult, Domain, MergeError, UIElementKind};
    use cvu_dsl::{
        default_grammar, parse_with, CvuValue, DefaultHost, EvalContext, EvalMode, ItemRef, ViewArguments,
        ViewSelector,
    };
    use std::sync::Arc;

    fn resolver(defaults: &str, user: &str) -> CvuResult<ViewResolver> {
        let mut store = DefinitionStore::new();
        store.add_source(Domain::Defaults, defaults)?;
        store.add_source(Domain::User, user)?;
        Ok(ViewResolver::new(store))
    }

    fn session(source: &str) -> CvuResult<ViewSelector> {
        let grammar = default_grammar().clone().with_session_definitions();
        Ok(parse_with(source, &grammar, Domain::User)?.remove(0))
    }

    #[test]
    fn test_user_domain_wins() -> CvuResult<()> {
        let mut resolver = resolver(
            "Note[] { query: \"Note\" columns: 3 title: \"Notes\" }",
            "Note[] { columns: 5 }",
        )?;
        let view = resolver.resolve("main", &Situation::list("Note"))?;

        assert_eq!(view.get_f64("columns"), Some(5.0));
        assert_eq!(view.get_str("title"), Some("Notes"));
        assert_eq!(view.renderer, "list");
        assert_eq!(
            view.contributors("columns"),
            vec![(Domain::Defaults, "Note[]"), (Domain::User, "Note[]")]
        );
        Ok(())
    }

    #[test]
    fn test_datatype_overrides_renderer_by_default() -> CvuResult<()> {
        let mut resolver = resolver(
            "[renderer = \"list\"] { columns: 1 spacing: 4 }\nNote[] { query: \"Note\" columns: 2 }",
            "",
        )?;
        let view = resolver.resolve("main", &Situation::list("Note"))?;

        assert_eq!(view.cascade_order, vec![CascadeAxis::Renderer, CascadeAxis::Datatype]);
        assert_eq!(view.get_f64("columns"), Some(2.0));
        assert_eq!(view.get_f64("spacing"), Some(4.0));
        assert_eq!(view.renderer_property("columns"), Some(&CvuValue::Number(1.0)));
        assert_eq!(view.chain, vec!["[renderer = \"list\"]", "Note[]"]);
        Ok(())
    }

    #[test]
    fn test_cascade_order_declaration_overrides_default() -> CvuResult<()> {
        let mut resolver = resolver(
            "[renderer = \"list\"] { columns: 1 }\nNote[] { query: \"Note\" columns: 2 }",
            "Note[] { cascadeOrder: [datatype, renderer] }",
        )?;
        let view = resolver.resolve("main", &Situation::list("Note"))?;

        assert_eq!(view.cascade_order, vec![CascadeAxis::Datatype, CascadeAxis::Renderer]);
        // Domains stay outermost: defaults merge renderer last, then user
        assert_eq!(view.get_f64("columns"), Some(1.0));
        Ok(())
    }

    #[test]
    fn test_partial_cascade_order_is_completed() -> CvuResult<()> {
        let resolver = resolver("Note[] { query: \"Note\" cascadeOrder: renderer }", "")?;
        let view = resolver.resolve_uncached(&Situation::list("Note"))?;
        assert_eq!(view.cascade_order, vec![CascadeAxis::Datatype, CascadeAxis::Renderer]);
        Ok(())
    }

    #[test]
    fn test_invalid_cascade_order_entry() -> CvuResult<()> {
        let resolver = resolver("Note[] { query: \"Note\" cascadeOrder: [datatype, domain] }", "")?;
        let result = resolver.resolve_uncached(&Situation::list("Note"));
        assert_eq!(
            result,
            Err(MergeError::InvalidCascadeOrder {
                entry: "domain".to_string(),
                selector: "Note[]".to_string(),
            })
        );
        Ok(())
    }

    #[test]
    fn test_conflicting_cascade_order_policies() -> CvuResult<()> {
        let defaults = "Note[] { query: \"Note\" }";
        let user = "Note[] { cascadeOrder: [renderer, datatype] }\nNote[] { cascadeOrder: [datatype, renderer] }";

        let lenient = resolver(defaults, user)?;
        let view = lenient.resolve_uncached(&Situation::list("Note"))?;
        assert_eq!(view.cascade_order, vec![CascadeAxis::Datatype, CascadeAxis::Renderer]);

        let mut store = DefinitionStore::new();
        store.add_source(Domain::Defaults, defaults)?;
        store.add_source(Domain::User, user)?;
        let config = ResolverConfig {
            conflict_policy: CascadeConflictPolicy::Reject,
            ..ResolverConfig::default()
        };
        let strict = ViewResolver::with_config(store, config)?;
        assert!(matches!(
            strict.resolve_uncached(&Situation::list("Note")),
            Err(MergeError::ConflictingCascadeOrder { domain: Domain::User, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_children_concatenate_across_domains() -> CvuResult<()> {
        let mut resolver = resolver(
            "Note {\n  VStack { Text { text: \"a\" } }\n  Text { text: \"b\" }\n}",
            "Note {\n  Button\n}",
        )?;
        let view = resolver.resolve("main", &Situation::item("Note"))?;

        let kinds: Vec<UIElementKind> = view.children().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![UIElementKind::VStack, UIElementKind::Text, UIElementKind::Button]);
        assert_eq!(view.renderer, "generalEditor");
        Ok(())
    }

    #[test]
    fn test_children_cleared_by_user() -> CvuResult<()> {
        let mut resolver = resolver("Note {\n  Text { text: \"a\" }\n}", "Note { children: [] }")?;
        let view = resolver.resolve("main", &Situation::item("Note"))?;
        assert!(view.children().is_empty());
        Ok(())
    }

    #[test]
    fn test_specificity_within_domain() -> CvuResult<()> {
        let mut resolver = resolver(
            ".allNotes { title: \"All\" }\nNote[] { title: \"Notes\" query: \"Note\" }\n*[] { title: \"Items\" editable: true }",
            "",
        )?;
        let situation = Situation::named("allNotes").with_type("Note", true);
        let view = resolver.resolve("main", &situation)?;

        assert_eq!(view.get_str("title"), Some("All"));
        assert_eq!(view.get_bool("editable"), Some(true));
        assert_eq!(view.chain, vec!["*[]", "Note[]", ".allNotes"]);
        Ok(())
    }

    #[test]
    fn test_renderer_inferred_from_default_renderer() -> CvuResult<()> {
        let mut resolver = resolver(
            "Photo[] { query: \"Photo\" defaultRenderer: \"grid\" }\n[renderer = \"grid\"] { columns: 4 }\n[renderer = \"list\"] { columns: 1 }",
            "",
        )?;
        let view = resolver.resolve("main", &Situation::list("Photo"))?;
        assert_eq!(view.renderer, "grid");
        assert_eq!(view.get_f64("columns"), Some(4.0));

        let explicit = resolver.resolve("other", &Situation::list("Photo").with_renderer("list"))?;
        assert_eq!(explicit.get_f64("columns"), Some(1.0));
        Ok(())
    }

    #[test]
    fn test_nested_renderer_definitions() -> CvuResult<()> {
        let mut resolver = resolver(
            "[renderer = \"list\"] { spacing: 1 }\nNote[] {\n  query: \"Note\"\n  [renderer = \"list\"] { spacing: 8 }\n}",
            "",
        )?;
        let view = resolver.resolve("main", &Situation::list("Note"))?;
        assert_eq!(view.renderer_property("spacing"), Some(&CvuValue::Number(8.0)));
        Ok(())
    }

    #[test]
    fn test_session_view_merges_last() -> CvuResult<()> {
        let mut resolver = resolver("Note[] { query: \"Note\" title: \"Notes\" }", "Note[] { title: \"Mine\" }")?;
        let situation = Situation::list("Note").with_session(session(
            "[session] {\n  title: \"Pinned\"\n  [renderer = \"list\"] { spacing: 2 }\n}",
        )?);
        let view = resolver.resolve("main", &situation)?;

        assert_eq!(view.get_str("title"), Some("Pinned"));
        assert_eq!(view.renderer_property("spacing"), Some(&CvuValue::Number(2.0)));
        assert_eq!(view.chain.last().map(String::as_str), Some("[session]"));
        Ok(())
    }

    #[test]
    fn test_missing_query_keeps_previous_view() -> CvuResult<()> {
        let mut resolver = resolver("Note[] { query: \"Note\" }", "")?;
        let first = resolver.resolve("main", &Situation::list("Note"))?;

        resolver.set_property("Note[]", "query", CvuValue::from(""))?;
        let result = resolver.resolve("main", &Situation::list("Note"));

        assert!(matches!(result, Err(MergeError::MissingField { ref field, .. }) if field == "query"));
        let live = resolver.live("main");
        assert!(live.is_some_and(|view| Arc::ptr_eq(&view, &first)));
        Ok(())
    }

    #[test]
    fn test_host_query_satisfies_list_validation() -> CvuResult<()> {
        let resolver = resolver("Note[] { title: \"Notes\" }", "")?;
        let view = resolver.resolve_uncached(&Situation::list("Note").with_query("Note AND starred"))?;
        assert_eq!(view.query(), Some("Note AND starred"));
        Ok(())
    }

    #[test]
    fn test_no_renderer_without_fallback() -> CvuResult<()> {
        let mut store = DefinitionStore::new();
        store.add_source(Domain::Defaults, "Note { title: \"a\" }")?;
        let config = ResolverConfig {
            fallback_renderer: None,
            ..ResolverConfig::default()
        };
        let resolver = ViewResolver::with_config(store, config)?;
        assert!(matches!(
            resolver.resolve_uncached(&Situation::item("Note")),
            Err(MergeError::NoRenderer { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_required_keys() -> CvuResult<()> {
        let mut store = DefinitionStore::new();
        store.add_source(Domain::Defaults, "Note { subtitle: \"a\" }")?;
        let config = ResolverConfig {
            required_keys: vec!["title".to_string()],
            ..ResolverConfig::default()
        };
        let resolver = ViewResolver::with_config(store, config)?;
        assert_eq!(
            resolver.resolve_uncached(&Situation::item("Note")),
            Err(MergeError::MissingField {
                field: "title".to_string(),
                situation: "Note".to_string(),
            })
        );
        Ok(())
    }

    #[test]
    fn test_resolution_is_idempotent() -> CvuResult<()> {
        let resolver = resolver(
            "* { editable: true }\nNote {\n  title: \"a\"\n  Text { text: {{.title}} }\n}",
            "Note { title: \"b\" }",
        )?;
        let situation = Situation::item("Note");
        assert_eq!(resolver.resolve_uncached(&situation)?, resolver.resolve_uncached(&situation)?);
        Ok(())
    }

    #[test]
    fn test_cache_hit_and_invalidation() -> CvuResult<()> {
        let mut resolver = resolver("Note { title: \"a\" }", "")?;
        let situation = Situation::item("Note");

        let first = resolver.resolve("main", &situation)?;
        let second = resolver.resolve("main", &situation)?;
        assert!(Arc::ptr_eq(&first, &second));
        assert!(resolver.is_cached("main"));

        assert!(resolver.invalidate("main"));
        assert!(!resolver.is_cached("main"));
        let third = resolver.resolve("main", &situation)?;
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first, third);

        resolver.invalidate_all();
        assert!(!resolver.invalidate("missing"));
        assert!(resolver.release("main").is_some());
        assert!(resolver.live("main").is_none());
        Ok(())
    }

    #[test]
    fn test_store_change_misses_cache() -> CvuResult<()> {
        let mut resolver = resolver("Note { title: \"a\" }", "")?;
        let situation = Situation::item("Note");
        let first = resolver.resolve("main", &situation)?;

        resolver.set_property("Note", "title", CvuValue::from("b"))?;
        let second = resolver.resolve("main", &situation)?;

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.get_str("title"), Some("b"));
        Ok(())
    }

    #[test]
    fn test_evaluate_and_actions() -> CvuResult<()> {
        let resolver = resolver(
            "Note {\n  title: {{.name OR \"Untitled\"}}\n  editActionButton: toggleEditMode\n  HStack { Button { press: openView { arguments: [\"x\"] } } }\n}",
            "",
        )?;
        let view = resolver.resolve_uncached(&Situation::item("Note"))?;

        let host = DefaultHost::with_builtins();
        let item = ItemRef::new("Note").with_property("name", "Groceries");
        let arguments = ViewArguments::new();
        let context = EvalContext::new(Some(&item), &arguments);

        assert_eq!(
            view.evaluate("title", &host, &context, EvalMode::Display)?,
            CvuValue::from("Groceries")
        );
        assert_eq!(view.evaluate("subtitle", &host, &context, EvalMode::Display)?, CvuValue::Nil);
        assert!(view.evaluate("subtitle", &host, &context, EvalMode::Strict).is_err());

        let names: Vec<&str> = view.actions().iter().map(|a| a.kind.as_str()).collect();
        assert_eq!(names, vec!["openView", "toggleEditMode"]);
        Ok(())
    }

    #[test]
    fn test_view_arguments_caller_wins() -> CvuResult<()> {
        let resolver = resolver("Note { viewArguments: { readOnly: true, mode: \"compact\" } }", "")?;
        let view = resolver.resolve_uncached(&Situation::item("Note"))?;

        let arguments = view.view_arguments(&ViewArguments::new().with("readOnly", false));
        assert_eq!(arguments.get("readOnly"), Some(&CvuValue::Bool(false)));
        assert_eq!(arguments.get("mode"), Some(&CvuValue::from("compact")));
        Ok(())
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use cvu_core::Domain;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn store_with(defaults: &[(String, i64)], user: &[(String, i64)]) -> DefinitionStore {
        let mut store = DefinitionStore::new();
        for (domain, entries) in [(Domain::Defaults, defaults), (Domain::User, user)] {
            for (key, value) in entries {
                let source = format!("Note {{ {}: {} }}", key, value);
                store.add_source(domain, &source).expect("generated source parses");
            }
        }
        store
    }

    fn arb_entries() -> impl Strategy<Value = Vec<(String, i64)>> {
        prop::collection::vec(("[a-e]{1,3}", -100i64..100), 0..6)
    }

    proptest! {
        #[test]
        fn prop_user_value_always_wins(defaults in arb_entries(), user in arb_entries()) {
            let resolver = ViewResolver::new(store_with(&defaults, &user));
            let view = resolver.resolve_uncached(&Situation::item("Note"));
            prop_assert!(view.is_ok());
            let view = view.unwrap();

            let expected: BTreeMap<String, i64> = user.iter().cloned().collect();
            for (key, value) in expected {
                prop_assert_eq!(view.get_f64(&key), Some(value as f64));
            }
        }

        #[test]
        fn prop_resolution_idempotent(defaults in arb_entries(), user in arb_entries()) {
            let resolver = ViewResolver::new(store_with(&defaults, &user));
            let situation = Situation::item("Note");
            let first = resolver.resolve_uncached(&situation);
            let second = resolver.resolve_uncached(&situation);
            prop_assert_eq!(first, second);
        }
    }
}
