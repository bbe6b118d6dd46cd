//! Integration tests for the editor crate: commands, styles and files

use pagecraft_editor::{
    ChildDescriptor, CommandError, CommandInterpreter, Document, EditorError, Intent, JsonFileSink, MutationError,
    Node, NodeId, SnapshotSink,
};
use pagecraft_evaluator::{build_hierarchy, resolve_style, TransientStyles};
use serde_json::json;

fn child_types(doc: &Document, id: &NodeId) -> Vec<String> {
    doc.get_children(id)
        .unwrap()
        .iter()
        .map(|c| c.node_type.to_string())
        .collect()
}

#[test]
fn test_add_returns_usable_id() -> anyhow::Result<()> {
    let mut doc = Document::new("home");
    let interpreter = CommandInterpreter::builtin();

    let hero = interpreter.submit(&mut doc, &Intent::add("hero"))?;
    let hero_id = hero.primary.clone().unwrap();
    assert_eq!(hero.created.len(), 4);
    assert_eq!(child_types(&doc, &hero_id), vec!["heading", "text", "button"]);

    let cta = interpreter.submit(
        &mut doc,
        &Intent::add("button")
            .with_target(hero_id.clone())
            .with_position(0)
            .with_properties(json!({ "content": "Sign up" })),
    )?;
    let cta_id = cta.primary.unwrap();

    assert_eq!(doc.get_node(&hero_id).unwrap().children[0], cta_id);
    assert_eq!(doc.get_node(&cta_id).unwrap().content.as_text(), Some("Sign up"));
    assert_eq!(
        doc.get_node(&cta_id).unwrap().configuration.preset.as_deref(),
        Some("button")
    );
    assert_eq!(cta.version, doc.version());
    Ok(())
}

#[test]
fn test_add_is_one_undo_step() {
    let mut doc = Document::new("home");
    let interpreter = CommandInterpreter::builtin();

    interpreter.submit(&mut doc, &Intent::add("dashboard")).unwrap();
    assert_eq!(doc.len(), 5);
    assert_eq!(doc.undo_label(), Some("Add dashboard"));

    assert!(doc.undo());
    assert!(doc.is_empty());
}

#[test]
fn test_edit_reconciles_with_minimal_churn() {
    let mut doc = Document::new("home");
    let interpreter = CommandInterpreter::builtin();

    let section = interpreter
        .submit(
            &mut doc,
            &Intent::add("container").with_properties(json!({
                "children": [
                    { "type": "heading", "content": "A" },
                    { "type": "button", "content": "B" }
                ]
            })),
        )
        .unwrap()
        .primary
        .unwrap();
    let before: Vec<NodeId> = doc.get_node(&section).unwrap().children.clone();
    let (a, b) = (before[0].clone(), before[1].clone());

    let outcome = interpreter
        .submit(
            &mut doc,
            &Intent::edit(
                section.clone(),
                json!({
                    "children": [
                        { "type": "heading" },
                        { "type": "button" },
                        { "type": "button", "content": "C" }
                    ]
                }),
            ),
        )
        .unwrap();

    assert_eq!(outcome.created.len(), 1);
    assert!(outcome.removed.is_empty());
    let after = &doc.get_node(&section).unwrap().children;
    assert_eq!(after.len(), 3);
    assert_eq!(after[0], a);
    assert_eq!(after[1], b);
    assert_eq!(after[2], outcome.created[0]);
    assert_eq!(doc.get_node(&a).unwrap().content.as_text(), Some("A"));
}

#[test]
fn test_edit_nested_descriptors() {
    let mut doc = Document::new("home");
    let interpreter = CommandInterpreter::builtin();
    let card = interpreter.submit(&mut doc, &Intent::add("card")).unwrap().primary.unwrap();
    let card_children = doc.get_node(&card).unwrap().children.clone();

    let wrapper = interpreter
        .submit(
            &mut doc,
            &Intent::add("container").with_properties(json!({
                "children": [{ "type": "card" }]
            })),
        )
        .unwrap()
        .primary
        .unwrap();
    let inner_card = doc.get_node(&wrapper).unwrap().children[0].clone();

    let outcome = interpreter
        .submit(
            &mut doc,
            &Intent::edit(
                wrapper.clone(),
                serde_json::to_value(pagecraft_editor::ElementProperties {
                    children: Some(vec![ChildDescriptor::new("card").with_children(vec![
                        ChildDescriptor::new("heading").with_content("Only a title"),
                    ])]),
                    ..Default::default()
                })
                .unwrap(),
            ),
        )
        .unwrap();

    // The card is kept; its image and text go, its heading is updated
    assert_eq!(doc.get_node(&wrapper).unwrap().children, vec![inner_card.clone()]);
    assert_eq!(outcome.removed.len(), 2);
    assert_eq!(child_types(&doc, &inner_card), vec!["heading"]);
    // Unrelated card untouched
    assert_eq!(doc.get_node(&card).unwrap().children, card_children);
}

#[test]
fn test_remove_cascades() {
    let mut doc = Document::new("home");
    let interpreter = CommandInterpreter::builtin();
    let form = interpreter.submit(&mut doc, &Intent::add("form")).unwrap().primary.unwrap();

    let outcome = interpreter.submit(&mut doc, &Intent::remove(form.clone())).unwrap();

    assert_eq!(outcome.removed.len(), 4);
    assert_eq!(outcome.removed[0], form);
    assert!(doc.is_empty());
}

#[test]
fn test_failures_leave_no_trace() {
    let mut doc = Document::new("home");
    let interpreter = CommandInterpreter::builtin();
    interpreter.submit(&mut doc, &Intent::add("section")).unwrap();
    let before = doc.serialize();
    let version = doc.version();

    assert_eq!(
        interpreter.submit(&mut doc, &Intent::add("carousel")),
        Err(CommandError::UnknownElementType("carousel".to_string()))
    );
    assert_eq!(
        interpreter.submit(&mut doc, &Intent::add("button").with_target("ghost")),
        Err(CommandError::Mutation(MutationError::ParentNotFound("ghost".into())))
    );
    assert!(matches!(
        interpreter.submit(&mut doc, &Intent::edit("ghost", json!({ "content": "x" }))),
        Err(CommandError::Mutation(MutationError::NodeNotFound(_)))
    ));

    assert_eq!(doc.serialize(), before);
    assert_eq!(doc.version(), version);
}

#[test]
fn test_stale_intent_is_rejected() {
    let mut doc = Document::new("home");
    let interpreter = CommandInterpreter::builtin();
    let text = interpreter.submit(&mut doc, &Intent::add("text")).unwrap().primary.unwrap();
    let prepared_at = doc.version();

    interpreter
        .submit(&mut doc, &Intent::edit(text.clone(), json!({ "content": "first" })))
        .unwrap();

    let late = Intent::edit(text.clone(), json!({ "content": "second" })).with_base_version(prepared_at);
    let err = interpreter.submit(&mut doc, &late).unwrap_err();

    assert_eq!(
        err,
        CommandError::Stale {
            base: prepared_at,
            current: prepared_at + 1,
        }
    );
    assert_eq!(doc.get_node(&text).unwrap().content.as_text(), Some("first"));

    let fresh = Intent::edit(text.clone(), json!({ "content": "third" })).with_base_version(doc.version());
    interpreter.submit(&mut doc, &fresh).unwrap();
}

#[test]
fn test_resolved_styles_use_catalog() {
    let mut doc = Document::new("home");
    let interpreter = CommandInterpreter::builtin();
    let button = interpreter
        .submit(
            &mut doc,
            &Intent::add("button").with_properties(json!({ "styles": { "color": "black" } })),
        )
        .unwrap()
        .primary
        .unwrap();

    let catalog = interpreter.templates().style_catalog();
    let node = doc.get_node(&button).unwrap();
    let resolved = resolve_style(node, &catalog, None);

    // instance beats preset, preset beats type default
    assert_eq!(resolved.get_str("color"), Some("black"));
    assert_eq!(resolved.get_str("background"), Some("#3366FF"));
    assert_eq!(resolved.get_str("cursor"), Some("pointer"));

    let all = doc.resolve_styles(&catalog, &TransientStyles::new());
    assert_eq!(all[&button], resolved);
}

#[test]
fn test_hierarchy_projection_of_document() {
    let mut doc = Document::new("home");
    let interpreter = CommandInterpreter::builtin();
    interpreter.submit(&mut doc, &Intent::add("navbar")).unwrap();
    interpreter.submit(&mut doc, &Intent::add("hero")).unwrap();

    let records = doc.serialize();
    let hierarchy = build_hierarchy(&records);

    assert!(hierarchy.is_clean());
    assert_eq!(hierarchy.roots.len(), 2);
    assert_eq!(hierarchy.node_count(), doc.len());
    assert!(doc.outline().starts_with("navbar \"Navigation\""));
}

#[test]
fn test_file_backed_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("landing.json");

    let mut doc = Document::load(&path).unwrap();
    assert_eq!(doc.name(), "landing");
    assert!(doc.is_empty());

    CommandInterpreter::builtin()
        .submit(&mut doc, &Intent::add("footer"))
        .unwrap();
    assert!(doc.is_dirty());
    doc.save().unwrap();
    assert!(!doc.is_dirty());

    let reopened = Document::load(&path).unwrap();
    assert_eq!(reopened.serialize(), doc.serialize());
}

#[test]
fn test_load_reports_integrity_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    let records: Vec<Node> = serde_json::from_value(json!([
        { "id": "a", "type": "section", "children": ["b"] },
        { "id": "b", "type": "text", "parentId": "c" }
    ]))
    .unwrap();
    JsonFileSink::new(&path).save(&records).unwrap();

    assert!(matches!(Document::load(&path), Err(EditorError::Persistence(_))));
}
