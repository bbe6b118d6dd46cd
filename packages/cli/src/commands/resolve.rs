use super::load_records;
use anyhow::Result;
use clap::Args;
use pagecraft_editor::{Node, NodeId, StyleMap, TemplateRegistry};
use pagecraft_evaluator::{resolve_state, resolve_style};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Node to resolve
    pub node_id: String,

    /// Interaction state to apply (`hover` or `:hover`)
    #[arg(short, long)]
    pub state: Option<String>,
}

pub fn resolve(args: ResolveArgs, cwd: &str) -> Result<()> {
    let records = load_records(&PathBuf::from(cwd))?;
    let styles = resolved_styles(&records, &args.node_id, args.state.as_deref())?;

    println!("{}", serde_json::to_string_pretty(&styles)?);
    Ok(())
}

/// Effective styles of one node against the built-in catalog
pub(crate) fn resolved_styles(records: &[Node], node_id: &str, state: Option<&str>) -> Result<StyleMap> {
    let id = NodeId::from(node_id);
    let node = records
        .iter()
        .find(|node| node.id == id)
        .ok_or_else(|| anyhow::anyhow!("No node with id {}", id))?;

    let catalog = TemplateRegistry::builtin().style_catalog();
    let styles = resolve_style(node, &catalog, None);
    Ok(match state {
        Some(state) => resolve_state(&styles, state),
        None => styles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_editor::{CommandInterpreter, Document, Intent};

    fn button_page() -> (Vec<Node>, String) {
        let mut doc = Document::new("home");
        let outcome = CommandInterpreter::builtin()
            .submit(&mut doc, &Intent::add("button"))
            .unwrap();
        (doc.serialize(), outcome.primary.unwrap().to_string())
    }

    #[test]
    fn test_state_name_without_colon() {
        let (records, id) = button_page();

        let base = resolved_styles(&records, &id, None).unwrap();
        assert_eq!(base.get_str("background"), Some("#3366FF"));

        for state in ["hover", ":hover"] {
            let hover = resolved_styles(&records, &id, Some(state)).unwrap();
            assert_eq!(hover.get_str("background"), Some("#2255EE"), "state {}", state);
            assert_eq!(hover.get_str("color"), Some("white"));
        }
    }

    #[test]
    fn test_unknown_node() {
        let (records, _) = button_page();
        let err = resolved_styles(&records, "nope", None).unwrap_err();
        assert!(err.to_string().contains("No node with id nope"));
    }
}
