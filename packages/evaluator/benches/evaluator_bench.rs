use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pagecraft_common::{Configuration, Node, NodeId, StyleMap};
use pagecraft_evaluator::{build_hierarchy, resolve_style, StyleCatalog};

/// Page with `sections` roots, each holding a row of cards with two children
fn page(sections: usize, cards: usize) -> Vec<Node> {
    let mut nodes = Vec::new();
    for s in 0..sections {
        let section_id = NodeId::new(format!("section-{}", s));
        let mut section = Node::new(section_id.clone(), "section");

        for c in 0..cards {
            let card_id = NodeId::new(format!("card-{}-{}", s, c));
            let mut card = Node::new(card_id.clone(), "card");
            card.parent_id = Some(section_id.clone());

            for (i, ty) in ["heading", "text"].iter().enumerate() {
                let leaf_id = NodeId::new(format!("{}-{}-{}-{}", ty, s, c, i));
                let mut leaf = Node::new(leaf_id.clone(), *ty);
                leaf.parent_id = Some(card_id.clone());
                card.children.push(leaf_id);
                nodes.push(leaf);
            }

            section.children.push(card_id);
            nodes.push(card);
        }
        nodes.push(section);
    }
    nodes
}

fn hierarchy_small(c: &mut Criterion) {
    let nodes = page(5, 4);
    c.bench_function("build_hierarchy_small", |b| {
        b.iter(|| build_hierarchy(black_box(&nodes)).node_count())
    });
}

fn hierarchy_large(c: &mut Criterion) {
    let nodes = page(50, 40);
    c.bench_function("build_hierarchy_large", |b| {
        b.iter(|| build_hierarchy(black_box(&nodes)).node_count())
    });
}

fn style_resolution(c: &mut Criterion) {
    let catalog = StyleCatalog::new()
        .with_type_default(
            "button",
            StyleMap::new().with("color", "black").with("padding", "8px 16px"),
        )
        .with_preset(
            "primary",
            StyleMap::new()
                .with("background", "#3366FF")
                .with(":hover", StyleMap::new().with("background", "#2255EE")),
        );

    let mut node = Node::new("b-1", "button");
    node.configuration = Configuration::preset("primary");
    node.styles = StyleMap::new().with("color", "white");

    c.bench_function("resolve_style", |b| {
        b.iter(|| resolve_style(black_box(&node), &catalog, None))
    });
}

criterion_group!(benches, hierarchy_small, hierarchy_large, style_resolution);
criterion_main!(benches);
