use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pagecraft_editor::{CommandInterpreter, Document, Intent, Mutation, NodeProps};

/// Document with `sections` hero sections already expanded
fn page(sections: usize) -> Document {
    let mut doc = Document::new("bench");
    let interpreter = CommandInterpreter::builtin();
    for _ in 0..sections {
        let _ = interpreter.submit(&mut doc, &Intent::add("hero"));
    }
    doc
}

fn batch_apply(c: &mut Criterion) {
    let mut doc = page(50);
    let parent = doc.roots()[0].clone();

    c.bench_function("batch_create_10", |b| {
        b.iter(|| {
            let ops = (0..10)
                .map(|_| Mutation::CreateNode {
                    id: None,
                    node_type: "text".into(),
                    parent_id: Some(parent.clone()),
                    position: None,
                    props: NodeProps::default(),
                })
                .collect();
            black_box(doc.batch(ops).map(|outcomes| outcomes.len()))
        })
    });
}

fn command_expand(c: &mut Criterion) {
    let interpreter = CommandInterpreter::builtin();
    c.bench_function("add_dashboard", |b| {
        b.iter_with_setup(
            || page(10),
            |mut doc| black_box(interpreter.submit(&mut doc, &Intent::add("dashboard")).map(|o| o.created.len())),
        )
    });
}

fn undo_redo(c: &mut Criterion) {
    let mut doc = page(100);
    c.bench_function("undo_redo", |b| {
        b.iter(|| {
            doc.undo();
            doc.redo();
        })
    });
}

criterion_group!(benches, batch_apply, command_expand, undo_redo);
criterion_main!(benches);
