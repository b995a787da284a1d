use blockform_editor::{build_indexes, builtin_registry, Command, EditorEngine, EngineConfig};
use blockform_model::Theme;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::sync::Arc;

fn engine() -> EditorEngine {
    EditorEngine::with_default_document(
        Arc::new(builtin_registry()),
        Theme::default(),
        EngineConfig::default(),
    )
}

fn body(engine: &EditorEngine) -> String {
    let doc = engine.document();
    doc.node(&doc.root).unwrap().slots[0].clone()
}

/// Root with `count` containers, each holding a three-column row of text
fn populated_engine(count: usize) -> EditorEngine {
    let mut engine = engine();
    let body = body(&engine);

    for i in 0..count {
        let container = engine.insert_new("container", body.clone(), None, None).unwrap();
        let columns = engine
            .insert_new("columns", format!("{}-body", container), None, Some(&json!({ "columns": 3 })))
            .unwrap();
        let slots = engine.document().node(&columns).unwrap().slots.clone();
        for slot in slots {
            engine
                .insert_new("text", slot, None, Some(&json!({ "content": format!("Line {}", i) })))
                .unwrap();
        }
    }

    engine
}

fn build_indexes_small(c: &mut Criterion) {
    let engine = populated_engine(10);
    let doc = engine.document();

    c.bench_function("build_indexes_small", |b| b.iter(|| build_indexes(black_box(&doc))));
}

fn build_indexes_large(c: &mut Criterion) {
    let engine = populated_engine(200);
    let doc = engine.document();

    c.bench_function("build_indexes_large", |b| b.iter(|| build_indexes(black_box(&doc))));
}

fn dispatch_prop_update(c: &mut Criterion) {
    let mut engine = populated_engine(50);
    let text = engine.insert_new("text", body(&engine), None, None).unwrap();

    c.bench_function("dispatch_prop_update", |b| {
        b.iter(|| {
            engine
                .execute(Command::UpdateNodeProps {
                    node_id: text.clone(),
                    props: Some(json!({ "content": "Invoice total" })),
                })
                .unwrap()
        })
    });
}

fn dispatch_insert_and_undo(c: &mut Criterion) {
    let mut engine = populated_engine(50);
    let body = body(&engine);

    c.bench_function("dispatch_insert_and_undo", |b| {
        b.iter(|| {
            engine.insert_new("table", body.clone(), Some(0), None).unwrap();
            engine.undo()
        })
    });
}

fn resolve_node_styles(c: &mut Criterion) {
    let mut engine = populated_engine(10);
    let text = engine
        .insert_new("text", body(&engine), None, Some(&json!({ "content": "Heading" })))
        .unwrap();
    engine
        .execute(Command::SetStylePreset { node_id: text.clone(), preset: Some("heading".to_string()) })
        .unwrap();

    c.bench_function("resolve_node_styles", |b| {
        b.iter(|| engine.resolved_node_styles(black_box(&text)))
    });
}

criterion_group!(
    benches,
    build_indexes_small,
    build_indexes_large,
    dispatch_prop_update,
    dispatch_insert_and_undo,
    resolve_node_styles
);
criterion_main!(benches);
