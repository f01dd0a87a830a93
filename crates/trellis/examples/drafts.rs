//! Trellis Drafts Example
//!
//! Walks through an editing session on a shadow model:
//! - a draft layered over a saved record, with live dirty tracking
//! - a computed attribute and a validation rule
//! - an author reference that resolves later
//! - the shadow tree and the serialized result
//!
//! Run with: cargo run -p trellis --example drafts

use trellis::attrs;
use trellis::collection::{List, ObservableList};
use trellis::model::{Binder, Issue, Model, Reference, Schema, ShadowTreeDebug, SimpleAttribute, Value};

fn article_schema() -> std::sync::Arc<Schema> {
    Schema::builder("Article")
        .attribute("status", SimpleAttribute::new().with_default("draft"))
        .bind(Binder::new("summary").from(["title", "status"]).compute(|values| {
            let title = values[0].as_str().unwrap_or("untitled");
            let status = values[1].as_str().unwrap_or("draft");
            Value::from(format!("{title} ({status})"))
        }))
        .issues(|model| {
            let missing = model.watch("title").map(Value::is_null);
            List::from_vec(vec![Issue::reactive(
                missing,
                trellis::Varying::new(0),
                "an article needs a title",
            )])
        })
        .build()
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let schema = article_schema();
    let saved = Model::new(&schema, attrs! { "title" => "Hello", "body.text" => "First words" });
    let draft = saved.shadow();

    let dirty = draft.watch_modified(true);
    let _dirty_log = dirty.react(|dirty| tracing::info!(dirty, "draft state changed"));
    let valid = draft.valid(0);
    let _valid_log = valid.react(|valid| tracing::info!(valid, "validity changed"));

    draft.set("body.text", "Second draft");
    draft.unset("title");
    tracing::info!(
        issues = draft.issues().len(),
        summary = ?draft.get("summary"),
        "after clearing the title"
    );

    draft.set("title", "Hello again");
    let author = Reference::pending();
    draft.set("author", author.clone());
    author.resolve(Model::new(&Schema::plain(), attrs! { "name" => "Ada" }));
    tracing::info!(submodels = draft.submodels().len(), "author resolved");

    println!("{}", ShadowTreeDebug::new().format(&draft));
    println!("{}", draft.serialize());

    draft.merge();
    tracing::info!(saved = %saved.serialize(), "merged into saved record");
}
