/// Quickstart example - the simplest possible usage
use quern::{row_to_json, ColumnType, Field, Node, OutputSchema, Projector};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    println!("=== Quern Quick Start ===\n");

    // Step 1: Your document
    let my_doc = json!({
        "id": 1,
        "username": "alice",
        "posts": [
            {"id": 100, "title": "My First Post"},
            {"id": 101, "title": "Second Post"}
        ]
    });

    println!("Original document:");
    println!("{}\n", serde_json::to_string_pretty(&my_doc)?);

    // Step 2: Declare the fields you want and where they live
    let fields = vec![
        Field::new("username", "$.username", ColumnType::String),
        Field::new("post_id", "$.posts[*].id", ColumnType::Integer),
        Field::new("post_title", "$.posts[*].title", ColumnType::String),
    ];

    // Step 3: Compile a projection plan
    let mut projector = Projector::new();
    projector.set_fields(&fields);
    let schema = OutputSchema::for_fields(projector.fields());
    projector.init(schema)?;

    // Step 4: Project - one row per element of `posts`
    let rows = projector.project(&Node::from_json(&my_doc))?;

    println!("Projected {} rows:", rows.len());
    for row in &rows {
        println!("  {}", row_to_json(row));
    }

    // Step 5: Discovery proposes descriptors when you don't know the shape
    let docs = vec![my_doc];
    let mut source = docs
        .iter()
        .map(Node::from_json)
        .map(Ok::<_, anyhow::Error>);
    let proposed = projector.infer_fields(&mut source, 0)?;

    println!("\nDiscovered descriptors:");
    println!("{}", serde_json::to_string_pretty(&proposed)?);

    Ok(())
}
