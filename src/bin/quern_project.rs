//! quern-project: Project documents into flat rows
//!
//! Loads a field-descriptor list (as produced by quern-infer, optionally
//! hand-edited), compiles a projection plan, and streams documents through
//! it. Each output row is printed as a JSON array, one per line; a document
//! with an expanded array produces one row per element.
//!
//! Usage:
//!   # Project a single document
//!   quern-project --fields fields.json data.json
//!
//!   # Stream NDJSON documents
//!   quern-project --fields fields.json --ndjson events.jsonl
//!
//!   # From stdin
//!   echo '{"xs": [7, 8, 9]}' | quern-project --fields fields.json

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use quern::{row_to_json, Field, Node, OutputSchema, Projector};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read, Write};

#[derive(Parser, Debug)]
#[command(name = "quern-project")]
#[command(about = "Project nested documents into flat rows", long_about = None)]
struct Args {
    /// JSON file holding the field-descriptor list
    #[arg(long, short = 'f')]
    fields: String,

    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Process newline-delimited JSON (one document per line)
    #[arg(long)]
    ndjson: bool,

    /// Print the column header row before any data rows
    #[arg(long)]
    header: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let fields_text = std::fs::read_to_string(&args.fields)
        .with_context(|| format!("Failed to read fields file: {}", args.fields))?;
    let fields: Vec<Field> =
        serde_json::from_str(&fields_text).context("Failed to parse field descriptors")?;

    let mut projector = Projector::new();
    projector.set_fields(&fields);
    let schema = OutputSchema::for_fields(projector.fields());
    projector.init(schema.clone())?;

    let mut stdout = std::io::stdout();

    if args.header {
        let names: Vec<Value> = schema
            .columns()
            .iter()
            .map(|c| Value::String(c.name.clone()))
            .collect();
        writeln!(stdout, "{}", Value::Array(names))?;
    }

    let reader: Box<dyn Read> = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(File::open(file_path)?))
    } else {
        Box::new(std::io::stdin())
    };

    let buf_reader = serde_json::de::IoRead::new(BufReader::new(reader));
    let stream = serde_json::StreamDeserializer::new(buf_reader);

    for result in stream.into_iter() {
        let value: Value = result?;
        let doc = Node::from_json(&value);
        for row in projector.project(&doc)? {
            writeln!(stdout, "{}", row_to_json(&row))?;
        }

        if !args.ndjson {
            break;
        }
    }

    Ok(())
}
