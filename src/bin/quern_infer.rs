//! quern-infer: Sample documents and propose field descriptors
//!
//! Walks a sample of documents, merges the observed leaf paths into a
//! canonical set, and prints the proposed descriptor list as JSON. Array
//! positions show up as `[min:max]` ranges in descriptor names; the
//! resolution path picks the minimum observed index.
//!
//! Usage:
//!   # Read from file, output to stdout
//!   quern-infer data.json
//!
//!   # Read from stdin, output to stdout
//!   echo '{"id": 1, "tags": ["a", "b"]}' | quern-infer
//!
//!   # Sample the first 500 NDJSON records with compact output
//!   quern-infer --ndjson events.jsonl --sample-size 500 --compact

use anyhow::Result;
use clap::Parser;
use quern::{FieldDiscovery, Node, TreeWalkDiscovery};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};

#[derive(Parser, Debug)]
#[command(name = "quern-infer")]
#[command(about = "Propose field descriptors from sample documents", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Process newline-delimited JSON (one document per line)
    #[arg(long)]
    ndjson: bool,

    /// Number of documents to sample (0 uses the default of 100)
    #[arg(long, default_value_t = 0)]
    sample_size: usize,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let reader: Box<dyn Read> = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(File::open(file_path)?))
    } else {
        Box::new(std::io::stdin())
    };

    let mut records = Vec::new();
    sample_from_reader(reader, !args.ndjson, args.sample_size, &mut records)?;

    if records.is_empty() {
        eprintln!("Warning: No documents found in input");
    }

    let mut source = records
        .iter()
        .map(Node::from_json)
        .map(Ok::<_, anyhow::Error>);
    let fields = TreeWalkDiscovery.discover_fields(&mut source, args.sample_size)?;

    let output = if args.compact {
        serde_json::to_string(&fields)?
    } else {
        serde_json::to_string_pretty(&fields)?
    };

    println!("{}", output);

    Ok(())
}

/// Sample records from a reader using SIMD-accelerated JSON parsing when
/// possible, falling back to serde_json for NDJSON input.
fn sample_from_reader(
    reader: Box<dyn Read>,
    stop_after_first: bool,
    sample_size: usize,
    records: &mut Vec<Value>,
) -> Result<()> {
    let limit = if sample_size == 0 {
        quern::DEFAULT_SAMPLE_SIZE
    } else {
        sample_size
    };

    let mut content = Vec::new();
    let mut buf_reader = BufReader::new(reader);
    buf_reader.read_to_end(&mut content)?;

    match simd_json::to_owned_value(&mut content) {
        Ok(simd_json::OwnedValue::Array(arr)) => {
            // A top-level array is a stream of documents.
            for elem in arr.iter().take(limit) {
                let json_str = simd_json::to_string(elem)?;
                records.push(serde_json::from_str(&json_str)?);
            }
        }
        Ok(elem) => {
            let json_str = simd_json::to_string(&elem)?;
            records.push(serde_json::from_str(&json_str)?);
        }
        Err(_) => {
            // Fallback to serde_json for NDJSON or malformed input
            let content_str = String::from_utf8_lossy(&content);
            for line in content_str.lines() {
                if records.len() >= limit {
                    break;
                }
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                records.push(serde_json::from_str(line)?);

                if stop_after_first {
                    break;
                }
            }
        }
    }

    Ok(())
}
