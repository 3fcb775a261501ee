//! Parses a file with a grammar and prints the resulting scope tree.
//!
//! Usage: cargo run --example parse_tree -- <grammar-file> <source-file>

use std::sync::Arc;

use limone::{Parser, Registry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(grammar_path), Some(source_path)) = (args.next(), args.next()) else {
        eprintln!("usage: parse_tree <grammar-file> <source-file>");
        std::process::exit(1);
    };

    let registry = Arc::new(Registry::new());
    let grammar = Arc::new(registry.resolve_by_path(&grammar_path)?);
    let text = std::fs::read_to_string(&source_path)?;

    let root = Parser::new(grammar, registry, &text).parse()?;
    print!("{root}");
    Ok(())
}
