/// CVU Tracer - Shows the flow through Tokens → Selectors → Canonical text
///
/// Usage: cargo run -p cvu-dsl --features cli --bin trace_parser <cvu-file> [--sessions]

use cvu_dsl::{parse_with, serialize, GrammarConfig, Lexer};
use cvu_core::Domain;
use std::fs;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run -p cvu-dsl --features cli --bin trace_parser <cvu-file> [--sessions]");
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run -p cvu-dsl --features cli --bin trace_parser views/note.cvu");
        std::process::exit(1);
    }

    let path = &args[1];
    let grammar = if args.iter().any(|a| a == "--sessions") {
        GrammarConfig::default().with_session_definitions()
    } else {
        GrammarConfig::default()
    };

    println!("╔═══════════════════════════════════════════════════════════════");
    println!("║ CVU PARSER TRACER");
    println!("╚═══════════════════════════════════════════════════════════════\n");

    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    };

    println!("📝 INPUT:");
    println!("{}", content);
    println!();

    // Step 1: tokens
    println!("🔍 TOKENS:");
    println!("─────────────────────────────────────────────────────────────");
    match Lexer::with_grammar(&content, &grammar).tokenize() {
        Ok(tokens) => {
            for token in &tokens {
                println!("  {:>4}:{:<3} {}", token.span.line, token.span.column, token.kind);
            }
        }
        Err(e) => {
            eprintln!("❌ Lex error at {}:{}: {}", e.line(), e.column(), e);
            std::process::exit(1);
        }
    }
    println!();

    // Step 2: selectors
    println!("🌳 SELECTORS:");
    println!("─────────────────────────────────────────────────────────────");
    let selectors = match parse_with(&content, &grammar, Domain::Defaults) {
        Ok(selectors) => selectors,
        Err(e) => {
            eprintln!("❌ Parse error at {}:{}: {}", e.line(), e.column(), e);
            std::process::exit(1);
        }
    };
    for selector in &selectors {
        match serde_json::to_string_pretty(selector) {
            Ok(json) => println!("{}", json),
            Err(e) => println!("  {} (not JSON-encodable: {})", selector.selector, e),
        }
    }
    println!();

    // Step 3: canonical text
    println!("✨ CANONICAL:");
    println!("─────────────────────────────────────────────────────────────");
    match serialize(&selectors) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("❌ Serialization error: {}", e);
            std::process::exit(1);
        }
    }
}
