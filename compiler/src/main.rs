use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    /// Validated IR as JSON
    Ir,
    /// Validate only, no output
    Check,
}

#[derive(Parser, Debug)]
#[command(
    name = "aac",
    version,
    about = "Agent Assembly Compiler — compiles .aasm units to validated IR"
)]
struct Cli {
    /// Input .aasm source file
    source: PathBuf,

    /// Output file path (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Declarations file (JSON symbol table)
    #[arg(short, long)]
    decls: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Ir)]
    emit: EmitStage,

    /// Print compilation progress
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        eprintln!("aac: source = {}", cli.source.display());
        eprintln!("aac: emit   = {:?}", cli.emit);
    }

    // ── Load declarations ──
    let symbols = match &cli.decls {
        Some(path) => {
            let text = match std::fs::read_to_string(path) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("aac: error: {}: {}", path.display(), e);
                    std::process::exit(2);
                }
            };
            match serde_json::from_str::<aac::symbol::SymbolTable>(&text) {
                Ok(table) => table,
                Err(e) => {
                    eprintln!("aac: error: {}: {}", path.display(), e);
                    std::process::exit(2);
                }
            }
        }
        None => aac::symbol::SymbolTable::new(),
    };

    if cli.verbose {
        eprintln!(
            "aac: {} graph-scope, {} action-scope declarations",
            symbols.graph.len(),
            symbols.action.len()
        );
    }

    // ── Read and compile source ──
    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("aac: error: {}: {}", cli.source.display(), e);
            std::process::exit(2);
        }
    };

    let unit = match aac::pipeline::compile(&source, &symbols) {
        Ok(unit) => unit,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!(
            "aac: compiled {} graph(s), source hash {}",
            unit.graphs.len(),
            unit.provenance.source_hash_hex()
        );
    }

    // ── Emit ──
    let rendered = match cli.emit {
        EmitStage::Check => None,
        EmitStage::Ir => {
            let graphs = match serde_json::to_string_pretty(&unit.graphs) {
                Ok(j) => j,
                Err(e) => {
                    eprintln!("aac: error: {}", e);
                    std::process::exit(2);
                }
            };
            Some(format!(
                "{{\n\"provenance\": {},\n\"graphs\": {}\n}}\n",
                unit.provenance.to_json().trim_end(),
                graphs
            ))
        }
    };

    if let Some(text) = rendered {
        match &cli.output {
            Some(path) => {
                if let Err(e) = std::fs::write(path, text) {
                    eprintln!("aac: error: {}: {}", path.display(), e);
                    std::process::exit(2);
                }
            }
            None => print!("{}", text),
        }
    }
}
