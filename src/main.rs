use cfg_normalizer::{default_pass_registry, Grammar, GrammarConfig, GrammarPass, PassChain};
use clap::Parser;
use log::info;
use std::io::{self, Write};
use std::path::PathBuf;

/// Convert a context-free grammar into Chomsky Normal Form
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the grammar file
    #[arg(help = "Path to the grammar file (reads stdin when omitted)")]
    grammar_file: Option<PathBuf>,

    /// The start nonterminal
    #[arg(short, long, help = "Start symbol (defaults to S)")]
    start: Option<char>,

    /// Stop after the named stage
    #[arg(long, value_name = "STAGE", help = "Stop after null, unit, useless or cnf")]
    stop_after: Option<String>,

    /// Print rules sorted by (lhs, rhs)
    #[arg(long)]
    sorted: bool,

    /// Print the grammar as JSON
    #[arg(long)]
    json: bool,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut config = match &cli.config {
        Some(path) => GrammarConfig::from_json_file(path)?,
        None => GrammarConfig::default(),
    };
    if let Some(start) = cli.start {
        config.start_symbol = start;
    }
    if cli.sorted {
        config.sorted_output = true;
    }

    let grammar = match &cli.grammar_file {
        Some(path) => {
            info!("Loading grammar from {}", path.display());
            Grammar::from_file(path, &config)?
        }
        None => Grammar::from_reader(io::stdin().lock(), &config)?,
    };
    info!("Loaded {} rules", grammar.len());

    let pipeline = match &cli.stop_after {
        Some(stage) => default_pass_registry().chain_until(stage)?,
        None => PassChain::standard(),
    };
    info!("Running {}", pipeline.name());

    let mut result = pipeline.apply(&grammar)?;
    if config.sorted_output {
        result = result.sorted();
    }

    let mut stdout = io::stdout().lock();
    if cli.json {
        writeln!(stdout, "{}", result.to_json()?)?;
    } else {
        write!(stdout, "{}", result)?;
    }

    Ok(())
}
