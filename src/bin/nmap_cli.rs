/*!
 * nmap_cli - Command validation and generation front-end
 *
 * Validates candidate nmap commands against the option catalog, or
 * generates a command from a natural-language intent with the built-in
 * self-correction loop. Emits human-readable reports or JSON for
 * integration with automation pipelines.
 */

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nmap_core::correction::SelfCorrector;
use nmap_core::generator::{Complexity, KeywordGenerator};
use nmap_core::graph_store::{load_or_fallback, GraphStoreConfig};
use nmap_core::validator::CommandValidator;

#[derive(Parser)]
#[command(name = "nmap_cli")]
#[command(about = "nmap command validation and self-correcting generation", long_about = None)]
struct Cli {
    /// Skip the graph store and use the bundled catalog
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a candidate nmap command
    Validate {
        /// The full command string, quoted
        command: String,

        /// Emit the validation report as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Generate a validated command from a natural-language intent
    Generate {
        /// What the command should do
        #[arg(short, long)]
        intent: String,

        /// Requested complexity: EASY, MEDIUM, or HARD
        #[arg(short, long, default_value = "MEDIUM")]
        complexity: Complexity,

        /// Regeneration budget after a failed validation
        #[arg(long, default_value_t = 3)]
        max_retries: usize,

        /// Emit the generation outcome as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the loaded option catalog
    Catalog {
        /// Emit the catalog as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show version information
    Version,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = if cli.offline {
        None
    } else {
        Some(GraphStoreConfig::from_env())
    };
    let catalog = Arc::new(load_or_fallback(config));

    match cli.command {
        Commands::Validate { command, json } => {
            let validator = CommandValidator::new(catalog);
            let report = validator.validate(&command);

            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                println!("{}", report.feedback);
                println!("Score: {:.2}", report.score);
                for error in &report.errors {
                    println!("  error: {}", error);
                }
                for warning in &report.warnings {
                    println!("  warning: {}", warning);
                }
            }

            if !report.valid {
                std::process::exit(1);
            }
        }
        Commands::Generate {
            intent,
            complexity,
            max_retries,
            json,
        } => {
            let generator = KeywordGenerator::new(catalog.clone());
            let validator = CommandValidator::new(catalog);
            let corrector = SelfCorrector::new(max_retries);

            match corrector.run(&intent, complexity, &generator, &validator) {
                Ok(outcome) => {
                    if json {
                        match serde_json::to_string_pretty(&outcome) {
                            Ok(out) => println!("{}", out),
                            Err(e) => {
                                eprintln!("Error: {}", e);
                                std::process::exit(1);
                            }
                        }
                    } else {
                        println!("{}", outcome.command);
                        println!("Confidence: {:.2}", outcome.confidence);
                        println!("{}", outcome.recommendation);
                        if outcome.metadata.corrected {
                            println!(
                                "Corrected after {} regeneration(s)",
                                outcome.metadata.attempts
                            );
                        }
                    }

                    if !outcome.validation.valid {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Catalog { json } => {
            if json {
                match serde_json::to_string_pretty(&catalog.options()) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                println!("Catalog: {} options ({:?} mode)", catalog.len(), catalog.mode());
                for option in catalog.options() {
                    println!("  {:<20} {}", option.name, option.description);
                }
            }
        }
        Commands::Version => {
            println!("nmap_cli v{}", env!("CARGO_PKG_VERSION"));
            println!("nmap command validation and self-correcting generation");
        }
    }
}
