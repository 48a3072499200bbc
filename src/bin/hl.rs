use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use hyperlisp::digest::{fingerprint, to_hex};
use hyperlisp::{Dna, Expression, Hyperlisp, Match, Node};
use std::fs;
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hl", about = "Decode, encode and query Hyperlisp documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the decoded tree as JSON
    Decode { file: String },
    /// Read a JSON tree and print it as Hyperlisp
    Encode { file: String },
    /// Rewrite a document in canonical form
    Fmt {
        file: String,
        #[arg(long)]
        write: bool,
    },
    /// Evaluate a path expression against a document
    Query {
        file: String,
        expression: String,
        /// Context node, as a structural path like `0-1`
        #[arg(long)]
        at: Option<String>,
    },
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(file).with_context(|| format!("Failed to read file: {}", file))
}

fn write_atomic(path: &str, text: &str) -> Result<()> {
    let tmp_path = format!("{}.tmp", path);
    fs::write(&tmp_path, text).with_context(|| format!("Failed to write to file: {}", tmp_path))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to atomically replace file: {}", path))?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hyperlisp=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let codec = Hyperlisp::default();

    match cli.command {
        Commands::Decode { file } => {
            let root = codec.decode(&read_input(&file)?)?;
            println!("{}", serde_json::to_string_pretty(&root)?);
        }

        Commands::Encode { file } => {
            let root: Node = serde_json::from_str(&read_input(&file)?)
                .with_context(|| format!("Invalid JSON tree in {}", file))?;
            println!("{}", codec.encode(&root)?);
        }

        Commands::Fmt { file, write } => {
            let root = codec.decode(&read_input(&file)?)?;
            let text = codec.encode(&root)?;

            let before = fingerprint(&root);
            let after = fingerprint(&codec.decode(&text)?);
            if before != after {
                bail!(
                    "canonical form of {} does not decode to the same tree ({} != {})",
                    file,
                    to_hex(&before),
                    to_hex(&after)
                );
            }
            tracing::info!(file = %file, fingerprint = %to_hex(&after), "formatted");

            if write && file != "-" {
                write_atomic(&file, &text)?;
            } else {
                println!("{}", text);
            }
        }

        Commands::Query {
            file,
            expression,
            at,
        } => {
            let root = codec.decode(&read_input(&file)?)?;
            let expression: Expression = expression.parse()?;
            let start: Dna = at.as_deref().unwrap_or("").parse()?;

            for m in expression.evaluate_at(&root, &start)? {
                match m {
                    Match::Node(node) => println!("{}", codec.encode_nodes([node])?),
                    Match::Value(value) => println!("{}", codec.registry().render(value)?),
                    Match::Name(name) => println!("{}", name),
                    Match::Count(n) => println!("{}", n),
                }
            }
        }
    }

    Ok(())
}
