use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use envizion_core::{ChatError, IntentCategory, Responder, SiteCatalog, KEYWORD_TABLE};
use envizion_observability::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "envizion")]
#[command(about = "ENVIZION assistant and catalog tools")]
struct Cli {
    /// JSON catalog to use instead of the built-in site data.
    #[arg(long, env = "ENVIZION_CATALOG_PATH")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat with the assistant.
    Chat,
    /// Answer a single message and print the reply as JSON.
    Ask { message: String },
    /// List reference records, optionally for one category.
    Ngos {
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the keyword table in precedence order.
    Keywords,
    /// Print site statistics.
    Stats,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("envizion_cli");
    let cli = Cli::parse();

    let catalog = load_catalog(cli.catalog.as_ref())?;
    let responder = Responder::new(Arc::new(catalog));

    match cli.command {
        Command::Chat => run_chat(&responder)?,
        Command::Ask { message } => {
            let reply = responder.respond(&message)?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Command::Ngos { category } => {
            let records = match category {
                Some(value) => {
                    let category = IntentCategory::parse(&value)
                        .ok_or_else(|| anyhow!("unknown category '{value}'"))?;
                    responder
                        .catalog()
                        .records_in(category)
                        .cloned()
                        .collect::<Vec<_>>()
                }
                None => responder.catalog().records.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Keywords => {
            for (category, triggers) in KEYWORD_TABLE {
                println!("{:<11} {}", category.as_str(), triggers.join(", "));
            }
        }
        Command::Stats => {
            println!(
                "{}",
                serde_json::to_string_pretty(&responder.catalog().stats)?
            );
        }
    }

    Ok(())
}

fn run_chat(responder: &Responder) -> Result<()> {
    println!("ENVIZION assistant. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = match responder.respond(message) {
            Ok(reply) => reply,
            Err(ChatError::EmptyMessage) => continue,
        };

        println!("\n[{}] {}", reply.intent, reply.response);
        for record in &reply.records {
            println!("- {} | {} | {}", record.name, record.services, record.contact);
        }
        println!();
    }

    Ok(())
}

fn load_catalog(path: Option<&PathBuf>) -> Result<SiteCatalog> {
    match path {
        Some(path) => SiteCatalog::from_json_file(path)
            .with_context(|| format!("failed loading catalog from {}", path.display())),
        None => Ok(SiteCatalog::builtin()),
    }
}
