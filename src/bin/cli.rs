//! FolioDB CLI Client
//!
//! Command-line interface for interacting with a FolioDB server.

use clap::{Args as ClapArgs, Parser, Subcommand};
use foliodb::network::Client;
use foliodb::{Record, Result};
use serde::Serialize;

/// FolioDB CLI
#[derive(Parser, Debug)]
#[command(name = "foliodb-cli")]
#[command(about = "CLI for the FolioDB document store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8001")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or overwrite a user record
    Create(RecordArgs),

    /// Get a user record by name
    Get {
        /// The record name
        name: String,
    },

    /// List all user records
    List,

    /// Delete a user record
    Del {
        /// The record name
        name: String,
    },

    /// Ping the server
    Ping,
}

#[derive(ClapArgs, Debug)]
struct RecordArgs {
    /// Record name (identity)
    name: String,

    #[arg(long, default_value = "")]
    age: String,

    #[arg(long, default_value = "")]
    contact: String,

    #[arg(long, default_value = "")]
    company: String,

    #[arg(long, default_value = "")]
    city: String,

    #[arg(long, default_value = "")]
    state: String,

    #[arg(long, default_value = "")]
    country: String,

    #[arg(long, default_value = "")]
    zipcode: String,
}

impl From<RecordArgs> for Record {
    fn from(args: RecordArgs) -> Self {
        Record {
            name: args.name,
            age: args.age,
            contact: args.contact,
            company: args.company,
            city: args.city,
            state: args.state,
            country: args.country,
            zipcode: args.zipcode,
        }
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut client = Client::connect(&args.server)?;

    match args.command {
        Commands::Create(record) => print_json(&client.create(&record.into())?),
        Commands::Get { name } => match client.fetch(&name)? {
            Some(record) => print_json(&record),
            None => not_found(&name),
        },
        Commands::List => print_json(&client.fetch_all()?),
        Commands::Del { name } => {
            if client.remove(&name)? {
                println!("User '{}' deleted", name);
                Ok(())
            } else {
                not_found(&name)
            }
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| foliodb::FolioError::Encoding(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn not_found(name: &str) -> Result<()> {
    eprintln!("User '{}' not found", name);
    std::process::exit(2);
}
