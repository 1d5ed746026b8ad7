use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vaultdb")]
#[command(about = "Semantic index over a folder of notes", long_about = None)]
pub struct Cli {
    #[arg(long, global = true, help = "Vault root (overrides vault.root)")]
    pub vault: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Index every document in the vault and drop entries of deleted ones")]
    Sync,

    #[command(about = "Reindex one document from its current content")]
    Reindex {
        #[arg(help = "Document id, relative to the vault root")]
        doc: String,
    },

    #[command(about = "Remove a document's entries")]
    Remove {
        #[arg(help = "Document id, relative to the vault root")]
        doc: String,
    },

    #[command(about = "Find the chunks most similar to a query")]
    Query {
        #[arg(help = "Query text")]
        text: String,

        #[arg(short, long, help = "Number of results (default: search.default_k)")]
        k: Option<usize>,

        #[arg(long, allow_negative_numbers = true, help = "Drop results scoring below this (default: search.min_score)")]
        min_score: Option<f32>,

        #[arg(long, help = "Print results as a markdown note")]
        markdown: bool,

        #[arg(long, value_name = "DIR", help = "Also write the markdown note into DIR")]
        write: Option<PathBuf>,
    },

    #[command(about = "List the stored chunks of a document")]
    Show {
        #[arg(help = "Document id, relative to the vault root")]
        doc: String,
    },
}
