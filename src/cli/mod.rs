//! Command-line interface for netsentry.
//!
//! Provides commands for running the training pipeline, batch prediction,
//! seeding the document store, serving the HTTP API, and inspecting the
//! resolved configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::domain::{Frame, Value};
use crate::ml::SavedModel;
use crate::pipeline::TrainingPipeline;
use crate::settings::Settings;
use crate::store::{Document, DocumentStore, SqliteStore};

/// netsentry - staged ML training pipeline for network threat classification
#[derive(Parser, Debug)]
#[command(name = "netsentry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full training pipeline once
    Train,

    /// Predict every row of a CSV with the latest pushed model
    Predict {
        /// Input CSV of raw feature rows
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the predictions CSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Load CSV rows into the document store as JSON documents
    Load {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Target database (defaults to the configured one)
        #[arg(long)]
        database: Option<String>,

        /// Target collection (defaults to the configured one)
        #[arg(long)]
        collection: Option<String>,
    },

    /// Start the HTTP API
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        address: String,
    },

    /// Show the resolved configuration
    Config,
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::from_env();

        match self.command {
            Commands::Train => run_train(settings),
            Commands::Predict { input, output } => run_predict(settings, &input, &output),
            Commands::Load {
                input,
                database,
                collection,
            } => run_load(settings, &input, database, collection),
            Commands::Serve { address } => crate::serve::serve(settings, &address).await,
            Commands::Config => {
                println!("{:#?}", settings);
                Ok(())
            }
        }
    }
}

fn run_train(settings: Settings) -> Result<()> {
    let store_path = settings.require_store()?;
    let store = SqliteStore::open(store_path)?;

    let pipeline = TrainingPipeline::new(settings);
    let report = pipeline.run(&store)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_predict(settings: Settings, input: &PathBuf, output: &PathBuf) -> Result<()> {
    let registry = settings.registry_path();
    if !registry.exists() {
        anyhow::bail!(
            "no model at {}; run `netsentry train` first",
            registry.display()
        );
    }

    let bundle = SavedModel::load(&registry)?;
    let written = bundle.predict_batch(input, output)?;
    println!("predictions written to {}", written.display());
    Ok(())
}

fn run_load(
    settings: Settings,
    input: &PathBuf,
    database: Option<String>,
    collection: Option<String>,
) -> Result<()> {
    let database = database.unwrap_or_else(|| settings.database.clone());
    let collection = collection.unwrap_or_else(|| settings.collection.clone());

    let frame = Frame::from_csv(input)
        .with_context(|| format!("loading {}", input.display()))?;
    let docs = frame_to_documents(&frame);

    let store = SqliteStore::open(&settings.store_path)?;
    let written = store.insert_many(&database, &collection, &docs)?;

    println!(
        "loaded {} documents into {}/{}",
        written, database, collection
    );
    Ok(())
}

/// Convert frame rows into JSON documents, one per row. Nulls are omitted
/// so imputation sees them as missing fields.
fn frame_to_documents(frame: &Frame) -> Vec<Document> {
    frame
        .rows()
        .iter()
        .map(|row| {
            let mut doc = Document::new();
            for (column, value) in frame.columns().iter().zip(row.iter()) {
                let json = match value {
                    Value::Number(n) => serde_json::json!(n),
                    Value::Text(s) => serde_json::json!(s),
                    Value::Null => continue,
                };
                doc.insert(column.clone(), json);
            }
            doc
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_to_documents_omits_nulls() {
        let mut frame = Frame::new(vec!["a".to_string(), "b".to_string()]);
        frame
            .push_row(vec![Value::Number(1.0), Value::Null])
            .unwrap();
        frame
            .push_row(vec![Value::Number(2.0), Value::Text("x".into())])
            .unwrap();

        let docs = frame_to_documents(&frame);
        assert_eq!(docs.len(), 2);
        assert!(!docs[0].contains_key("b"));
        assert_eq!(docs[1].get("b"), Some(&serde_json::json!("x")));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["netsentry", "serve", "--address", "127.0.0.1:9000"])
            .unwrap();
        match cli.command {
            Commands::Serve { address } => assert_eq!(address, "127.0.0.1:9000"),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
