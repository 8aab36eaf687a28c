use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use pdf_rag::config::ServiceConfig;
use pdf_rag::rag::RagEngine;
use pdf_rag::server;

/// Question answering over a PDF document, served on `POST /ask`
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Document to index (overrides DOCUMENT_PATH)
    #[arg(index = 1)]
    document: Option<PathBuf>,

    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

impl Args {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(document) = self.document {
            config.document_path = document;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let mut config = ServiceConfig::from_env().context("Invalid configuration")?;
    args.apply(&mut config);

    info!("Indexing document: {}", config.document_path.display());

    // Any failure here stops the process before it starts listening
    let engine = RagEngine::initialize(&config)
        .await
        .context("Failed to build the document index")?;
    info!(
        "Retriever ready: {} chunks indexed, top {} per question",
        engine.retriever().index().len(),
        engine.retriever().top_k()
    );

    server::serve(&config, Arc::new(engine)).await
}
