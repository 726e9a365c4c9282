//! Command-line interface for the service core.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;

use defpi_binding::QName;

use crate::config::ServiceConfig;
use crate::connection::{Connection, MemoryConnection};
use crate::error::Result;
use crate::service::Service;

/// dEF-Pi service core - bind, render and dispatch schema-bound documents.
#[derive(Parser)]
#[command(name = "defpi-service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bind an XML document and print the instance as JSON.
    Validate {
        /// Path to the XML document
        file: PathBuf,

        /// Root type in {namespace}local form (default: any declared root element)
        #[arg(short = 't', long = "type")]
        root_type: Option<String>,
    },

    /// Bind an XML document and print its canonical rendering.
    Render {
        /// Path to the XML document
        file: PathBuf,
    },

    /// Feed a document through a handler on an in-memory connection.
    Dispatch {
        /// Path to the XML document
        file: PathBuf,

        /// Protocol version tag the connection declares (e.g., V001)
        #[arg(long)]
        version: String,
    },

    /// List the enabled protocol versions.
    Versions,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let service = Service::initialize(&ServiceConfig::from_env()?)?;

    match cli.command {
        Commands::Validate { file, root_type } => {
            validate_command(&service, &file, root_type.as_deref())
        }
        Commands::Render { file } => render_command(&service, &file),
        Commands::Dispatch { file, version } => dispatch_command(&service, &file, &version),
        Commands::Versions => versions_command(&service),
    }
}

fn validate_command(service: &Service, file: &Path, root_type: Option<&str>) -> Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let context = service.context();
    let binder = context.binder();

    let document = match root_type {
        Some(name) => binder.bind(&raw, &QName::parse(name))?,
        None => binder.bind_document(&raw)?,
    };

    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn render_command(service: &Service, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let context = service.context();
    let document = context.binder().bind_document(&raw)?;
    println!("{}", context.binder().render(&document)?);
    Ok(())
}

fn dispatch_command(service: &Service, file: &Path, version: &str) -> Result<()> {
    let payload = std::fs::read(file)?;
    let memory = MemoryConnection::new("cli-1");
    let connection: Arc<dyn Connection> = memory.clone();

    let mut manager = service.connection_manager();
    let handshake = manager.create(connection, version)?;
    println!(
        "{} {} ({}) {}",
        style("Connection").bold(),
        style(&handshake.connection_id).cyan(),
        version,
        style(handshake.state).green()
    );

    let result = manager.deliver(&handshake.connection_id, &payload);
    for message in memory.sent_text() {
        println!("{} {}", style("Sent:").green().bold(), message);
    }
    if let Some(handler) = manager.handler(&handshake.connection_id) {
        let stats = handler.stats();
        println!(
            "  Received: {}, accepted: {}, rejected: {}, sent: {}, send failed: {}",
            stats.received, stats.accepted, stats.rejected, stats.sent, stats.send_failed
        );
    }
    manager.close();

    result.map(|_| ())
}

fn versions_command(service: &Service) -> Result<()> {
    println!("{}", style("Enabled protocol versions:").bold());
    for tag in service.versions().supported_versions() {
        println!("  {}", style(tag).cyan());
    }
    Ok(())
}
