//! Teams Chat Export - Save Microsoft Teams chats as static HTML files.
//!
//! Every conversation of the signed-in user is fetched from Microsoft Graph
//! and rendered into one self-contained HTML document. Avatars and inline
//! images are downloaded once into a shared `assets/` directory.
//!
//! Usage:
//!   teams-chat-export --client-id <app-id>          # device-code sign-in
//!   teams-chat-export out --token "$TOKEN"          # pre-acquired token
//!   teams-chat-export --only "Alex Doe,Project X"   # selected chats only

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::time::Instant;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::Exporter;
use cli::{Cli, Credentials};
use domain::{ExportConfig, ExportSummary};
use infrastructure::{
    load_config, DeviceCodeProvider, GraphClient, HttpTransport, StaticToken, Templates,
    TokenProvider,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let file_config = load_config(cli.config.as_deref())?;
    let config = cli.export_config(&file_config);
    let templates = Templates::load(config.templates_dir.as_deref())?;

    tracing::debug!("Export config: {:?}", config);

    let started = Instant::now();
    let summary = match cli.credentials(&file_config)? {
        Credentials::Token(token) => export(StaticToken::new(token), &config, &templates).await?,
        Credentials::DeviceCode {
            client_id,
            tenant_id,
        } => {
            export(
                DeviceCodeProvider::new(client_id, tenant_id),
                &config,
                &templates,
            )
            .await?
        }
    };

    print_summary(&summary, &config);
    println!(
        "{}",
        format!("Finished in {:.1}s", started.elapsed().as_secs_f64()).dimmed()
    );

    Ok(())
}

/// Builds the client stack around a token provider and runs the export.
async fn export<P: TokenProvider>(
    tokens: P,
    config: &ExportConfig,
    templates: &Templates,
) -> domain::Result<ExportSummary> {
    let transport = HttpTransport::new(tokens)?;
    let client = GraphClient::new(transport, &config.api_base, config.page_size)?;

    Exporter::new(&client, config, templates).run().await
}

fn print_summary(summary: &ExportSummary, config: &ExportConfig) {
    println!();
    println!(
        "{} Exported {} conversation(s) to {}",
        "✓".green().bold(),
        summary.written.len(),
        config.output_dir.display()
    );

    if summary.skipped > 0 {
        println!("  {} skipped", summary.skipped.to_string().yellow());
    }
    if summary.failed > 0 {
        println!("  {} failed", summary.failed.to_string().red());
    }
    if summary.unhandled_messages > 0 {
        println!(
            "  {} message(s) of unsupported type left out",
            summary.unhandled_messages.to_string().yellow()
        );
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
