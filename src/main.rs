use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use content_admin::app::App;
use content_admin::models::EntityKind;
use content_admin::upload::UploadCandidate;
use content_admin::workflow::{Submission, WorkflowOutcome};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "content-admin")]
#[command(about = "Manage events, team members, partners and gallery images")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a record, uploading attached images first.
    Create {
        #[arg(value_name = "KIND", value_parser = parse_kind_arg)]
        kind: EntityKind,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Edit a record. Images not replaced are kept.
    Update {
        #[arg(value_name = "KIND", value_parser = parse_kind_arg)]
        kind: EntityKind,
        id: String,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Delete a record and the images it references.
    Delete {
        #[arg(value_name = "KIND", value_parser = parse_kind_arg)]
        kind: EntityKind,
        id: String,
    },
}

#[derive(Debug, Args)]
struct ContentArgs {
    /// Column value as KEY=VALUE; VALUE is parsed as JSON when possible.
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field_arg)]
    fields: Vec<(String, Value)>,

    /// Primary image (event cover, portrait, logo or gallery picture).
    #[arg(long, value_name = "PATH")]
    featured: Option<PathBuf>,

    /// Additional gallery image; repeatable. Events only.
    #[arg(long = "gallery", value_name = "PATH")]
    gallery: Vec<PathBuf>,
}

impl ContentArgs {
    /// Files over `max_bytes` are not read; the upload policy rejects them.
    async fn apply(self, mut submission: Submission, max_bytes: u64) -> Result<Submission> {
        for (key, value) in self.fields {
            submission = submission.with_field(&key, value);
        }
        if let Some(path) = self.featured {
            let candidate = UploadCandidate::from_path(&path, max_bytes).await?;
            submission = submission.with_featured(candidate);
        }
        for path in self.gallery {
            let candidate = UploadCandidate::from_path(&path, max_bytes).await?;
            submission = submission.with_gallery_image(candidate);
        }
        Ok(submission)
    }
}

fn parse_kind_arg(input: &str) -> std::result::Result<EntityKind, String> {
    input.parse::<EntityKind>().map_err(|e| e.to_string())
}

fn parse_field_arg(input: &str) -> std::result::Result<(String, Value), String> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| format!("Invalid field '{}'. Expected format: KEY=VALUE", input))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Invalid field '{}'. Key must not be empty", input));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn report(outcome: WorkflowOutcome) -> Result<()> {
    let submitted = outcome.into_result()?;
    for warning in &submitted.warnings {
        warn!("Gallery image not saved: {}", warning);
    }
    info!("Saved record {}", submitted.record.id);
    println!(
        "{}",
        serde_json::to_string_pretty(&Value::Object(submitted.record.data))?
    );
    Ok(())
}

async fn run(app: &App, command: Command) -> Result<()> {
    let max_bytes = app.policy().max_file_size_bytes;
    match command {
        Command::Create { kind, content } => {
            let submission = content
                .apply(Submission::create(kind, Map::new()), max_bytes)
                .await?;
            report(app.submit(submission).await)
        }
        Command::Update { kind, id, content } => {
            let record = app.fetch_record(kind, &id).await?;
            let submission = content
                .apply(Submission::from_record(kind, &record), max_bytes)
                .await?;
            report(app.submit(submission).await)
        }
        Command::Delete { kind, id } => {
            app.delete_record(kind, &id).await?;
            info!("Deleted {} record {}", kind, id);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "content_admin=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    match App::new().await {
        Ok(app) => match run(&app, args.command).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Command failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    }
}
