mod parse_html;
mod seed;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pantry_core::{
    ExtractError, ExtractedRecipe, ExtractionReport, FormatKind, LocalObjectStore, ProfileRecipe,
    RecipeExtractor, TasteProfile,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pantry")]
#[command(about = "Pantry recipe extraction CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a recipe from a web page, social post or video URL
    Extract {
        url: String,
        /// Include the extraction method and fetch attempts in the output
        #[arg(long)]
        report: bool,
    },
    /// Extract a recipe from a YouTube video
    Video {
        url: String,
        #[arg(long)]
        report: bool,
    },
    /// Extract one recipe from uploaded images or PDFs
    Documents {
        /// Storage paths, relative to the storage root
        #[arg(required = true)]
        paths: Vec<String>,
        /// Storage root directory
        #[arg(long, env = "PANTRY_STORAGE_ROOT")]
        storage_root: PathBuf,
    },
    /// Structure pasted recipe text (reads stdin when no file is given)
    Text {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Split a messy ingredient or instruction block into clean lines
    Format {
        #[arg(value_enum)]
        kind: FormatArg,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Parse a recipe from a saved HTML file without any network access
    ParseHtml {
        file: PathBuf,
        /// URL the page was saved from
        #[arg(long)]
        source_url: String,
    },
    /// Extract a list of URLs one at a time, retrying transient failures
    Seed {
        /// File with one URL per line; blank lines and `#` comments are skipped
        urls_file: PathBuf,
        /// Maximum retries per URL
        #[arg(long, default_value_t = 2)]
        max_retries: u32,
        /// Seconds of backoff per attempt
        #[arg(long, default_value_t = 5)]
        backoff_secs: u64,
    },
    /// Build a taste profile from a JSON array of recipes
    Taste { recipes_file: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Ingredients,
    Instructions,
}

impl From<FormatArg> for FormatKind {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Ingredients => FormatKind::Ingredients,
            FormatArg::Instructions => FormatKind::Instructions,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pantry=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { url, report } => {
            let extractor = RecipeExtractor::from_env()?;
            print_result(extractor.extract_recipe_with_report(&url).await, report)?;
        }
        Commands::Video { url, report } => {
            let extractor = RecipeExtractor::from_env()?;
            print_result(
                extractor.extract_recipe_from_video_with_report(&url).await,
                report,
            )?;
        }
        Commands::Documents {
            paths,
            storage_root,
        } => {
            let extractor = RecipeExtractor::builder()
                .object_store(Arc::new(LocalObjectStore::new(storage_root)))
                .build()?;
            print_result(
                extractor.extract_from_documents_with_report(&paths).await,
                false,
            )?;
        }
        Commands::Text { file } => {
            let text = read_input(file.as_deref())?;
            let extractor = RecipeExtractor::from_env()?;
            print_result(extractor.extract_from_text_with_report(&text).await, false)?;
        }
        Commands::Format { kind, file } => {
            let text = read_input(file.as_deref())?;
            let extractor = RecipeExtractor::from_env()?;
            match extractor.format_text(kind.into(), &text).await {
                Ok(lines) => println!("{}", serde_json::to_string_pretty(&lines)?),
                Err(e) => return Err(report_error(e)),
            }
        }
        Commands::ParseHtml { file, source_url } => {
            parse_html::parse_html(&file, &source_url)?;
        }
        Commands::Seed {
            urls_file,
            max_retries,
            backoff_secs,
        } => {
            seed::seed(&urls_file, max_retries, backoff_secs).await?;
        }
        Commands::Taste { recipes_file } => {
            let content = fs::read_to_string(&recipes_file)
                .with_context(|| format!("Failed to read {}", recipes_file.display()))?;
            let recipes: Vec<ProfileRecipe> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", recipes_file.display()))?;
            let profile = TasteProfile::build(&recipes);
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }

    Ok(())
}

/// Read from `file`, or stdin when no file is given.
fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Print the recipe (optionally with its report) as JSON, or the error as
/// JSON with a non-zero exit.
fn print_result(
    result: Result<(ExtractedRecipe, ExtractionReport), ExtractError>,
    with_report: bool,
) -> Result<()> {
    match result {
        Ok((recipe, report)) => {
            let output = if with_report {
                json!({ "recipe": recipe, "report": report })
            } else {
                serde_json::to_value(&recipe)?
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => Err(report_error(e)),
    }
}

fn report_error(e: ExtractError) -> anyhow::Error {
    let error_json = json!({
        "error": e.user_message(),
        "status": e.status_hint(),
        "retryable": e.is_retryable(),
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(text) => println!("{}", text),
        Err(json_err) => tracing::warn!(error = %json_err, "failed to encode error"),
    }
    anyhow::anyhow!("Failed to extract recipe: {:?}", e)
}
