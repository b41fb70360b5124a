use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use atty::Stream;
use clap::{ArgAction, Args, Parser, Subcommand};
use coref_demo_rs::client::DEFAULT_BASE_URL;
use coref_demo_rs::{
    ClientConfig, ExampleCatalog, Language, MemorySurface, ModelChoice, Resolution, StatusPolicy,
    SubmissionController, SubmitOutcome, manual_mentions, show_random_example,
};
use rand::thread_rng;
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "coref-demo-rs",
    about = "Submit documents to a coreference-resolution server",
    version
)]
pub struct Cli {
    /// Emit JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Log more (-v for info, -vv for debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Example catalog (JSON object of language tag to documents) to use
    /// instead of the bundled one.
    #[arg(long, global = true, value_name = "FILE")]
    examples: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a random example document.
    Example {
        /// Restrict the pick to one language instead of flipping a coin.
        #[arg(short, long)]
        language: Option<Language>,
    },
    /// Submit a document and print the mentions and clusters found.
    Submit(SubmitArgs),
    /// Render a saved `api/clusters` reply.
    Render {
        /// JSON file to read; stdin when omitted.
        file: Option<PathBuf>,
    },
    /// List the mentions marked with square brackets in a document.
    Annotate(InputArgs),
    /// Serve the demo page.
    #[cfg(feature = "web")]
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        #[command(flatten)]
        server: ServerArgs,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Document text.
    #[arg(conflicts_with = "file")]
    text: Option<String>,
    /// Read the document from a file.
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl InputArgs {
    fn read(&self) -> Result<Option<String>, Box<dyn Error>> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(Some(text.clone())),
            (None, Some(path)) => Ok(Some(fs::read_to_string(path)?)),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Args, Debug)]
struct ServerArgs {
    /// Base URL of the coreference server; `api/clusters` is resolved against it.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    server: String,
    /// Give up after this many seconds. Waits indefinitely by default.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Parse the reply even when the server answers with an error status.
    #[arg(long)]
    lenient_status: bool,
}

impl ServerArgs {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server.clone(),
            status_policy: if self.lenient_status {
                StatusPolicy::Lenient
            } else {
                StatusPolicy::Strict
            },
            timeout: self.timeout.map(Duration::from_secs),
            ..ClientConfig::default()
        }
    }
}

#[derive(Args, Debug)]
struct SubmitArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    server: ServerArgs,
    /// Model to use: pt, es, pt-transferred, or its index. Defaults to the
    /// example's language, or pt for supplied text.
    #[arg(short, long)]
    model: Option<ModelChoice>,
    /// Mentions are marked with square brackets; skip automatic detection.
    #[arg(long)]
    manual: bool,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let catalog = match &cli.examples {
        Some(path) => ExampleCatalog::from_path(path)?,
        None => ExampleCatalog::builtin(),
    };
    match cli.command {
        Command::Example { language } => handle_example(&catalog, language, cli.json),
        Command::Submit(args) => handle_submit(&catalog, args, cli.json),
        Command::Render { file } => handle_render(file, cli.json),
        Command::Annotate(input) => handle_annotate(&catalog, input, cli.json),
        #[cfg(feature = "web")]
        Command::Serve { addr, server } => handle_serve(catalog, addr, server),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn runtime() -> io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

fn handle_example(
    catalog: &ExampleCatalog,
    language: Option<Language>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut rng = thread_rng();
    let example = match language {
        Some(language) => catalog.pick_example(language, &mut rng)?,
        None => catalog.pick_random_example(&mut rng)?,
    };
    let model = example.language.model();

    if as_json {
        let payload = json!({
            "language": example.language.tag(),
            "model": model.index(),
            "model_tag": model.tag(),
            "text": example.text,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "Language: {} (model {}: {})",
            example.language,
            model.index(),
            model.label()
        );
        println!();
        println!("{}", example.text);
    }
    Ok(())
}

fn handle_submit(
    catalog: &ExampleCatalog,
    args: SubmitArgs,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let automatic = !args.manual;
    let mut surface = match args.input.read()? {
        Some(text) => MemorySurface::new(text, ModelChoice::default().index(), automatic),
        None => {
            let mut surface = MemorySurface::new("", ModelChoice::default().index(), automatic);
            show_random_example(&mut surface, catalog, &mut thread_rng())?;
            surface
        }
    };
    if let Some(model) = args.model {
        surface.model = model.index();
    }
    if args.manual {
        match manual_mentions(&surface.document) {
            Ok(markup) => {
                for problem in &markup.warnings {
                    warn!(error = %problem, "skipping malformed mention markup");
                }
            }
            Err(err) => warn!(error = %err, "mention markup is unbalanced; submitting anyway"),
        }
    }

    let controller = SubmissionController::from_config(&args.server.client_config())?;
    let outcome = runtime()?.block_on(controller.handle_submit(&mut surface))?;
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&submit_payload(&surface, &outcome))?
        );
    } else if outcome != SubmitOutcome::Skipped {
        print_block("Mentions", &surface.mentions_output);
        print_block("Clusters", &surface.clusters_output);
    }
    Ok(())
}

fn submit_payload(surface: &MemorySurface, outcome: &SubmitOutcome) -> serde_json::Value {
    match outcome {
        SubmitOutcome::Skipped => json!({ "skipped": true }),
        SubmitOutcome::Rendered(_) => json!({
            "document": surface.document,
            "model": surface.model,
            "automaticMentionDetection": surface.automatic_mention_detection,
            "mentions": surface.mentions_output,
            "clusters": surface.clusters_output,
        }),
    }
}

fn handle_render(file: Option<PathBuf>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let body = match file {
        Some(path) => fs::read(path)?,
        None => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            buffer
        }
    };
    let resolution = Resolution::from_json(&body)?;
    let output = resolution.render();

    if as_json {
        let payload = json!({
            "summary": resolution.summary(),
            "mentions": output.mentions,
            "clusters": output.clusters,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_block("Mentions", &output.mentions);
        print_block("Clusters", &output.clusters);
    }
    Ok(())
}

fn handle_annotate(
    catalog: &ExampleCatalog,
    input: InputArgs,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let text = match input.read()? {
        Some(text) => text,
        None => catalog
            .pick_random_example(&mut thread_rng())?
            .text
            .to_string(),
    };
    let markup = manual_mentions(&text)?;
    let mentions = &markup.mentions;

    if as_json {
        let payload: Vec<_> = mentions
            .iter()
            .map(|mention| {
                json!({
                    "start": mention.start,
                    "end": mention.end,
                    "text": mention.text,
                })
            })
            .collect();
        let warnings: Vec<_> = markup.warnings.iter().map(|w| w.to_string()).collect();
        let payload = json!({ "mentions": payload, "warnings": warnings });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    for problem in &markup.warnings {
        warn!(error = %problem, "skipped malformed mention markup");
    }

    if mentions.is_empty() {
        println!("No bracketed mentions found.");
        return Ok(());
    }
    let width = mentions.len().to_string().len();
    for (idx, mention) in mentions.iter().enumerate() {
        println!(
            "{:>width$}  tokens {}-{}  {}",
            idx + 1,
            mention.start,
            mention.end,
            mention.text,
            width = width
        );
    }
    Ok(())
}

#[cfg(feature = "web")]
fn handle_serve(
    catalog: ExampleCatalog,
    addr: std::net::SocketAddr,
    server: ServerArgs,
) -> Result<(), Box<dyn Error>> {
    let config = coref_demo_rs::web::WebConfig {
        addr,
        client: server.client_config(),
        catalog,
    };
    runtime()?.block_on(coref_demo_rs::web::serve(config))?;
    Ok(())
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn print_block(title: &str, body: &str) {
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let shown = if body.is_empty() { "(none)" } else { body };
        let markdown = format!("## {title}\n```\n{shown}\n```");
        let formatted = FmtText::from(&skin, &markdown, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{title}:");
        println!("{body}");
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_submission_still_prints_json() {
        let surface = MemorySurface::new("  ", 0, true);
        assert_eq!(
            submit_payload(&surface, &SubmitOutcome::Skipped),
            json!({ "skipped": true })
        );
    }

    #[test]
    fn rendered_submission_reports_outputs() {
        let mut surface = MemorySurface::new("Alice met Bob.", 1, false);
        surface.mentions_output = "1: \"Alice\"".to_string();
        let outcome = SubmitOutcome::Rendered(Default::default());
        let payload = submit_payload(&surface, &outcome);
        assert_eq!(payload["model"], 1);
        assert_eq!(payload["automaticMentionDetection"], false);
        assert_eq!(payload["mentions"], "1: \"Alice\"");
        assert_eq!(payload["clusters"], "");
        assert!(payload.get("skipped").is_none());
    }
}
