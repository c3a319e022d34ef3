//! CLI for WallGen - phone wallpapers from a prompt, four at a time.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use wallgen::{
    generate_batch, ApiKeySlot, BatchOutcome, CredentialGate, GeminiModel, GeminiProvider,
    GeminiProviderBuilder, GeneratedImage, ImageSize, Notice, Studio, StudioConfig,
    TerminalKeySelector, Wallpaper, WallpaperStore,
};

#[derive(Parser)]
#[command(name = "wallgen")]
#[command(about = "Generate portrait phone wallpapers with Gemini, four variations at a time")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Gemini model to use
    #[arg(long, global = true, value_enum, default_value = "pro")]
    model: ModelArg,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate four wallpapers from a text prompt and save them
    Generate(GenerateArgs),

    /// Generate four variations of an existing image and save them
    Remix(RemixArgs),

    /// Start an interactive session (generate, view, remix, download)
    Interactive,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the wallpaper
    prompt: String,

    /// Size tier
    #[arg(short, long, value_enum)]
    size: Option<SizeArg>,

    /// Directory to save wallpapers into
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args)]
struct RemixArgs {
    /// Image to use as the reference (raw image or a file holding a data URL)
    image: PathBuf,

    /// Atmosphere for the variation
    #[arg(short, long)]
    prompt: String,

    /// Directory to save wallpapers into
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Pro,
    Flash,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Pro => GeminiModel::Pro,
            ModelArg::Flash => GeminiModel::Flash,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SizeArg {
    #[value(name = "1K", alias = "1k")]
    OneK,
    #[value(name = "2K", alias = "2k")]
    TwoK,
}

impl From<SizeArg> for ImageSize {
    fn from(arg: SizeArg) -> Self {
        match arg {
            SizeArg::OneK => ImageSize::OneK,
            SizeArg::TwoK => ImageSize::TwoK,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = StudioConfig::from_env()?;
    let slot = ApiKeySlot::new();
    let gate = CredentialGate::new(Arc::new(TerminalKeySelector::new(slot.clone())));
    let factory = GeminiProvider::builder()
        .key_slot(slot)
        .model(cli.model.into());

    match cli.command {
        Commands::Generate(args) => generate(args, gate, factory, config, cli.json).await,
        Commands::Remix(args) => remix(args, gate, factory, config, cli.json).await,
        Commands::Interactive => interactive(Studio::new(gate, Arc::new(factory), config)).await,
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wallgen=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn generate(
    args: GenerateArgs,
    gate: CredentialGate,
    factory: GeminiProviderBuilder,
    config: StudioConfig,
    json_output: bool,
) -> anyhow::Result<()> {
    let size = args.size.map(Into::into).unwrap_or(config.default_size);
    let output_dir = args.output_dir.unwrap_or_else(|| config.download_dir.clone());
    let mut studio = Studio::new(gate, Arc::new(factory), config);

    let ids = match studio.submit(&args.prompt, size).await {
        BatchOutcome::Added(ids) => ids,
        BatchOutcome::Failed(notice) => anyhow::bail!("{notice}"),
        BatchOutcome::Ignored => anyhow::bail!("prompt must not be empty"),
    };

    let saved = ids
        .into_iter()
        .map(|id| studio.download(id, Some(output_dir.as_path())))
        .collect::<wallgen::Result<Vec<_>>>()?;
    let wallpapers: Vec<&Wallpaper> = studio.wallpapers().iter().collect();
    report(&wallpapers, &saved, json_output)
}

async fn remix(
    args: RemixArgs,
    gate: CredentialGate,
    factory: GeminiProviderBuilder,
    config: StudioConfig,
    json_output: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read(&args.image)?;
    let reference = if raw.starts_with(b"data:") {
        GeneratedImage::from_data_url(std::str::from_utf8(&raw)?)?.data
    } else {
        raw
    };
    let output_dir = args.output_dir.unwrap_or(config.download_dir);

    if let Err(e) = gate.ensure_credential().await {
        tracing::warn!("key selection failed: {e}");
    }
    let batch = generate_batch(&factory, &args.prompt, ImageSize::SMALLEST, Some(&reference));
    let images = match batch.await {
        Ok(images) if !images.is_empty() => images,
        Ok(_) => anyhow::bail!("{}", Notice::GenerationFailed),
        Err(e) => {
            tracing::error!("batch generation failed: {e}");
            anyhow::bail!("{}", Notice::Unexpected)
        }
    };

    let mut store = WallpaperStore::new();
    let added = store.append_batch(images, &args.prompt, true);
    let saved = added
        .iter()
        .map(|w| w.download(&output_dir))
        .collect::<wallgen::Result<Vec<_>>>()?;
    let wallpapers: Vec<&Wallpaper> = added.iter().collect();
    report(&wallpapers, &saved, json_output)
}

fn report(wallpapers: &[&Wallpaper], saved: &[PathBuf], json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let items: Vec<_> = wallpapers
            .iter()
            .zip(saved)
            .map(|(w, path)| {
                serde_json::json!({
                    "id": w.id,
                    "prompt": w.prompt,
                    "created_at": w.created_at,
                    "output": path.display().to_string(),
                    "size_bytes": w.image.size(),
                    "format": w.image.format.extension(),
                    "model": w.image.metadata.model,
                    "duration_ms": w.image.metadata.duration_ms,
                })
            })
            .collect();
        let result = serde_json::json!({
            "success": true,
            "count": items.len(),
            "wallpapers": items,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Generated {} wallpaper(s):", saved.len());
        for (w, path) in wallpapers.iter().zip(saved) {
            println!("  {} ({} bytes)", path.display(), w.image.size());
        }
    }
    Ok(())
}

const HELP: &str = "\
commands:
  gen [--1k|--2k] <prompt>   generate four wallpapers
  list                       list wallpapers, newest first
  view <n>                   open wallpaper n in the viewer
  close                      close the viewer
  remix [n]                  remix wallpaper n (or the one in the viewer)
  download [n] [dir]         save wallpaper n (or the one in the viewer)
  help                       show this help
  quit                       leave the session";

async fn interactive(mut studio: Studio) -> anyhow::Result<()> {
    match studio.gate().ensure_credential().await {
        Ok(true) => {}
        Ok(false) => eprintln!("No API key selected; generation will fail until one is set."),
        Err(e) => tracing::error!("key selection error: {e}"),
    }

    let mut status = studio.subscribe();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            if current.in_progress {
                eprintln!("{}", current.message);
            }
        }
    });

    println!("{HELP}");
    loop {
        let Some(line) = read_line("> ").await? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => {}
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "list" => print_list(&studio),
            "gen" => {
                let (size, prompt) = parse_size_flag(rest, studio.config().default_size);
                if prompt.is_empty() {
                    println!("usage: gen [--1k|--2k] <prompt>");
                    continue;
                }
                let outcome = studio.submit(prompt, size).await;
                print_outcome(&studio, outcome);
            }
            "view" => match resolve(&studio, rest) {
                Some(id) => {
                    let wallpaper = studio.select(id)?;
                    print_wallpaper(wallpaper);
                }
                None => println!("no such wallpaper"),
            },
            "close" => studio.close_viewer(),
            "remix" => match resolve(&studio, rest) {
                Some(id) => {
                    let outcome = studio.remix(id).await?;
                    print_outcome(&studio, outcome);
                }
                None => println!("no such wallpaper"),
            },
            "download" => {
                let (index, dir) = rest.split_once(' ').unwrap_or((rest, ""));
                let (target, dir) = match index.parse::<usize>() {
                    Ok(_) => (resolve(&studio, index), dir.trim()),
                    // Not a number: the argument is the directory.
                    Err(_) => (resolve(&studio, ""), rest),
                };
                match target {
                    Some(id) => {
                        let dir = (!dir.is_empty()).then(|| Path::new(dir));
                        match studio.download(id, dir) {
                            Ok(path) => println!("saved {}", path.display()),
                            Err(e) => println!("download failed: {e}"),
                        }
                    }
                    None => println!("no such wallpaper"),
                }
            }
            other => println!("unknown command '{other}', try 'help'"),
        }
    }
    Ok(())
}

/// Splits a leading `--1k`/`--2k` flag off a prompt.
fn parse_size_flag(input: &str, default: ImageSize) -> (ImageSize, &str) {
    match input.split_once(' ') {
        Some((flag, prompt)) if flag.eq_ignore_ascii_case("--1k") => (ImageSize::OneK, prompt.trim()),
        Some((flag, prompt)) if flag.eq_ignore_ascii_case("--2k") => (ImageSize::TwoK, prompt.trim()),
        _ => (default, input),
    }
}

/// Maps a 1-based list position, or the viewer selection when empty, to an id.
fn resolve(studio: &Studio, arg: &str) -> Option<Uuid> {
    if arg.is_empty() {
        return studio.selected().map(|w| w.id);
    }
    let n: usize = arg.parse().ok()?;
    studio.wallpapers().get_index(n.checked_sub(1)?).map(|w| w.id)
}

fn print_outcome(studio: &Studio, outcome: BatchOutcome) {
    match outcome {
        BatchOutcome::Added(ids) => {
            println!("added {} wallpaper(s)", ids.len());
            print_list(studio);
        }
        BatchOutcome::Failed(notice) => println!("{notice}"),
        BatchOutcome::Ignored => {}
    }
}

fn print_list(studio: &Studio) {
    if studio.wallpapers().is_empty() {
        println!("no wallpapers yet, try: gen a rainy city at night");
        return;
    }
    let selected = studio.selected().map(|w| w.id);
    for (i, w) in studio.wallpapers().iter().enumerate() {
        let marker = if Some(w.id) == selected { "*" } else { " " };
        println!(
            "{marker}{:>3}. {} [{}, {} bytes]",
            i + 1,
            w.prompt,
            w.image.format.extension(),
            w.image.size()
        );
    }
}

fn print_wallpaper(w: &Wallpaper) {
    println!("id:      {}", w.id);
    println!("prompt:  {}", w.prompt);
    println!("created: {}", w.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("image:   {} bytes ({})", w.image.size(), w.image.format.mime_type());
    if let Some(ref model) = w.image.metadata.model {
        println!("model:   {model}");
    }
}

async fn read_line(prompt: &'static str) -> anyhow::Result<Option<String>> {
    let line = tokio::task::spawn_blocking(move || -> std::io::Result<Option<String>> {
        use std::io::Write;
        let mut stdout = std::io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut line = String::new();
        match std::io::stdin().read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    })
    .await??;
    Ok(line)
}
