use clap::{Parser, Subcommand};
use kielo::caption::write_caption;
use kielo::config::{self, Config};
use kielo::genai::{GeminiClient, ImageGenerator, TextGenerator};
use kielo::grammar::verify_file;
use kielo::illustrate::{IllustrateConfig, illustrate_file};
use kielo::imaging::{FontSet, RustBackend};
use kielo::overlay::{OverlayConfig, Renderer, overlay_file};
use kielo::pipeline::{Collaborators, PipelineConfig, PipelineEvent, Stage, run_pipeline};
use kielo::words::{FallbackVocabulary, LiveWordSource, WordSource, write_words};
use kielo::{naming, output};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Layout overrides shared by commands that draw cards.
#[derive(clap::Args, Clone)]
struct LayoutArgs {
    /// Base font size in pixels (the word renders at 1.5×)
    #[arg(long)]
    font_size: Option<u32>,

    /// Side padding in pixels
    #[arg(long)]
    padding: Option<u32>,
}

/// Shared flags for commands that draw cards.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Disable the card cache and redraw every card
    #[arg(long)]
    no_cache: bool,
}

#[derive(Parser)]
#[command(name = "kielo")]
#[command(version)]
#[command(about = "Illustrated bilingual vocabulary cards")]
#[command(long_about = "\
Illustrated bilingual vocabulary cards

Asks a generative-AI service for Finnish words on a topic, checks their
grammar, draws an illustration for each word, and lays the word, its
translation and an example sentence around the picture.

Artifacts:

  scripts/
  ├── words_<topic>.json          # word list (words, verify)
  └── caption_<topic>.txt         # social caption (caption)
  illustrations/
  ├── mapping.json                # word → illustration file
  └── word_<word>_<topic>.png     # blank cards (illustrate)
  illustrations_with_text/
  ├── .cache-manifest.json        # rendered-card cache
  └── word_<word>_<topic>.png     # finished cards (overlay)

The API key is read from GEMINI_API_KEY (or GOOGLE_API_KEY), also from a
.env file. Without a key, word lists and captions come from a small built-in
vocabulary and grammar verification is skipped.

Run 'kielo gen-config' to generate a documented kielo.toml.")]
struct Cli {
    /// Config file (default: ./kielo.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for word lists and captions
    #[arg(long, global = true)]
    words_dir: Option<PathBuf>,

    /// Directory for illustrations and mapping.json
    #[arg(long, global = true)]
    illustrations_dir: Option<PathBuf>,

    /// Directory for finished cards
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the word list for a topic
    Words {
        topic: String,
        /// Number of words to request
        #[arg(long)]
        count: Option<usize>,
        /// Text model
        #[arg(long)]
        model: Option<String>,
    },
    /// Verify and correct the grammar of a word list in place
    Verify {
        topic: String,
        /// Also write the corrections as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Generate an illustration for every word
    Illustrate {
        topic: String,
        /// Regenerate illustrations that already exist
        #[arg(long)]
        force: bool,
    },
    /// Draw the text onto the illustrations
    Overlay {
        topic: String,
        #[command(flatten)]
        layout: LayoutArgs,
        #[command(flatten)]
        cache: CacheArgs,
    },
    /// Write a social-media caption for a topic
    Caption { topic: String },
    /// Run the full pipeline: words → grammar → illustrate → overlay → caption
    Build {
        topic: String,
        /// Number of words to request
        #[arg(long)]
        count: Option<usize>,
        #[command(flatten)]
        layout: LayoutArgs,
        /// Start at this stage, reusing earlier artifacts
        #[arg(long, value_enum)]
        from: Option<Stage>,
        /// Only redraw the text (same as --from overlay, no caption)
        #[arg(long, conflicts_with = "from")]
        text_only: bool,
        #[command(flatten)]
        cache: CacheArgs,
        /// Regenerate illustrations that already exist
        #[arg(long)]
        force: bool,
    },
    /// Print a stock kielo.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let mut config = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        _ => config::load_config(cli.config.as_deref(), Path::new("."))?,
    };
    if let Some(dir) = &cli.words_dir {
        config.paths.words_dir = dir.clone();
    }
    if let Some(dir) = &cli.illustrations_dir {
        config.paths.illustrations_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.paths.output_dir = dir.clone();
    }

    match cli.command {
        Command::Words {
            topic,
            count,
            model,
        } => {
            if let Some(count) = count {
                config.generation.count = count;
            }
            if let Some(model) = model {
                config.generation.text_model = model;
            }
            config.validate()?;
            let client = text_client(&config);
            let live = client
                .as_ref()
                .map(|c| LiveWordSource::new(c, &config.generation.text_model));
            let report = write_words(
                live.as_ref().map(|s| s as &dyn WordSource),
                &FallbackVocabulary,
                &topic,
                config.generation.count,
                &words_path(&config, &topic),
            )?;
            output::print_words_report(&report);
        }
        Command::Verify { topic, report } => {
            let client = text_client(&config);
            let path = words_path(&config, &topic);
            let result = verify_file(
                client.as_ref().map(|c| c as &dyn TextGenerator),
                &config.generation.grammar_model,
                &path,
                &path,
                report.as_deref(),
            )?;
            output::print_grammar_report(&result);
        }
        Command::Illustrate { topic, force } => {
            let client = GeminiClient::from_config(&config)?;
            let backend = RustBackend::new();
            let report = illustrate_file(
                &client,
                &backend,
                &words_path(&config, &topic),
                &config.paths.illustrations_dir,
                &IllustrateConfig::from_config(&config, Some(&topic), force),
            )?;
            output::print_illustrate_report(&report);
        }
        Command::Overlay {
            topic,
            layout,
            cache,
        } => {
            apply_layout_args(&mut config, &layout)?;
            let fonts = FontSet::load(&config.fonts)?;
            let backend = RustBackend::with_fonts(&fonts);
            let renderer = Renderer {
                backend: &backend,
                measurer: &fonts,
                font_identity: fonts.identity(),
            };
            let report = overlay_file(
                renderer,
                &words_path(&config, &topic),
                &config.paths.illustrations_dir,
                &config.paths.output_dir,
                &OverlayConfig::from_config(&config, cache.no_cache),
            )?;
            output::print_overlay_report(&report);
        }
        Command::Caption { topic } => {
            let client = text_client(&config);
            let path = config
                .paths
                .words_dir
                .join(naming::caption_filename(&topic));
            let report = write_caption(
                client.as_ref().map(|c| c as &dyn TextGenerator),
                &config.generation.caption_model,
                &topic,
                &path,
            )?;
            output::print_caption_report(&report);
        }
        Command::Build {
            topic,
            count,
            layout,
            from,
            text_only,
            cache,
            force,
        } => {
            if let Some(count) = count {
                config.generation.count = count;
            }
            apply_layout_args(&mut config, &layout)?;

            let mut pipeline = PipelineConfig::from_config(&config, &topic);
            if let Some(from) = from {
                pipeline.from = from;
            }
            if text_only {
                pipeline = pipeline.text_only();
            }
            pipeline.overlay.no_cache = cache.no_cache;
            pipeline.illustrate.force = force;

            // Fonts first: a missing font should fail before any paid request.
            let fonts = FontSet::load(&config.fonts)?;
            let backend = RustBackend::with_fonts(&fonts);
            let client = text_client(&config);
            let collaborators = Collaborators {
                text: client.as_ref().map(|c| c as &dyn TextGenerator),
                image: client.as_ref().map(|c| c as &dyn ImageGenerator),
                renderer: Renderer {
                    backend: &backend,
                    measurer: &fonts,
                    font_identity: fonts.identity(),
                },
            };

            let stages = pipeline.stages();
            println!("==> Building '{}'", topic);
            run_pipeline(collaborators, &pipeline, &mut |event: &PipelineEvent| {
                if let PipelineEvent::StageStarted(stage) = event {
                    let position = stages.iter().position(|s| s == stage).unwrap_or(0) + 1;
                    println!("{}", output::format_stage_header(*stage, position, stages.len()));
                }
                for line in output::format_event(event) {
                    println!("{}", line);
                }
            })?;
            println!("==> Build complete: {}", pipeline.output_dir.display());
        }
        // Printed before the config was loaded.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Structured logs on stderr; `RUST_LOG` overrides the default level.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", env!("CARGO_PKG_NAME")))),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// The collaborator client, or `None` (with a warning) when no key is set.
fn text_client(config: &Config) -> Option<GeminiClient> {
    match GeminiClient::from_config(config) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("{}; continuing offline", e);
            None
        }
    }
}

fn apply_layout_args(config: &mut Config, args: &LayoutArgs) -> Result<(), config::ConfigError> {
    if let Some(size) = args.font_size {
        config.layout.font_size = size;
    }
    if let Some(padding) = args.padding {
        config.layout.padding = padding;
    }
    config.validate()
}

fn words_path(config: &Config, topic: &str) -> PathBuf {
    config.paths.words_dir.join(naming::words_filename(topic))
}
