//! TeachableVision entry point.

use std::io::IsTerminal;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use teachable_vision::{
    bind, Classifier, EmbeddingEngine, Frame, FrameRateScheduler, JsonLinesPresenter, KeyMap,
    ModeCell, Presenter, SyntheticSource, TracingPresenter, VideoSource, VisionError,
};
use teachable_vision_cli::config::{resolve_model_path, OutputFormat, PreprocessArg};
use teachable_vision_cli::{repl, RunArgs, RunSettings};

#[derive(Parser)]
#[command(
    name = "teachable-vision",
    about = "Teach a k-NN classifier from live frames: hold a digit to record a class, release to predict",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the capture-predict loop (default).
    Run(RunArgs),

    /// Print the effective configuration as JSON.
    Info(RunArgs),

    /// Load the embedding model and report its output dimension.
    CheckModel {
        /// Path to the ONNX embedding model.
        #[arg(long)]
        model: Option<String>,

        /// Pixel normalization expected by the model.
        #[arg(long, value_enum, default_value_t = PreprocessArg::Mobilenet)]
        preprocess: PreprocessArg,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            let settings = args.into_settings()?;
            run(settings).await?;
        }

        Commands::Info(args) => {
            let settings = args.into_settings()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }

        Commands::CheckModel { model, preprocess } => {
            let model_path = resolve_model_path(model.as_deref());
            let mut engine = EmbeddingEngine::new(model_path.as_deref(), preprocess.into())?;
            let mut sample = SyntheticSource::new(64, 64, 1)?;
            let frame: Frame = sample.acquire_frame()?;
            let embedding = engine.embed_image(&frame.image)?;
            let info = serde_json::json!({
                "model": model_path,
                "loaded": engine.has_model(),
                "embedding_dim": embedding.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "teachable-vision", &mut std::io::stdout());
        }
    }

    Ok(())
}

async fn run(settings: RunSettings) -> anyhow::Result<()> {
    let mode = Arc::new(ModeCell::new());
    let keys = KeyMap::new(settings.loop_config.num_classes);

    let presenter: Box<dyn Presenter> = match settings.output {
        OutputFormat::Text => Box::new(TracingPresenter::new()),
        OutputFormat::Json => Box::new(
            JsonLinesPresenter::new(std::io::stdout()).with_thumbnails(settings.thumbnails),
        ),
    };

    let model_path = settings.model_path.clone();
    let preprocess = settings.preprocess;
    let load_embedder = async move {
        let loader = move || EmbeddingEngine::new(model_path.as_deref(), preprocess);
        match tokio::task::spawn_blocking(loader).await {
            Ok(result) => result,
            Err(e) => Err(VisionError::Embedding(format!("Model loader failed: {e}"))),
        }
    };

    let source = settings.source.clone();
    let setup_source = async move { source.open() };

    let mut capture = bind(
        settings.loop_config.clone(),
        Arc::clone(&mode),
        presenter,
        load_embedder,
        setup_source,
    )
    .await?;

    if settings.interactive && std::io::stdin().is_terminal() {
        repl::spawn(Arc::clone(&mode), keys)?;
    } else if settings.interactive {
        tracing::info!("Stdin is not a terminal, running without training input");
    }

    let mut scheduler = FrameRateScheduler::new(settings.loop_config.frame_rate);
    let frames = capture.run(&mut scheduler).await?;
    tracing::info!(
        "Processed {frames} frames, {} examples stored",
        capture.classifier().total_examples()
    );
    Ok(())
}
