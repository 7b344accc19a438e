use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use scene_vision::{
    AgentError, AnalysisRunner, CaptureBackend, CameraPoseTransport, Config, Coordinator, FrameCapturer,
    MetricsLedger, MetricsRecord, Movement, Scene, SceneCamera, SceneViewport, Session, SharedCamera,
};

/// Scene Vision - answer questions about a 3D scene by steering its camera
#[derive(Parser, Debug)]
#[command(
    name = "scene-vision",
    about = "Vision-to-control agent: capture a viewport, ask a vision model, move the camera, repeat",
    after_help = "ENVIRONMENT VARIABLES:\n\
        SCENE_VISION_ENDPOINT          API base URL\n\
        SCENE_VISION_API_KEY           API key (falls back to OPENAI_API_KEY)\n\
        SCENE_VISION_MODEL             Vision model name\n\
        SCENE_VISION_MODE              chat-style | native-structured\n\
        SCENE_VISION_REQUEST_TIMEOUT   Per-call timeout (seconds)\n\
        SCENE_VISION_MAX_ITERATIONS    Iteration budget\n\
        SCENE_VISION_SESSION_DIR       Base directory for sessions\n\
        RUST_LOG                       Log filter (default: scene_vision=info)"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question about the scene and let the agent look around
    Ask {
        /// The question to answer
        question: String,

        /// Scene description JSON (default: built-in demo factory)
        #[arg(long, env = "SCENE_VISION_SCENE")]
        scene: Option<PathBuf>,

        /// Viewport width in pixels
        #[arg(short = 'W', long, default_value = "1280")]
        width: u32,

        /// Viewport height in pixels
        #[arg(short = 'H', long, default_value = "720")]
        height: u32,

        /// Directory for captured frames (default: auto-generated in session dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep frames after completion (default: cleanup unless --output is specified)
        #[arg(long, short = 'k')]
        keep: bool,

        /// Output the outcome as JSON
        #[arg(long)]
        json: bool,

        /// Append a row to this metrics CSV
        #[arg(long)]
        metrics: Option<PathBuf>,

        /// Answer rating recorded in the metrics row
        #[arg(long, default_value = "", requires = "metrics")]
        rate_answer: String,

        /// Navigation rating recorded in the metrics row
        #[arg(long, default_value = "", requires = "metrics")]
        rate_navigation: String,

        /// Client mode: chat-style or native-structured (overrides SCENE_VISION_MODE)
        #[arg(long)]
        mode: Option<String>,

        /// Model name (overrides SCENE_VISION_MODEL)
        #[arg(long)]
        model: Option<String>,

        /// API base URL (overrides SCENE_VISION_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,

        /// Iteration budget (overrides SCENE_VISION_MAX_ITERATIONS)
        #[arg(long)]
        max_iterations: Option<u32>,
    },

    /// Render the scene to a PNG, optionally after a camera move
    Render {
        /// Scene description JSON (default: built-in demo factory)
        #[arg(long, env = "SCENE_VISION_SCENE")]
        scene: Option<PathBuf>,

        /// Viewport width in pixels
        #[arg(short = 'W', long, default_value = "1280")]
        width: u32,

        /// Viewport height in pixels
        #[arg(short = 'H', long, default_value = "720")]
        height: u32,

        /// Output file path
        #[arg(short, long, default_value = "./viewport.png")]
        output: PathBuf,

        /// Move along the viewing direction (cm)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        forward: i32,

        /// Move up (cm)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        upward: i32,

        /// Strafe right (cm)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        right: i32,

        /// Look up (degrees)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        pitch: i32,

        /// Turn right (degrees)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        yaw: i32,

        /// Write the scene description as JSON instead of rendering
        #[arg(long)]
        dump_scene: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("scene_vision=info".parse()?),
        )
        .init();

    match args.command {
        Commands::Ask {
            question,
            scene,
            width,
            height,
            output,
            keep,
            json,
            metrics,
            rate_answer,
            rate_navigation,
            mode,
            model,
            endpoint,
            max_iterations,
        } => {
            if question.trim().is_empty() {
                bail!("Please enter a question.");
            }

            let mut config = Config::from_env();
            if let Some(mode) = mode {
                config.vision.mode = mode;
            }
            if let Some(model) = model {
                config.vision.model = model;
            }
            if let Some(endpoint) = endpoint {
                config.vision.endpoint = endpoint;
            }
            if let Some(max_iterations) = max_iterations {
                config.agent.max_iterations = max_iterations;
            }

            let scene = load_scene(scene.as_ref())?;
            let session = match output {
                Some(dir) => Session::in_dir(dir),
                None => Session::from_settings(&config.session).keep(keep),
            };
            session.init().context("Failed to create session directory")?;

            let camera = SharedCamera::new(SceneCamera::new(scene.start_pose));
            let viewport = SceneViewport::new(scene, camera.clone(), width, height);
            let frames = FrameCapturer::new(Box::new(viewport), &session.dir, config.capture.clone());
            let coordinator = Coordinator::from_config(&config, Box::new(camera), Box::new(frames))?;

            let mut runner = AnalysisRunner::new(coordinator);
            runner.start(question.clone()).await?;
            if !json {
                eprintln!("Analyzing...");
            }

            let finished = tokio::select! {
                result = runner.wait() => Some(result),
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(result) = finished else {
                runner.cancel().await;
                return Err(AgentError::Cancelled.into());
            };
            let outcome = result?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", outcome.describe());
            }
            std::fs::write(session.outcome_path(), serde_json::to_string_pretty(&outcome)?)?;

            if let Some(path) = metrics {
                let record = MetricsRecord::new(config.vision.model.clone(), question, outcome)
                    .ratings(rate_answer, rate_navigation);
                let ledger = MetricsLedger::new(path);
                ledger.append(&record).await.context("Failed to write metrics")?;
                info!(path = %ledger.path().display(), "saved metrics");
            }

            if !json && session.keep {
                println!("\nSession: {}", session.dir.display());
            }
        }

        Commands::Render {
            scene,
            width,
            height,
            output,
            forward,
            upward,
            right,
            pitch,
            yaw,
            dump_scene,
        } => {
            let scene = load_scene(scene.as_ref())?;
            if dump_scene {
                std::fs::write(&output, serde_json::to_string_pretty(&scene)?)?;
                println!("Wrote scene description: {}", output.display());
                return Ok(());
            }

            let mut camera = SharedCamera::new(SceneCamera::new(scene.start_pose));
            camera.apply_delta(&Movement {
                forward,
                upward,
                right,
                pitch,
                yaw,
            });
            let mut viewport = SceneViewport::new(scene, camera.clone(), width, height);
            viewport.write_capture(&output)?;

            let pose = camera.pose();
            println!("Rendered viewport: {}", output.display());
            println!("  Size: {}x{}", width, height);
            println!("  Pose: {}", serde_json::to_string(&pose)?);
        }
    }

    Ok(())
}

fn load_scene(path: Option<&PathBuf>) -> Result<Scene> {
    match path {
        Some(path) => Scene::from_json_file(path)
            .with_context(|| format!("Failed to load scene from {}", path.display())),
        None => Ok(Scene::demo()),
    }
}
