mod command;
mod settings;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use command::{Command, HELP};
use moodlens_core::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use moodlens_core::expression::infrastructure::onnx_expression_detector::OnnxExpressionDetector;
use moodlens_core::overlay::domain::overlay_renderer::OverlayRenderer;
use moodlens_core::overlay::infrastructure::image_overlay_renderer::ImageOverlayRenderer;
use moodlens_core::session::event_log::MemoryEventLog;
use moodlens_core::session::monitor_session::MonitorSession;
use settings::Settings;

/// Real-time facial expression monitoring from a camera.
///
/// Reads commands (start, stop, analyze, download, status, log, quit) from
/// standard input. Flags override the saved settings for this run.
#[derive(Parser)]
#[command(name = "moodlens")]
struct Cli {
    /// Number of frames averaged into the readout.
    #[arg(long)]
    window_size: Option<usize>,

    /// Delay between polling iterations, in milliseconds.
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Directory models are loaded from and downloaded to.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Camera device (e.g. /dev/video0, or an avfoundation index).
    #[arg(long)]
    device: Option<String>,

    /// Ideal capture width.
    #[arg(long)]
    width: Option<u32>,

    /// Ideal capture height.
    #[arg(long)]
    height: Option<u32>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Write the rendered overlay to this PNG after every frame.
    #[arg(long)]
    overlay_output: Option<PathBuf>,

    /// Base URL the model weight files are downloaded from.
    #[arg(long)]
    model_base_url: Option<String>,

    /// Where the face detector model is downloaded from.
    #[arg(long)]
    face_model_url: Option<String>,

    /// Where the expression classifier model is downloaded from.
    #[arg(long)]
    expression_model_url: Option<String>,

    /// Persist the effective settings as the new defaults.
    #[arg(long)]
    save_settings: bool,
}

impl Cli {
    fn apply(self, settings: &mut Settings) {
        if let Some(v) = self.window_size {
            settings.window_size = v;
        }
        if let Some(v) = self.poll_interval_ms {
            settings.poll_interval_ms = v;
        }
        if let Some(v) = self.models_dir {
            settings.models_dir = v;
        }
        if self.device.is_some() {
            settings.device = self.device;
        }
        if self.width.is_some() || self.height.is_some() {
            settings.width = self.width;
            settings.height = self.height;
        }
        if let Some(v) = self.confidence {
            settings.confidence = v;
        }
        if self.overlay_output.is_some() {
            settings.overlay_output = self.overlay_output;
        }
        if let Some(v) = self.model_base_url {
            settings.model_base_url = v;
        }
        if let Some(v) = self.face_model_url {
            settings.face_model_url = v;
        }
        if let Some(v) = self.expression_model_url {
            settings.expression_model_url = v;
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    // a pending stdin read would otherwise keep the runtime alive
    process::exit(0);
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let save = cli.save_settings;
    let mut settings = Settings::load();
    cli.apply(&mut settings);
    settings.validate()?;

    if save {
        let path = settings.save()?;
        log::info!("Settings saved to {}", path.display());
    }

    let renderer: Box<dyn OverlayRenderer> = match &settings.overlay_output {
        Some(path) => Box::new(ImageOverlayRenderer::with_snapshot(path)),
        None => Box::new(ImageOverlayRenderer::new()),
    };
    let event_log = MemoryEventLog::default();
    let mut session = MonitorSession::new(
        Box::new(FfmpegCamera::new()),
        Box::new(OnnxExpressionDetector::new(settings.confidence)),
        renderer,
        Box::new(event_log.clone()),
        settings.session_config(),
    );

    let mut readout = session.subscribe_readout();
    let printer = tokio::spawn(async move {
        while readout.changed().await.is_ok() {
            let line = readout.borrow_and_update().to_string();
            println!("{line}");
        }
    });

    println!("{}", session.readout());
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        execute(command, &mut session, &event_log).await;
    }

    session.dispose().await;
    printer.abort();
    if let Some(line) = event_log.lines().first() {
        println!("{line}");
    }
    Ok(())
}

async fn execute(command: Command, session: &mut MonitorSession, event_log: &MemoryEventLog) {
    match command {
        Command::Start => match session.start().await {
            Ok(()) => println!("Camera started."),
            Err(e) => eprintln!("Could not start: {e}"),
        },
        Command::Stop => println!("{}", stop_message(session.stop().await)),
        Command::Analyze => {
            if let Err(e) = session.analyze_once().await {
                eprintln!("Could not analyze: {e}");
            }
        }
        Command::Download => {
            let outcomes = session.download_model_resources().await;
            let ok = outcomes.iter().filter(|o| o.is_ok()).count();
            println!(
                "Downloaded {ok}/{} files to {}",
                outcomes.len(),
                session.config().models_dir.display()
            );
            for outcome in outcomes {
                if let Err(e) = outcome.result {
                    eprintln!("  {}: {e}", outcome.name);
                }
            }
        }
        Command::Status => {
            println!(
                "State: {} | Polling: {} | Window: {}/{}",
                session.state(),
                if session.is_polling() { "yes" } else { "no" },
                session.window_len().await,
                session.config().window_size
            );
            println!("{}", session.readout());
        }
        Command::Log => {
            for line in event_log.lines() {
                println!("{line}");
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

fn stop_message(stopped: bool) -> &'static str {
    if stopped {
        "Camera stopped."
    } else {
        "Camera is not running."
    }
}
