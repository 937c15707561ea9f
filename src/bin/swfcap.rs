use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "swfcap", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a capture movie in the external renderer and write the posted
    /// framebuffer as a PNG.
    Capture(CaptureArgs),
}

#[derive(Parser, Debug)]
struct CaptureArgs {
    /// Input capture movie (uncompressed SWF).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Renderer executable.
    #[arg(long, default_value = "flashplayerdebugger")]
    renderer: String,

    /// Local callback port the movie posts back to.
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Renderer timeout in seconds.
    #[arg(long, default_value_t = 20)]
    timeout: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Capture(args) => cmd_capture(args),
    }
}

fn cmd_capture(args: CaptureArgs) -> anyhow::Result<()> {
    let movie = args
        .in_path
        .canonicalize()
        .with_context(|| format!("resolve movie path '{}'", args.in_path.display()))?;
    let working_dir = movie.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    let config = swfcap::CaptureConfig {
        port: args.port,
        renderer_timeout: Duration::from_secs(args.timeout),
        ..Default::default()
    };
    let invoker: Arc<dyn swfcap::RendererInvoker> = Arc::new(swfcap::FlashPlayerInvoker {
        program: args.renderer,
    });

    let buffer = swfcap::capture(&movie, &working_dir, invoker, &config)?;
    buffer.save_png(&args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
