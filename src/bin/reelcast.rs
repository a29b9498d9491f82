use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser, Debug)]
#[command(name = "reelcast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a project to a video file (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render the frame at one timestamp as a PNG.
    Frame(FrameArgs),
    /// Show which codec/container candidate the local `ffmpeg` supports.
    Encoders(EncodersArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path. The extension is not changed to match the negotiated container.
    #[arg(long)]
    out: PathBuf,

    /// Asset root; defaults to the project's directory.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Pace ticks against the wall clock instead of rendering as fast as possible.
    #[arg(long)]
    realtime: bool,

    /// How long to wait for required assets.
    #[arg(long, default_value_t = 10_000)]
    priming_timeout_ms: u64,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output time in seconds.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Asset root; defaults to the project's directory.
    #[arg(long)]
    assets: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct EncodersArgs {
    /// Require an audio encoder as well.
    #[arg(long)]
    audio: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Encoders(args) => cmd_encoders(args),
    }
}

fn load_project(
    in_path: &Path,
    assets: Option<PathBuf>,
) -> anyhow::Result<(reelcast::Composition, reelcast::ExportOpts)> {
    let project = reelcast::ProjectDef::from_path(in_path)?;
    let comp = project
        .into_composition()
        .with_context(|| format!("build composition from '{}'", in_path.display()))?;
    let root = assets.unwrap_or_else(|| {
        in_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let opts = reelcast::ExportOpts::new(Arc::new(reelcast::FsResolver::new(root)));
    Ok((comp, opts))
}

fn print_warnings(warnings: &[reelcast::ExportWarning]) {
    for w in warnings {
        eprintln!("warning: {w}");
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (comp, mut opts) = load_project(&args.in_path, args.assets)?;
    if !args.realtime {
        opts.clock = Arc::new(reelcast::ManualClock::new());
    }
    opts.priming_timeout = Duration::from_millis(args.priming_timeout_ms);

    let mut sink = reelcast::FfmpegSink::new(reelcast::FfmpegSinkOpts::with_out_path(&args.out));
    let mut session = comp.start_export(opts)?;
    let outcome = session.run(&mut sink)?;

    print_warnings(&outcome.warnings);
    let written = reelcast::encode::ffmpeg::container_path(&args.out, &outcome.output.extension);
    eprintln!(
        "wrote {} ({}, {} frames, {:.3}s)",
        written.display(),
        outcome.output.mime,
        outcome.output.frames,
        outcome.output.duration_sec
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (comp, opts) = load_project(&args.in_path, args.assets)?;
    let still = comp.render_frame_at(&opts, args.time)?;
    print_warnings(&still.warnings);
    still.frame.write_png(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_encoders(args: EncodersArgs) -> anyhow::Result<()> {
    use reelcast::EncoderProbe as _;

    let available = reelcast::FfmpegEncoderProbe.available_encoders()?;
    for c in &reelcast::encode::negotiate::CANDIDATES {
        let ok = available.contains(c.video_encoder)
            && (!args.audio || available.contains(c.audio_encoder));
        println!(
            "{} {:<16} video={} audio={}",
            if ok { "+" } else { "-" },
            c.label,
            c.video_encoder,
            c.audio_encoder
        );
    }
    let chosen = reelcast::encode::negotiate::negotiate(&reelcast::FfmpegEncoderProbe, args.audio)?;
    println!("selected: {} ({})", chosen.label, chosen.mime);
    Ok(())
}
