use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use depgraph_timeline::capture::{HeadlessBrowserCapture, RenderCapture};
use depgraph_timeline::config::Config;
use depgraph_timeline::contributors::ContributorIdentity;
use depgraph_timeline::convert::{ConvertOptions, convert_svgs};
use depgraph_timeline::pipeline::Pipeline;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "depgraph-timeline", version, long_version = LONG_VERSION, about)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "DEPGRAPH_TIMELINE_CONFIG")]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk the history and write the animated timeline
    Timeline(TimelineArgs),
    /// Fetch the contributor history and print the cumulative ledger
    Contributors(RepoArgs),
    /// Save the rendered graph of a page as a standalone SVG
    Capture(CaptureArgs),
    /// Convert a directory of SVGs into numbered fixed-size PNG frames
    Convert(ConvertArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug, Default)]
struct RepoArgs {
    /// Working tree to walk
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Repository owner on the hosting platform
    #[arg(long)]
    owner: Option<String>,

    /// Repository name on the hosting platform
    #[arg(long)]
    name: Option<String>,

    /// Branch to walk
    #[arg(long)]
    branch: Option<String>,

    /// Contributor source: github or git
    #[arg(long)]
    source: Option<String>,
}

#[derive(Args, Debug)]
struct TimelineArgs {
    #[command(flatten)]
    repo: RepoArgs,

    /// Only walk commits from this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    since: Option<String>,

    /// Output HTML file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CaptureArgs {
    /// Page to load
    #[arg(long, default_value = "http://localhost:8000/dep_graph_document.html")]
    url: String,

    /// Element to capture, `#container-id tag`
    #[arg(long, default_value = "#graph svg")]
    selector: String,

    /// Output SVG file
    #[arg(short, long, default_value = "downloaded_image.svg")]
    output: PathBuf,

    /// Chromium-compatible browser binary
    #[arg(long, env = "DEPGRAPH_TIMELINE_BROWSER", default_value = "chromium")]
    browser: String,

    /// Seconds to wait for the element
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Directory containing SVG files
    input_dir: PathBuf,

    /// Directory to save PNG files
    output_dir: PathBuf,

    /// Target width
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Target height
    #[arg(long, default_value_t = 1080)]
    height: u32,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// File (or defaults) < environment < command line
fn load_config(path: Option<&PathBuf>, repo: &RepoArgs) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default()?,
    };
    config.apply_env_overrides();

    if let Some(path) = &repo.repo {
        config.repository.path = path.clone();
    }
    if let Some(owner) = &repo.owner {
        config.repository.owner = owner.clone();
    }
    if let Some(name) = &repo.name {
        config.repository.name = name.clone();
    }
    if let Some(branch) = &repo.branch {
        config.repository.branch = branch.clone();
    }
    if let Some(source) = &repo.source {
        config.contributors.source = source.clone();
    }
    Ok(config)
}

async fn cmd_timeline(config_path: Option<&PathBuf>, args: TimelineArgs) -> Result<()> {
    let mut config = load_config(config_path, &args.repo)?;
    if let Some(since) = args.since {
        config.repository.since = Some(since);
    }
    if let Some(output) = args.output {
        config.timeline.output = output;
    }
    config.validate()?;

    let summary = Pipeline::new(config).run().await?;
    println!(
        "Wrote {} ({} snapshots from {} commits; {} unchanged, {} failed; {} contributors)",
        summary.output.display(),
        summary.snapshots,
        summary.commits,
        summary.unchanged,
        summary.failed,
        summary.contributors
    );
    Ok(())
}

async fn cmd_contributors(config_path: Option<&PathBuf>, args: RepoArgs) -> Result<()> {
    let config = load_config(config_path, &args)?;
    config.validate()?;

    let ledger = Pipeline::new(config).ledger().await?;
    let Some(latest) = ledger.latest() else {
        println!("No commits found");
        return Ok(());
    };

    println!("Latest commit: {}", latest.commit);
    println!("Total contributors: {}", latest.count());
    for identity in latest.contributors {
        match identity {
            ContributorIdentity::Verified(user) => {
                println!("  github_user  {:<24} {}", user.login, user.avatar_url)
            }
            ContributorIdentity::Unverified { name, email } => {
                println!("  git_user     {:<24} <{}>", name, email)
            }
        }
    }
    Ok(())
}

async fn cmd_capture(args: CaptureArgs) -> Result<()> {
    let capture = HeadlessBrowserCapture::new(args.browser)
        .with_timeout(Duration::from_secs(args.timeout));
    let markup = capture.capture(&args.url, &args.selector).await?;

    if let Some(parent) = args.output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.output, markup)
        .with_context(|| format!("write '{}'", args.output.display()))?;
    println!("Saved SVG to {}", args.output.display());
    Ok(())
}

async fn cmd_convert(args: ConvertArgs) -> Result<()> {
    let options = ConvertOptions {
        width: args.width,
        height: args.height,
    };
    let report = tokio::task::spawn_blocking(move || {
        convert_svgs(&args.input_dir, &args.output_dir, options)
    })
    .await
    .context("join conversion task")??;

    println!(
        "Converted {} files ({} failed)",
        report.written.len(),
        report.failed.len()
    );
    Ok(())
}

fn cmd_config(config_path: Option<&PathBuf>) -> Result<()> {
    let config = load_config(config_path, &RepoArgs::default())?;
    print!("{}", config.to_toml()?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_ref();
    match cli.cmd {
        Command::Timeline(args) => cmd_timeline(config_path, args).await,
        Command::Contributors(args) => cmd_contributors(config_path, args).await,
        Command::Capture(args) => cmd_capture(args).await,
        Command::Convert(args) => cmd_convert(args).await,
        Command::Config => cmd_config(config_path),
    }
}
