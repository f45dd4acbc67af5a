//! pagesuite CLI - run embedded-harness HTML test pages in a browser
//!
//! Usage:
//!   pagesuite init [--base-url URL]   Write a starter pagesuite.toml
//!   pagesuite list [--profile NAME]   Show profiles or a profile's targets
//!   pagesuite run [--profile NAME]    Run a profile's pages

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pagesuite_browser::{BrowserConfig, BrowserSession, PageSuiteRunner};
use pagesuite_core::{RunSummary, SessionBackend, SuiteConfig, Verdict, DEFAULT_CONFIG_FILE};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "pagesuite")]
#[command(author, version, about = "Run embedded-harness HTML test pages in a browser")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "PAGESUITE_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration listing the kemia test pages
    Init {
        /// Base URL or directory the pages live under
        #[arg(long)]
        base_url: Option<String>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show profiles, or the resolved targets of one profile
    List {
        /// Profile to expand
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Run a profile's pages against one browser session
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Profile to run (defaults to the configured default profile)
    #[arg(short, long)]
    profile: Option<String>,

    /// Only run these targets (repeatable)
    #[arg(long = "only", value_name = "TARGET")]
    only: Vec<String>,

    /// Override the configured base URL or directory
    #[arg(long, env = "PAGESUITE_BASE_URL")]
    base_url: Option<String>,

    /// Stop at the first target that errors
    #[arg(long)]
    fail_fast: bool,

    /// Write a JUnit XML report
    #[arg(long, value_name = "FILE")]
    junit: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { base_url, force } => cmd_init(&cli.config, base_url, force),
        Commands::List { profile } => cmd_list(&cli.config, profile),
        Commands::Run(args) => {
            let code = cmd_run(&cli.config, args).await?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
    }
}

fn cmd_init(path: &Path, base_url: Option<String>, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let config = SuiteConfig::starter(base_url.as_deref());
    config
        .write(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote {}", path.display());
    println!("  {} targets", config.targets.len());
    println!("  profiles: {}", config.profile_names().join(", "));
    if config.base_url.is_none() {
        println!("\nSet base_url (or pass --base-url / PAGESUITE_BASE_URL) to the kemia checkout");
    }
    println!("\nNext steps:");
    println!("  1. Review {} as needed", path.display());
    println!("  2. Run 'pagesuite run' to execute the default profile");

    Ok(())
}

fn cmd_list(path: &Path, profile: Option<String>) -> Result<()> {
    let config = load_config(path)?;

    let Some(profile) = profile else {
        let default = config.default_profile_name();
        println!("Profiles:");
        for name in config.profile_names() {
            let profile = config.profile(&name)?;
            let count = if profile.targets.is_empty() {
                config.targets.len()
            } else {
                profile.targets.len()
            };
            println!(
                "  {}{} - {} ({} targets)",
                name,
                if name == default { " (default)" } else { "" },
                describe_backend(&profile.backend),
                count
            );
        }
        return Ok(());
    };

    let plan = config.plan(&profile, &[])?;
    println!("Profile {} ({}):", plan.profile, describe_backend(&plan.backend));
    for target in &plan.targets {
        println!(
            "  {} - {} [{}ms]",
            target.name(),
            target.url(),
            target.timeout().as_millis()
        );
    }

    Ok(())
}

async fn cmd_run(path: &Path, args: RunArgs) -> Result<i32> {
    let mut config = load_config(path)?;
    if let Some(base_url) = args.base_url {
        config.base_url = Some(base_url);
    }

    let profile = args
        .profile
        .unwrap_or_else(|| config.default_profile_name());
    let mut plan = config.plan(&profile, &args.only)?;
    if args.fail_fast {
        plan.policy.continue_on_error = false;
    }

    info!(
        "Running profile {} ({} targets, {})",
        plan.profile,
        plan.targets.len(),
        describe_backend(&plan.backend)
    );

    let summary = match BrowserSession::start(BrowserConfig::from(&plan)).await {
        Ok(session) => {
            let runner = PageSuiteRunner::new(session, config.harness.clone());
            let summary = runner
                .run_all(&plan.profile, &plan.targets, plan.policy)
                .await;
            if let Err(e) = runner.into_session().close().await {
                warn!("{}", e);
            }
            summary
        }
        Err(e) => {
            error!("{}", e);
            RunSummary::session_unavailable(&plan.profile, &plan.targets, &e)
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if let Some(junit) = args.junit {
        summary
            .write_junit(&junit)
            .with_context(|| format!("Failed to write {}", junit.display()))?;
        println!("Wrote JUnit report to {}", junit.display());
    }

    Ok(summary.exit_code())
}

fn load_config(path: &Path) -> Result<SuiteConfig> {
    SuiteConfig::load(path).with_context(|| {
        format!(
            "Failed to load {} (run 'pagesuite init' to create one)",
            path.display()
        )
    })
}

fn describe_backend(backend: &SessionBackend) -> String {
    match backend {
        SessionBackend::Launch { headless: true, .. } => "launch, headless".to_string(),
        SessionBackend::Launch { headless: false, .. } => "launch, windowed".to_string(),
        SessionBackend::Connect { ws_url } => format!("connect to {}", ws_url),
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    for result in &summary.results {
        println!(
            "{:>5}  {} ({:.2}s)",
            result.verdict.label(),
            result.name,
            result.duration_ms as f64 / 1000.0
        );
        match &result.verdict {
            Verdict::Passed => {}
            Verdict::Failed { report } => {
                for line in report.lines() {
                    println!("       {}", line);
                }
            }
            Verdict::Errored { message, .. } => println!("       {}", message),
            Verdict::Skipped { reason } => println!("       {}", reason),
        }
    }
    println!("\n{}", summary.summary());
}
