use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lss::rules::default_rules;
use lss::{scan_repository, ScanConfig};

/// Project-local defaults, analogous in spirit to the teacher's
/// `~/.config/lss/config.toml` lookup but rooted at the scanned repository
/// instead of the user's home directory (`<repo_path>/lss.toml`). CLI
/// flags always take precedence over anything set here.
#[derive(Debug, Default, Deserialize)]
struct ProjectConfig {
    max_file_size: Option<u64>,
    entropy_threshold: Option<f64>,
    scan_history: Option<bool>,
    history_commit_limit: Option<usize>,
}

fn load_project_config(repo_path: &std::path::Path) -> ProjectConfig {
    let path = repo_path.join("lss.toml");
    if !path.exists() {
        return ProjectConfig::default();
    }
    match fs::read_to_string(&path).ok().and_then(|s| toml::from_str(&s).ok()) {
        Some(cfg) => cfg,
        None => {
            tracing::warn!(path = %path.display(), "could not parse lss.toml, using defaults");
            ProjectConfig::default()
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum RulesCmd {
    /// List the active rules, optionally filtered by a name substring
    List {
        query: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Scan a path for secrets, connection strings, PII, and document metadata
    Scan {
        /// Path to scan
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Output format: human or json
        #[arg(short, long, default_value = "human")]
        format: String,

        /// Also scan git history (every commit reachable from any ref)
        #[arg(long)]
        scan_history: bool,

        /// Cap on the number of historical commits examined
        #[arg(long)]
        history_limit: Option<usize>,

        /// Per-blob byte ceiling
        #[arg(long)]
        max_file_size: Option<u64>,

        /// Override the minimum entropy (bits/byte) for high-entropy findings
        #[arg(long)]
        entropy_threshold: Option<f64>,

        /// Disable the entropy matcher
        #[arg(long)]
        no_entropy: bool,

        /// Disable the literal-pattern matcher
        #[arg(long)]
        no_patterns: bool,

        /// Load rules from this JSON file instead of `<path>/rules.json` or the defaults
        #[arg(long)]
        rules_file: Option<PathBuf>,
    },

    /// Rule-store introspection
    Rules {
        #[command(subcommand)]
        cmd: RulesCmd,
    },
}

#[derive(clap::Parser, Debug)]
#[command(name = "lss", about = "Scan a repository for secrets and sensitive data")]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "lss=info",
        1 => "lss=debug",
        _ => "lss=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = cli.command.unwrap_or(Command::Scan {
        path: PathBuf::from("."),
        format: "human".to_string(),
        scan_history: false,
        history_limit: None,
        max_file_size: None,
        entropy_threshold: None,
        no_entropy: false,
        no_patterns: false,
        rules_file: None,
    });

    match command {
        Command::Rules { cmd } => run_rules(cmd),
        Command::Scan {
            path,
            format,
            scan_history,
            history_limit,
            max_file_size,
            entropy_threshold,
            no_entropy,
            no_patterns,
            rules_file,
        } => run_scan(
            path,
            format,
            scan_history,
            history_limit,
            max_file_size,
            entropy_threshold,
            no_entropy,
            no_patterns,
            rules_file,
        ),
    }
}

fn run_rules(cmd: RulesCmd) -> Result<()> {
    match cmd {
        RulesCmd::List { query, json } => {
            let mut rules = default_rules();
            if let Some(q) = &query {
                rules.retain(|r| r.name.contains(q.as_str()));
            }
            if json {
                let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else {
                for rule in &rules {
                    println!("{} :: {}", rule.name, rule.regex.as_str());
                }
                println!("{} rules", rules.len());
            }
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_scan(
    path: PathBuf,
    format: String,
    scan_history_flag: bool,
    history_limit: Option<usize>,
    max_file_size: Option<u64>,
    entropy_threshold: Option<f64>,
    no_entropy: bool,
    no_patterns: bool,
    rules_file: Option<PathBuf>,
) -> Result<()> {
    let repo_path = path
        .canonicalize()
        .with_context(|| format!("could not resolve path: {}", path.display()))?;

    let project_cfg = load_project_config(&repo_path);

    let cfg = ScanConfig {
        repo_path: repo_path.clone(),
        max_file_size: max_file_size
            .or(project_cfg.max_file_size)
            .unwrap_or(1_000_000),
        scan_history: scan_history_flag || project_cfg.scan_history.unwrap_or(false),
        history_commit_limit: history_limit.or(project_cfg.history_commit_limit),
        entropy_threshold: entropy_threshold
            .or(project_cfg.entropy_threshold)
            .unwrap_or(4.2),
        include_entropy: !no_entropy,
        include_patterns: !no_patterns,
        rules_config_path: rules_file,
    };

    info!(path = %repo_path.display(), "starting scan");
    let result = scan_repository(&cfg)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for f in &result.findings {
            println!(
                "[{:>8}] {} :: {} ({}) {}",
                format!("{:?}", f.severity).to_lowercase(),
                f.path,
                f.kind,
                f.source,
                f.excerpt
            );
        }
        println!("\n{} findings", result.findings.len());
    }

    Ok(())
}
