use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use ironcode_edit::config::{self, ToolConfig, CONFIG_FILE_NAME};
use ironcode_edit::matcher::{locate, MatchOutcome};
use ironcode_edit::tool::{
    AllowAll, DiffSummary, EditParams, EditTool, PermissionDenied, PermissionGate,
    PermissionRequest, ToolContext,
};
use ironcode_edit::{replace, WorkspaceGuard};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "IRONCODE_EDIT_LOG";

#[derive(Parser)]
#[command(name = "ironcode-edit")]
#[command(about = "Locate and replace text in files despite formatting drift", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace oldString with newString in a file
    Replace {
        #[command(flatten)]
        target: Target,

        /// Replacement text
        #[arg(long, conflicts_with = "new_file")]
        new: Option<String>,

        /// Read the replacement text from a file
        #[arg(long)]
        new_file: Option<PathBuf>,

        /// Replace every occurrence instead of requiring a unique match
        #[arg(short = 'a', long)]
        replace_all: bool,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Apply without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show where oldString matches and which strategy found it
    Locate {
        #[command(flatten)]
        target: Target,

        /// Print matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate the config file and print the effective settings
    Check {
        #[command(flatten)]
        location: Location,
    },
}

#[derive(Args)]
struct Location {
    /// Path to workspace root (defaults to the config's root, then the current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Config file (defaults to ironcode-edit.toml in the workspace)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct Target {
    #[command(flatten)]
    location: Location,

    /// File to edit, relative to the workspace root or absolute
    #[arg(short, long)]
    file: PathBuf,

    /// Text to find
    #[arg(long, conflicts_with = "old_file", required_unless_present = "old_file")]
    old: Option<String>,

    /// Read the text to find from a file
    #[arg(long)]
    old_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replace {
            target,
            new,
            new_file,
            replace_all,
            dry_run,
            diff,
            yes,
        } => {
            let new = read_text(new, new_file.as_deref(), "--new")?;
            cmd_replace(target, new, replace_all, dry_run, diff, yes).await
        }

        Commands::Locate { target, json } => cmd_locate(target, json),

        Commands::Config {
            action: ConfigAction::Check { location },
        } => cmd_config_check(location),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new("ironcode_edit=warn"))
        .unwrap_or_default();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

/// Helper: Load config and decide the workspace root.
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. `[workspace] root` from the config file
/// 3. Current directory
fn resolve(location: &Location) -> Result<(ToolConfig, PathBuf)> {
    let cwd = env::current_dir().context("Could not determine current directory")?;
    let search_dir = location.workspace.clone().unwrap_or_else(|| cwd.clone());

    let config = match &location.config {
        Some(path) => config::load_from_path(path)?,
        None => config::load_or_default(&search_dir)?,
    };

    let workspace = location
        .workspace
        .clone()
        .or_else(|| config.workspace.root.clone())
        .unwrap_or(cwd);
    Ok((config, workspace))
}

fn read_text(inline: Option<String>, file: Option<&Path>, flag: &str) -> Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        (None, None) => anyhow::bail!("{flag} or {flag}-file is required"),
    }
}

async fn cmd_replace(
    target: Target,
    new: String,
    replace_all: bool,
    dry_run: bool,
    show_diff: bool,
    yes: bool,
) -> Result<()> {
    let (config, workspace) = resolve(&target.location)?;
    let old = read_text(target.old, target.old_file.as_deref(), "--old")?;

    if dry_run {
        let guard = WorkspaceGuard::with_forbidden(&workspace, config.workspace.forbidden.clone())?;
        let path = guard.validate_path(&target.file)?;
        let original = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let result = replace(&original, &old, &new, replace_all)?;

        println!("{}", "[DRY RUN - showing what would be applied]".cyan());
        println!(
            "{} {}: {} occurrence(s) via {}",
            "⊙".yellow(),
            guard.relative(&path).display(),
            result.replacements,
            result.strategy
        );
        if show_diff {
            display_diff(guard.relative(&path), &original, &result.content);
        }
        return Ok(());
    }

    let tool = EditTool::from_config(&config, &workspace)?;
    let gate: Arc<dyn PermissionGate> = if yes {
        Arc::new(AllowAll)
    } else {
        Arc::new(TerminalGate)
    };
    let ctx = ToolContext::new("cli", "cli", gate);

    let params = EditParams {
        file_path: target.file,
        old_string: old,
        new_string: new,
        replace_all,
    };
    let output = tool.execute(params, &ctx).await?;

    println!("{} {}: {}", "✓".green(), output.title, output.output);
    if show_diff {
        print_colored_unified(&output.metadata.diff);
    }
    println!(
        "  {} {}",
        format!("+{}", output.metadata.additions).green(),
        format!("-{}", output.metadata.deletions).red()
    );
    Ok(())
}

fn cmd_locate(target: Target, json: bool) -> Result<()> {
    let (config, workspace) = resolve(&target.location)?;
    let old = read_text(target.old, target.old_file.as_deref(), "--old")?;

    let guard = WorkspaceGuard::with_forbidden(&workspace, config.workspace.forbidden)?;
    let path = guard.validate_path(&target.file)?;
    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    let outcome = locate(&content, &old);
    if json {
        println!("{}", serde_json::to_string_pretty(outcome.spans())?);
        return Ok(());
    }

    let Some(strategy) = outcome.strategy() else {
        println!("{} {}", "✗".red(), "No match".red().bold());
        return Ok(());
    };

    let label = match outcome {
        MatchOutcome::SingleMatch(_) => "UNIQUE".green().bold(),
        _ => "AMBIGUOUS".yellow().bold(),
    };
    println!("{} via {} ({} match(es))", label, strategy, outcome.count());
    for span in outcome.spans() {
        let line = content[..span.start].matches('\n').count() + 1;
        let last = line + content[span.range()].trim_end_matches('\n').matches('\n').count();
        println!(
            "  {}:{}-{} {}",
            guard.relative(&path).display(),
            line,
            last,
            format!("[{}..{})", span.start, span.end).dimmed()
        );
    }
    Ok(())
}

fn cmd_config_check(location: Location) -> Result<()> {
    let (config, workspace) = resolve(&location)?;

    let source = match &location.config {
        Some(path) => path.display().to_string(),
        None => {
            let candidate = location
                .workspace
                .clone()
                .unwrap_or_else(|| workspace.clone())
                .join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                candidate.display().to_string()
            } else {
                "(defaults)".to_string()
            }
        }
    };

    println!("{} config OK: {}", "✓".green(), source);
    println!("  workspace:      {}", workspace.display());
    println!("  max_concurrent: {}", config.limits.max_concurrent);
    println!("  diff_context:   {}", config.output.diff_context);
    if config.workspace.forbidden.is_empty() {
        println!("  forbidden:      {}", "(none)".dimmed());
    }
    for path in &config.workspace.forbidden {
        println!("  forbidden:      {}", path.display());
    }
    Ok(())
}

/// Asks on the terminal before every edit.
struct TerminalGate;

#[async_trait]
impl PermissionGate for TerminalGate {
    async fn ask(&self, request: PermissionRequest) -> Result<(), PermissionDenied> {
        let prompt = format!("Apply edit to {}? [y/N] ", request.patterns.join(", "));
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stderr = io::stderr();
            write!(stderr, "{prompt}")?;
            stderr.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) if matches!(line.trim(), "y" | "Y" | "yes") => Ok(()),
            Ok(Ok(_)) => Err(PermissionDenied::new(request.permission, "declined by user")),
            Ok(Err(err)) => Err(PermissionDenied::new(request.permission, err.to_string())),
            Err(err) => Err(PermissionDenied::new(request.permission, err.to_string())),
        }
    }
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn print_colored_unified(diff: &str) {
    for line in diff.lines() {
        let line = if line.starts_with("+++") || line.starts_with("---") {
            line.dimmed()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else if line.starts_with("@@") {
            line.cyan()
        } else {
            line.normal()
        };
        println!("{}", line);
    }
}
