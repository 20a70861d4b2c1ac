use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;
use weft::{Compositor, SiteConfig, TemplateStore};

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "Static-site compositor with template and slot resolution", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to site.toml (defaults to ./site.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose all pages into the output directory
    Build {
        /// Dry run - compose without writing output files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff against existing output
        #[arg(short, long)]
        diff: bool,
    },

    /// Load and finalize the template library without composing pages
    Check,

    /// List template keys and default slot variables
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build { dry_run, diff } => cmd_build(&config, dry_run, diff),
        Commands::Check => cmd_check(&config),
        Commands::List => cmd_list(&config),
    }
}

/// Load site.toml from the explicit flag or the current directory; absent
/// both, fall back to the conventional layout.
fn resolve_config(flag: Option<&Path>) -> Result<SiteConfig> {
    if let Some(path) = flag {
        return weft::load_from_path(path)
            .with_context(|| format!("loading config {}", path.display()));
    }

    let default = Path::new("site.toml");
    if default.exists() {
        return weft::load_from_path(default).context("loading ./site.toml");
    }

    Ok(SiteConfig::default())
}

/// Discover all .html page sources under the pages directory, sorted for
/// deterministic build order.
fn discover_pages(pages_dir: &Path) -> Result<Vec<PathBuf>> {
    if !pages_dir.is_dir() {
        anyhow::bail!("pages directory not found: {}", pages_dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(pages_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("html")
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    Ok(files)
}

fn cmd_build(config: &SiteConfig, dry_run: bool, show_diff: bool) -> Result<()> {
    let site = &config.site;

    // Template-load failure is fatal; nothing can compose without the store
    let store = TemplateStore::load(&site.templates_dir)
        .with_context(|| format!("loading templates from {}", site.templates_dir.display()))?;
    let compositor = Compositor::new(&store);

    let pages = discover_pages(&site.pages_dir)?;
    if pages.is_empty() {
        println!("{}", "No .html pages found".yellow());
        return Ok(());
    }

    println!("Templates: {}", site.templates_dir.display());
    println!("Pages: {}", site.pages_dir.display());
    println!();

    if dry_run {
        println!("{}", "  [DRY RUN - composing without writing]".cyan());
    }

    let mut total_written = 0;
    let mut total_unchanged = 0;
    let mut total_failed = 0;

    for page in &pages {
        let rel = page.strip_prefix(&site.pages_dir).unwrap_or(page);
        let out_path = site.out_dir.join(rel);

        let source = match fs::read_to_string(page) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("{} {}: read failed - {}", "✗".red(), rel.display(), e);
                total_failed += 1;
                continue;
            }
        };

        // A single page's failure must not abort the batch
        let composed = match compositor.process(&source) {
            Ok(composed) => composed,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), rel.display(), e);
                total_failed += 1;
                continue;
            }
        };

        let previous = fs::read_to_string(&out_path).ok();

        if show_diff {
            let before = previous.as_deref().unwrap_or("");
            if before != composed {
                display_diff(&out_path, before, &composed);
            }
        }

        if previous.as_deref() == Some(composed.as_str()) {
            println!("{} {}: unchanged", "⊙".yellow(), rel.display());
            total_unchanged += 1;
            continue;
        }

        if dry_run {
            println!("{} {}: would write {}", "✓".green(), rel.display(), out_path.display());
            total_written += 1;
            continue;
        }

        match write_atomic(&out_path, &composed) {
            Ok(()) => {
                println!("{} {}: wrote {}", "✓".green(), rel.display(), out_path.display());
                total_written += 1;
            }
            Err(e) => {
                eprintln!("{} {}: write failed - {}", "✗".red(), rel.display(), e);
                total_failed += 1;
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} written", format!("{total_written}").green());
    println!("  {} unchanged", format!("{total_unchanged}").yellow());
    println!("  {} failed", format!("{total_failed}").red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(config: &SiteConfig) -> Result<()> {
    let site = &config.site;
    let store = TemplateStore::load(&site.templates_dir)
        .with_context(|| format!("loading templates from {}", site.templates_dir.display()))?;

    println!(
        "{} {} templates, {} default variables",
        "✓".green(),
        store.len(),
        store.defaults().len()
    );
    Ok(())
}

fn cmd_list(config: &SiteConfig) -> Result<()> {
    let site = &config.site;
    let store = TemplateStore::load(&site.templates_dir)
        .with_context(|| format!("loading templates from {}", site.templates_dir.display()))?;

    println!("{}", "Templates:".bold());
    for template in store.templates() {
        println!("  {} ({} bytes)", template.key(), template.text().len());
    }

    println!("{}", "Default variables:".bold());
    for (name, value) in store.defaults() {
        let preview: String = value.chars().take(40).collect();
        if preview.len() < value.len() {
            println!("  {} = {}…", name, preview);
        } else {
            println!("  {} = {}", name, preview);
        }
    }

    Ok(())
}

/// Atomic output write: tempfile in the target directory, fsync, rename.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Show unified diff between the existing output and the fresh composition.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (existing)", file.display()).dimmed());
    println!("{}", format!("+++ {} (composed)", file.display()).dimmed());

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
