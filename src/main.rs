//! strata - crawl a directory into a size-aggregated hierarchy with content
//! hashes, then inspect or export it.
//!
//! Usage:
//!   strata scan [PATH]                  Crawl and print the hierarchy
//!   strata summary [PATH]               Summary statistics
//!   strata duplicates [PATH]            Duplicate file report
//!   strata export [PATH] -f <FORMAT>    Export to JSON, CSV or HTML
//!   strata --help                       Show help

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use strata_analyze::{DuplicateConfig, DuplicateReport, SummaryAnalyzer, SummaryConfig};
use strata_core::{DirectoryNode, Hierarchy, ScanConfig, normalize_extension};
use strata_export::{HierarchyExport, write_csv, write_json};
use strata_scan::HierarchyBuilder;

#[derive(Parser)]
#[command(
    name = "strata",
    version,
    about = "Directory hierarchy crawler with duplicate detection and exports",
    long_about = "strata walks a directory tree in parallel, records size, timestamps, \
                  permissions, MIME type and a BLAKE3 content hash for every file, \
                  aggregates directory sizes bottom-up and groups identical files.\n\n\
                  Set RUST_LOG (e.g. RUST_LOG=debug) to see what the crawler is doing."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl and print the hierarchy with aggregate sizes
    Scan {
        #[command(flatten)]
        crawl: CrawlArgs,

        /// Directory levels to print
        #[arg(short = 'L', long, default_value = "3")]
        levels: u32,

        /// Number of largest entries to show per directory
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,
    },

    /// Show summary statistics
    Summary {
        #[command(flatten)]
        crawl: CrawlArgs,

        /// Entries per ranked list
        #[arg(short = 'n', long, default_value = "5")]
        top: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Find duplicate files
    Duplicates {
        #[command(flatten)]
        crawl: CrawlArgs,

        /// Minimum file size to report (e.g., "0", "1KB", "1MB")
        #[arg(short, long, default_value = "0")]
        min_size: String,

        /// Maximum number of duplicate groups to show (0 = all)
        #[arg(short = 'n', long, default_value = "20")]
        top: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Export the hierarchy
    Export {
        #[command(flatten)]
        crawl: CrawlArgs,

        /// Export format
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Output file (JSON and CSV default to stdout, HTML to hierarchy.html)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options shared by every subcommand that crawls.
#[derive(Args)]
struct CrawlArgs {
    /// Root directory to crawl
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Only record files with this extension (repeatable: -e txt -e .md)
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Maximum directory depth to expand (0 = only the root's own files)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Worker threads (0 = one per CPU)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,

    /// Do not follow symbolic links
    #[arg(long)]
    no_follow_symlinks: bool,

    /// Skip hidden files and directories
    #[arg(long)]
    skip_hidden: bool,

    /// Show live progress on stderr
    #[arg(short, long)]
    progress: bool,
}

impl CrawlArgs {
    fn config(&self) -> Result<ScanConfig> {
        let mut builder = ScanConfig::builder();
        builder
            .root(self.path.clone())
            .threads(self.threads)
            .follow_symlinks(!self.no_follow_symlinks)
            .include_hidden(!self.skip_hidden);

        if !self.extensions.is_empty() {
            let extensions: BTreeSet<String> =
                self.extensions.iter().map(|e| normalize_extension(e)).collect();
            builder.extensions(extensions);
        }
        if let Some(depth) = self.depth {
            builder.max_depth(depth);
        }

        builder.build().wrap_err("Invalid crawl options")
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
    Html,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan { crawl, levels, top } => run_scan(&crawl, levels, top),
        Command::Summary { crawl, top, format } => run_summary(&crawl, top, format),
        Command::Duplicates {
            crawl,
            min_size,
            top,
            format,
        } => run_duplicates(&crawl, &min_size, top, format),
        Command::Export {
            crawl,
            format,
            output,
        } => run_export(&crawl, format, output),
    }
}

/// Build the hierarchy, optionally reporting progress on stderr.
fn crawl(args: &CrawlArgs) -> Result<Hierarchy> {
    let config = args.config()?;
    debug!(
        root = %config.root.display(),
        extensions = ?config.extensions,
        max_depth = ?config.max_depth,
        threads = config.threads,
        "crawl configuration"
    );
    eprintln!("Scanning {}...", config.root.display());

    let builder = HierarchyBuilder::new();
    let reporter = args.progress.then(|| {
        let mut rx = builder.subscribe();
        thread::spawn(move || {
            loop {
                match rx.blocking_recv() {
                    Ok(progress) => eprint!(
                        "\r {} files, {} directories, {} hashed",
                        progress.files_scanned,
                        progress.dirs_scanned,
                        format_size(progress.bytes_scanned)
                    ),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
            eprintln!();
        })
    });

    let result = builder.build(&config);
    // Closes the progress channel so the reporter exits
    drop(builder);
    if let Some(handle) = reporter {
        let _ = handle.join();
    }

    let hierarchy = result.with_context(|| format!("Failed to crawl {}", config.root.display()))?;
    if hierarchy.has_warnings() {
        eprintln!("{} entries skipped", hierarchy.warnings.len());
    }
    Ok(hierarchy)
}

/// Crawl and print the hierarchy.
fn run_scan(args: &CrawlArgs, levels: u32, top_n: usize) -> Result<()> {
    let hierarchy = crawl(args)?;

    println!();
    println!("{}", "─".repeat(60));
    println!(
        " {} - {}",
        hierarchy.root_path.display(),
        format_size(hierarchy.total_size())
    );
    println!(
        " {} files, {} directories, {} duplicate groups",
        hierarchy.total_files(),
        hierarchy.total_dirs(),
        hierarchy.duplicate_groups().len()
    );
    println!(" Scanned in {:.2}s", hierarchy.scan_duration.as_secs_f64());
    println!("{}", "─".repeat(60));
    println!();

    print_node(
        hierarchy.root(),
        &hierarchy.root_path.display().to_string(),
        0,
        levels,
        top_n,
        hierarchy.total_size(),
    );

    Ok(())
}

/// Print summary statistics.
fn run_summary(args: &CrawlArgs, top_n: usize, format: OutputFormat) -> Result<()> {
    let hierarchy = crawl(args)?;
    let summary = SummaryAnalyzer::with_config(SummaryConfig { top_n }).analyze(&hierarchy);

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Summary Statistics");
            println!("{}", "─".repeat(70));
            println!();
            println!(" Total files:        {}", summary.total_files);
            println!(" Total directories:  {}", summary.total_directories);
            println!(" Total size:         {}", format_size(summary.total_size));
            println!(" Empty directories:  {}", summary.empty_directories.len());
            println!(" Zero-byte files:    {}", summary.zero_byte_files.len());
            println!();

            println!(" Most used extensions:");
            for usage in &summary.most_used_extensions {
                println!(
                    "   {:<12} {:>10} {:>8} files",
                    extension_label(&usage.extension),
                    format_size(usage.bytes),
                    usage.file_count
                );
            }
            println!();

            println!(" Least used extensions:");
            for usage in &summary.least_used_extensions {
                println!(
                    "   {:<12} {:>10} {:>8} files",
                    extension_label(&usage.extension),
                    format_size(usage.bytes),
                    usage.file_count
                );
            }
            println!();

            println!(" Largest files:");
            for entry in &summary.largest_files {
                println!("   {:>10}  {}", format_size(entry.size), entry.path);
            }
            println!();

            println!(" Largest folders:");
            for entry in &summary.largest_folders {
                println!("   {:>10}  {}", format_size(entry.size), entry.path);
            }
            println!();
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

/// Run duplicate detection.
fn run_duplicates(args: &CrawlArgs, min_size: &str, top_n: usize, format: OutputFormat) -> Result<()> {
    let min_bytes = parse_size(min_size)?;
    let hierarchy = crawl(args)?;

    let config = DuplicateConfig {
        min_size: min_bytes,
        max_groups: top_n,
    };
    let report = DuplicateReport::from_hierarchy_with(&hierarchy, &config);

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Duplicate File Report");
            println!("{}", "─".repeat(70));
            println!();

            if report.groups.is_empty() {
                println!(" No duplicate files found.");
            } else {
                println!(
                    " Found {} duplicate groups ({} files)",
                    report.group_count, report.files_with_duplicates
                );
                println!(
                    " Total wasted space: {}",
                    format_size(report.total_wasted_space)
                );
                println!();

                for (i, group) in report.groups.iter().enumerate() {
                    println!(
                        " Group {} ({} files, {} each, {} wasted)",
                        i + 1,
                        group.count(),
                        format_size(group.size),
                        format_size(group.wasted_bytes)
                    );
                    println!("   {}", group.hash);
                    for path in &group.paths {
                        println!("   {path}");
                    }
                    println!();
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Export the hierarchy to a file or stdout.
fn run_export(args: &CrawlArgs, format: ExportFormat, output: Option<PathBuf>) -> Result<()> {
    let hierarchy = crawl(args)?;

    match (format, output) {
        (ExportFormat::Json, Some(path)) => {
            hierarchy.export_to_json(&path)?;
            eprintln!("Exported JSON to {}", path.display());
        }
        (ExportFormat::Json, None) => {
            let mut stdout = io::stdout().lock();
            write_json(&hierarchy, &mut stdout)?;
            writeln!(stdout)?;
        }
        (ExportFormat::Csv, Some(path)) => {
            let rows = hierarchy.export_to_csv(&path)?;
            eprintln!("Exported {rows} rows to {}", path.display());
        }
        (ExportFormat::Csv, None) => {
            write_csv(&hierarchy, io::stdout().lock())?;
        }
        (ExportFormat::Html, output) => {
            let path = output.unwrap_or_else(|| PathBuf::from("hierarchy.html"));
            if path.is_dir() {
                bail!("{} is a directory", path.display());
            }
            hierarchy.visualize_with_html(&path)?;
            eprintln!("Wrote visualization to {}", path.display());
        }
    }

    Ok(())
}

/// One line in the printed tree.
enum Entry<'a> {
    Dir(&'a str, &'a DirectoryNode),
    File(&'a str, u64),
}

impl Entry<'_> {
    fn size(&self) -> u64 {
        match self {
            Entry::Dir(_, node) => node.aggregate_size(),
            Entry::File(_, size) => *size,
        }
    }
}

/// Print a directory and its largest entries.
fn print_node(
    node: &DirectoryNode,
    label: &str,
    depth: u32,
    max_depth: u32,
    top_n: usize,
    root_size: u64,
) {
    print_line(&format!("{label}/"), node.aggregate_size(), depth, true, root_size);

    if depth >= max_depth {
        return;
    }

    let mut entries: Vec<Entry<'_>> = node
        .directories()
        .iter()
        .map(|(name, child)| Entry::Dir(name.as_str(), child))
        .chain(
            node.iter_files()
                .map(|record| Entry::File(record.name.as_str(), record.size_in_bytes)),
        )
        .collect();
    entries.sort_by(|a, b| b.size().cmp(&a.size()));

    let remaining = entries.len().saturating_sub(top_n);
    for entry in entries.into_iter().take(top_n) {
        match entry {
            Entry::Dir(name, child) => print_node(child, name, depth + 1, max_depth, top_n, root_size),
            Entry::File(name, size) => print_line(name, size, depth + 1, false, root_size),
        }
    }

    if remaining > 0 {
        let indent = "  ".repeat((depth + 1) as usize);
        println!("{indent}  ... and {remaining} more");
    }
}

fn print_line(name: &str, size: u64, depth: u32, is_dir: bool, root_size: u64) {
    let indent = "  ".repeat(depth as usize);
    let ratio = if root_size > 0 {
        size as f64 / root_size as f64 * 100.0
    } else {
        0.0
    };

    println!(
        "{}{}{:<40} {:>10} {:>5.1}% {}",
        indent,
        if is_dir { "▼ " } else { "  " },
        truncate(name, 40),
        format_size(size),
        ratio,
        make_bar(ratio / 100.0, 10)
    );
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

fn extension_label(ext: &str) -> &str {
    if ext.is_empty() { "(none)" } else { ext }
}

/// Truncate a string to max length in characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Parse a size string (e.g., "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let digits = s.trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.');
    let unit = &s[digits.len()..];

    let multiplier: u64 = match unit {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        other => bail!("Unknown size unit {other:?}"),
    };

    let num: f64 = digits
        .parse()
        .with_context(|| format!("Invalid size {s:?}"))?;
    Ok((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("0").unwrap(), 0);
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("1kb").unwrap(), 1024);
        assert_eq!(parse_size("1.5M").unwrap(), 1536 * 1024);
        assert_eq!(parse_size("2GB").unwrap(), 2 * 1024 * 1024 * 1024);
        assert!(parse_size("12XB").is_err());
        assert!(parse_size("KB").is_err());
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 3), "éé…");
    }

    #[test]
    fn test_cli_parses_crawl_flags() {
        let cli = Cli::try_parse_from([
            "strata", "export", "/data", "-e", "TXT", "-e", ".md", "--depth", "2", "-f", "csv",
        ])
        .unwrap();

        let Command::Export { crawl, format, output } = cli.command else {
            panic!("expected export");
        };
        assert!(matches!(format, ExportFormat::Csv));
        assert!(output.is_none());

        let config = crawl.config().unwrap();
        assert_eq!(config.root, PathBuf::from("/data"));
        assert_eq!(config.max_depth, Some(2));
        assert_eq!(
            config.extensions,
            Some(BTreeSet::from([".md".to_string(), ".txt".to_string()]))
        );
        assert!(config.follow_symlinks);
    }
}
