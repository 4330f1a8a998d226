//! # CLI Module
//!
//! Command-line interface for the media arranger.
//!
//! ## Usage
//! ```bash
//! # Copy a camera dump into 2024/Mar/... folders
//! media-arrange organize -i ~/Camera -o ~/Pictures/Sorted
//!
//! # One folder per day, JSON summary
//! media-arrange organize -i ~/Camera -o ~/Pictures/Sorted -l YYYY/MMM/DD --format json
//!
//! # List duplicates, then move them aside
//! media-arrange detect-duplicates -i ~/Pictures
//! media-arrange dd -i ~/Pictures --action move
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_arranger::core::grouping::DuplicateAction;
use media_arranger::core::pipeline::{
    default_workers, CancellationToken, DedupPipeline, DedupReport, OrganizePipeline,
    OrganizeReport,
};
use media_arranger::core::placement::DirectoryLayout;
use media_arranger::core::stats::format_bytes;
use media_arranger::error::Result;
use media_arranger::events::{
    Event, EventChannel, EventReceiver, GroupEvent, PipelineEvent, PlaceEvent, ScanEvent,
};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tracing::warn;

/// Media Arranger - sort photos and videos by date, find exact duplicates
#[derive(Parser, Debug)]
#[command(name = "media-arrange")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy media into a date-based folder tree
    Organize {
        /// Directory to read from (never modified)
        #[arg(short, long)]
        input: PathBuf,

        /// Root of the organized tree
        #[arg(short, long)]
        output: PathBuf,

        /// Folder layout: YYYY/MMM or YYYY/MMM/DD
        #[arg(short, long, default_value = "YYYY/MMM")]
        layout: DirectoryLayout,

        /// Number of copy workers (default: one per core)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Only these extensions, comma separated
        #[arg(long, value_delimiter = ',')]
        extensions: Option<Vec<String>>,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Descend into symlinked directories
        #[arg(long)]
        follow_symlinks: bool,

        /// Maximum directory depth below the input (unlimited by default)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output format
        #[arg(long, default_value = "pretty")]
        format: ReportFormat,
    },

    /// Find files with identical content
    #[command(visible_aliases = ["dd", "detect-duplicate"])]
    DetectDuplicates {
        /// Directory to search
        #[arg(short, long)]
        input: PathBuf,

        /// What to do with duplicates
        #[arg(short, long, default_value = "none")]
        action: Action,

        /// Folder under the input that receives moved duplicates
        #[arg(long, default_value = "Duplicate files")]
        duplicates_dir: PathBuf,

        /// Only these extensions, comma separated
        #[arg(long, value_delimiter = ',')]
        extensions: Option<Vec<String>>,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Descend into symlinked directories
        #[arg(long)]
        follow_symlinks: bool,

        /// Maximum directory depth below the input (unlimited by default)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output format
        #[arg(long, default_value = "pretty")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Action {
    /// Report only (default)
    None,
    /// Move duplicates into the duplicates folder
    Move,
    /// Delete duplicates, keeping the first file of each group
    Delete,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (duplicate paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    media_arranger::init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(error = %e, "Ctrl+C handler not installed");
    }

    match cli.command {
        Commands::Organize {
            input,
            output,
            layout,
            workers,
            extensions,
            include_hidden,
            follow_symlinks,
            max_depth,
            format,
        } => {
            let mut builder = OrganizePipeline::builder()
                .source(input)
                .destination(output)
                .layout(layout)
                .workers(workers.unwrap_or_else(default_workers))
                .include_hidden(include_hidden)
                .follow_symlinks(follow_symlinks)
                .max_depth(max_depth)
                .cancellation(cancel);
            if let Some(extensions) = extensions {
                builder = builder.extensions(extensions);
            }
            run_organize(builder.build()?, format, cli.verbose)
        }
        Commands::DetectDuplicates {
            input,
            action,
            duplicates_dir,
            extensions,
            include_hidden,
            follow_symlinks,
            max_depth,
            format,
        } => {
            let action = match action {
                Action::None => DuplicateAction::None,
                Action::Move => DuplicateAction::Move {
                    destination: input.join(duplicates_dir),
                },
                Action::Delete => DuplicateAction::Delete,
            };
            let mut builder = DedupPipeline::builder()
                .root(input)
                .action(action)
                .include_hidden(include_hidden)
                .follow_symlinks(follow_symlinks)
                .max_depth(max_depth)
                .cancellation(cancel);
            if let Some(extensions) = extensions {
                builder = builder.extensions(extensions);
            }
            run_dedup(builder.build()?, format, cli.verbose)
        }
    }
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("Media Arranger").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb
}

/// Drive a progress bar from run events on a separate thread
fn spawn_progress(receiver: EventReceiver, pb: Option<ProgressBar>, verbose: bool) -> JoinHandle<()> {
    thread::spawn(move || {
        let Some(pb) = pb else {
            // Drain so senders never block
            for _ in receiver.iter() {}
            return;
        };

        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(phase.to_string());
                }
                Event::Scan(ScanEvent::FileFound { .. }) => pb.inc_length(1),
                Event::Scan(ScanEvent::Error { path, message }) => {
                    if verbose {
                        pb.println(format!("  {} {}: {}", style("!").yellow(), path.display(), message));
                    }
                }
                Event::Place(PlaceEvent::Finished(p)) => {
                    pb.set_position(p.completed as u64);
                    if verbose {
                        pb.set_message(
                            p.path
                                .file_name()
                                .unwrap_or_default()
                                .to_string_lossy()
                                .into_owned(),
                        );
                    }
                }
                Event::Group(GroupEvent::Started {
                    candidate_buckets, ..
                }) => {
                    pb.set_position(0);
                    pb.set_length(candidate_buckets as u64);
                }
                Event::Group(GroupEvent::BucketCompared(p)) => {
                    pb.set_position(p.buckets_completed as u64);
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Cancelled)
                | Event::Pipeline(PipelineEvent::Error { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
        pb.finish_and_clear();
    })
}

fn run_organize(pipeline: OrganizePipeline, format: ReportFormat, verbose: bool) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(format, ReportFormat::Pretty);
    if pretty {
        print_header(&term);
    }

    let (sender, receiver) = EventChannel::new();
    let events = spawn_progress(receiver, pretty.then(progress_bar), verbose);

    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    events.join().ok();

    let report = result?;
    match format {
        ReportFormat::Pretty => print_organize_pretty(&term, &report, verbose),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn print_organize_pretty(term: &Term, report: &OrganizeReport, verbose: bool) {
    let heading = if report.cancelled {
        format!("{} Organize cancelled", style("■").yellow().bold())
    } else {
        format!("{} Organize complete", style("✓").green().bold())
    };
    term.write_line(&heading).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} placed, {} renamed, {} already present in {:.1}s",
        style(report.stats.placed).cyan(),
        style(report.stats.renamed).cyan(),
        style(report.stats.duplicates).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line("").ok();
    term.write_line(&report.stats.to_string()).ok();

    if !report.failures.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!(
            "{}",
            style(format!("{} files skipped:", report.failures.len()))
                .red()
                .bold()
        ))
        .ok();
        let shown = if verbose { report.failures.len() } else { 10 };
        for failure in report.failures.iter().take(shown) {
            term.write_line(&format!("  {} {}", style("✗").red(), failure.reason))
                .ok();
        }
        if report.failures.len() > shown {
            term.write_line(&format!(
                "  {}",
                style(format!("... and {} more (use -v)", report.failures.len() - shown)).dim()
            ))
            .ok();
        }
    }

    if report.cancelled {
        term.write_line("").ok();
        term.write_line(&format!(
            "{}",
            style("Files placed so far were kept. Run again with the same output to resume.").dim()
        ))
        .ok();
    }
}

fn run_dedup(pipeline: DedupPipeline, format: OutputFormat, verbose: bool) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(format, OutputFormat::Pretty);
    if pretty {
        print_header(&term);
    }

    let (sender, receiver) = EventChannel::new();
    let events = spawn_progress(receiver, pretty.then(progress_bar), verbose);

    let result = pipeline.run_with_events(&sender);

    drop(sender);
    events.join().ok();

    let report = result?;
    match format {
        OutputFormat::Pretty => print_dedup_pretty(&term, &report, pipeline.action(), verbose),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Minimal => print_dedup_minimal(&report),
    }
    Ok(())
}

fn print_dedup_pretty(term: &Term, report: &DedupReport, action: &DuplicateAction, verbose: bool) {
    term.write_line(&format!("{} Scan Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files scanned in {:.1}s",
        style(report.files_scanned).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicate groups found",
        style(report.groups.len()).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicate files",
        style(report.duplicate_count()).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  {} reclaimable",
        style(format_bytes(report.reclaimable_bytes)).yellow()
    ))
    .ok();
    if !report.errors.is_empty() {
        term.write_line(&format!(
            "  {} files could not be read",
            style(report.errors.len()).red()
        ))
        .ok();
    }
    term.write_line("").ok();

    if report.groups.is_empty() {
        term.write_line(&format!("  {} No duplicates found!", style("✓").green()))
            .ok();
    } else {
        term.write_line(&format!(
            "{}",
            style("Duplicate Groups:").bold().underlined()
        ))
        .ok();
        term.write_line("").ok();

        for (i, group) in report.groups.iter().enumerate() {
            term.write_line(&format!(
                "  {} ({} files, {} each)",
                style(format!("Group {}:", i + 1)).bold(),
                group.len(),
                format_bytes(group.size())
            ))
            .ok();
            for (idx, path) in group.members().iter().enumerate() {
                let marker = if idx == 0 {
                    style("★").green().to_string()
                } else {
                    style("○").dim().to_string()
                };
                term.write_line(&format!("    {} {}", marker, path.display()))
                    .ok();
            }
            term.write_line("").ok();
        }
    }

    if verbose {
        for failure in &report.errors {
            term.write_line(&format!("  {} {}", style("!").yellow(), failure.reason))
                .ok();
        }
    }

    let summary = match action {
        DuplicateAction::None => {
            "Report only: no files were moved or deleted. The starred file of each group is kept by --action move|delete."
                .to_string()
        }
        DuplicateAction::Move { destination } => format!(
            "Moved {} duplicates to {}.",
            report.action.moved.len(),
            destination.display()
        ),
        DuplicateAction::Delete => format!(
            "Deleted {} duplicates, freeing {}.",
            report.action.deleted.len(),
            format_bytes(report.action.bytes_reclaimed)
        ),
    };
    term.write_line(&format!("{}", style(summary).dim())).ok();

    for failure in &report.action.failures {
        term.write_line(&format!(
            "  {} {}: {}",
            style("✗").red(),
            failure.path.display(),
            failure.reason
        ))
        .ok();
    }

    if report.cancelled {
        term.write_line(&format!("{}", style("Run was cancelled before finishing.").yellow()))
            .ok();
    }
}

fn print_dedup_minimal(report: &DedupReport) {
    for group in &report.groups {
        for path in group.duplicates() {
            println!("{}", path.display());
        }
    }
}
