//! Extract target-journal records from Crossref metadata archives.
//!
//! Walks a directory of `*.json.gz` dump files, decodes each archive's
//! `items` array one record at a time, keeps records whose first
//! `container-title` is an enabled target journal, and routes them to a sink.
//!
//! # Pipeline
//!
//! ```text
//! [*.json.gz] → [Decoder] → [Predicate] → [Sink: stdout | files | sqlite]
//!                                ↑
//!             builtin list, text file, journals table or all
//! ```
//!
//! # Usage
//!
//! ```bash
//! # JSON lines on stdout
//! crossref-extract --dir ./crossref-dump > matches.jsonl
//!
//! # One metadata.json per article
//! crossref-extract --dir ./crossref-dump --sink files --output ./articles
//!
//! # SQLite, targets from the journals table, one transaction per archive
//! crossref-journals --db ./data/crossref.db seed
//! crossref-extract --dir ./crossref-dump --sink sqlite --db ./data/crossref.db \
//!     --targets db --transaction --metrics-port 9091
//!
//! # Load everything and record every publication seen (disabled)
//! crossref-extract --dir ./crossref-dump --sink sqlite --targets all --track-publications
//! ```
//!
//! Logs go to stderr; stdout carries only records (console sink).

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use crossref_core::{AnyPublication, TargetLookup, TargetSet};
use crossref_core::metrics::{init_metrics, set_gauge};
use crossref_extract::pipeline::{DEFAULT_SUFFIX, WalkReport};
use crossref_extract::{
    ConsoleSink, FileTreeConfig, FileTreeSink, Runner, Sink, SqliteSink, SqliteSinkConfig,
    Walker, WalkerConfig, catalog,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    /// Compact JSON lines on stdout
    Console,
    /// <output>/<publication>/<doi>/metadata.json
    Files,
    /// Rows in the SQLite articles table
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TargetSource {
    /// Compiled-in list of genetics journals
    Builtin,
    /// Enabled rows of the journals table in --db
    Db,
    /// One journal per line in --targets-file
    File,
    /// Every record that has a container-title
    All,
}

/// Extract target-journal records from Crossref metadata archives.
#[derive(Parser, Debug)]
#[command(name = "crossref-extract")]
#[command(about = "Stream Crossref dump archives and keep records from target journals")]
struct Args {
    /// Root directory to scan (or a single archive file)
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Where matched records go
    #[arg(long, value_enum, default_value = "console")]
    sink: SinkKind,

    /// Output root for the files sink
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// SQLite database for the sqlite sink and the journals table
    #[arg(long, default_value = "./data/crossref.db")]
    db: PathBuf,

    /// Where the target journal list comes from
    #[arg(long, value_enum, default_value = "builtin")]
    targets: TargetSource,

    /// Journal list for --targets file ('#' comments allowed)
    #[arg(long)]
    targets_file: Option<PathBuf>,

    /// Archive file name suffix
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    suffix: String,

    /// Limit number of archives to process (for testing)
    #[arg(long)]
    limit: Option<usize>,

    /// Process archives in file-name order
    #[arg(long, default_value = "false")]
    sorted: bool,

    /// Wrap each archive in one SQLite transaction (all records or none)
    #[arg(long, default_value = "false")]
    transaction: bool,

    /// Record unseen publication names in the journals table (disabled; needs --targets all)
    #[arg(long, default_value = "false")]
    track_publications: bool,

    /// Log progress every N written records
    #[arg(long, default_value = "1000")]
    progress_interval: u64,

    /// Metrics HTTP server port (0 to disable)
    #[arg(long, default_value = "0")]
    metrics_port: u16,
}

impl Args {
    fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            root: self.dir.clone(),
            suffix: self.suffix.clone(),
            limit: self.limit,
            sorted: self.sorted,
        }
    }

    fn sqlite_config(&self) -> SqliteSinkConfig {
        SqliteSinkConfig {
            db_path: self.db.clone(),
            per_archive_transaction: self.transaction,
            track_publications: self.track_publications,
            progress_interval: self.progress_interval,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.suffix.is_empty() {
            bail!("--suffix must not be empty");
        }
        if self.targets == TargetSource::File && self.targets_file.is_none() {
            bail!("--targets file requires --targets-file");
        }
        if self.sink != SinkKind::Sqlite && (self.transaction || self.track_publications) {
            bail!("--transaction and --track-publications require --sink sqlite");
        }
        // Under a curated target set every accepted name is already known
        if self.track_publications && self.targets != TargetSource::All {
            bail!("--track-publications requires --targets all");
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    // Logs on stderr so the console sink owns stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    args.validate()?;

    if args.metrics_port > 0 {
        init_metrics(args.metrics_port).context("Failed to start metrics exporter")?;
    }
    set_gauge("extract_running", 1.0);

    let start = Instant::now();
    let result = process(&args);
    set_gauge("extract_running", 0.0);

    let report = result?;
    print_summary(&args, &report, start.elapsed());
    Ok(())
}

fn load_targets(args: &Args) -> Result<Box<dyn TargetLookup>> {
    let targets = match args.targets {
        TargetSource::All => {
            info!("Targeting every publication (no journal filter)");
            return Ok(Box::new(AnyPublication));
        }
        TargetSource::Builtin => TargetSet::builtin(),
        TargetSource::Db => {
            let conn = catalog::open_database(&args.db)
                .with_context(|| format!("Failed to open {}", args.db.display()))?;
            catalog::load_targets(&conn).context("Failed to load journals table")?
        }
        TargetSource::File => {
            let path = args
                .targets_file
                .as_ref()
                .context("--targets file requires --targets-file")?;
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            TargetSet::from_reader(BufReader::new(file))
                .with_context(|| format!("Invalid target list {}", path.display()))?
        }
    };

    if targets.enabled_count() == 0 {
        bail!(
            "No enabled target journals (try `crossref-journals --db {} seed`)",
            args.db.display()
        );
    }
    info!(
        "Targeting {} journals: {}",
        targets.enabled_count(),
        targets.enabled_names().join(", ")
    );
    Ok(Box::new(targets))
}

fn build_sink(args: &Args) -> Result<Box<dyn Sink>> {
    let sink: Box<dyn Sink> = match args.sink {
        SinkKind::Console => Box::new(ConsoleSink::stdout()),
        SinkKind::Files => Box::new(FileTreeSink::new(FileTreeConfig {
            output_root: args.output.clone(),
            progress_interval: args.progress_interval,
        })),
        SinkKind::Sqlite => Box::new(
            SqliteSink::connect(args.sqlite_config())
                .with_context(|| format!("Failed to open {}", args.db.display()))?,
        ),
    };
    Ok(sink)
}

fn process(args: &Args) -> Result<WalkReport> {
    let targets = load_targets(args)?;
    let mut sink = build_sink(args)?;

    info!(
        "Scanning {} for *{} archives ({} sink)",
        args.dir.display(),
        args.suffix,
        sink.name()
    );

    let walker = Walker::new(args.walker_config());
    let mut runner = Runner::new(targets.as_ref(), sink.as_mut());
    let report = walker.run(&mut runner)?;
    Ok(report)
}

fn print_summary(args: &Args, report: &WalkReport, elapsed: Duration) {
    eprintln!("\n══════════════════════════════════════════════════════════════════");
    eprintln!("SUMMARY");
    eprintln!("══════════════════════════════════════════════════════════════════\n");

    eprintln!("Root:        {}", args.dir.display());
    match args.sink {
        SinkKind::Console => eprintln!("Sink:        stdout"),
        SinkKind::Files => eprintln!("Sink:        files → {}", args.output.display()),
        SinkKind::Sqlite => eprintln!("Sink:        sqlite → {}", args.db.display()),
    }
    eprintln!();
    eprintln!("Archives:          {:>12}", report.archives_seen);
    eprintln!("  - done:          {:>12}", report.archives_done);
    eprintln!("  - aborted:       {:>12}", report.archives_aborted);
    eprintln!("  - failed:        {:>12}", report.archives_failed);
    eprintln!("Records decoded:   {:>12}", report.counts.attempted);
    eprintln!("Records matched:   {:>12}", report.counts.matched);
    eprintln!("Records written:   {:>12}", report.counts.written);
    eprintln!("Records skipped:   {:>12}", report.counts.skipped);
    eprintln!();

    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        report.counts.attempted as f64 / secs
    } else {
        0.0
    };
    eprintln!("Elapsed:           {:>12.1}s", secs);
    eprintln!("Throughput:        {:>12.0} records/s", rate);
}
