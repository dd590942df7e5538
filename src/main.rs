use clap::{ArgAction, Parser};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use dictpress_malayalam::emit::{CsvSink, OutputFormat, SfmSink};
use dictpress_malayalam::parallel::ParallelConfig;
use dictpress_malayalam::pipeline::{self, RunOptions, Stats};
use dictpress_malayalam::sources::{
    self, BaileySource, DictionarySource, Document, GundertSource, SourceKind, StvSource,
};
use dictpress_malayalam::vocab::{init_vocabulary, Vocabulary};
use dictpress_malayalam::Result;

#[derive(Parser)]
#[command(name = "dictpress-malayalam")]
#[command(about = "Convert historical Malayalam dictionaries to dictpress import CSV or SFM")]
struct Args {
    /// Dictionary edition of the inputs
    #[arg(value_enum)]
    source: SourceKind,

    /// Output file (.csv or .sfm)
    output: PathBuf,

    /// Input files (.xml, .txt, optionally .bz2); DTDs are skipped
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output format; defaults to sfm for a .sfm output path, csv otherwise
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Vocabulary YAML replacing the embedded tables
    #[arg(long)]
    vocab: Option<PathBuf>,

    /// First Gundert scan page holding dictionary entries
    #[arg(long, default_value_t = sources::gundert::DEFAULT_FIRST_PAGE)]
    first_page: u32,

    /// Read Bailey text as is, without OCR repairs
    #[arg(long)]
    no_repair: bool,

    /// Number of extraction threads (0 = auto-detect)
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Limit number of entries to convert (for testing)
    #[arg(long)]
    limit: Option<usize>,

    /// Write the column header row (CSV only)
    #[arg(long)]
    header: bool,

    /// Write skipped entry candidates to this TSV file
    #[arg(long)]
    skipped_report: Option<PathBuf>,

    /// Quiet mode - no progress or summary
    #[arg(short, long)]
    quiet: bool,

    /// More log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn output_format(args: &Args) -> OutputFormat {
    args.format.unwrap_or_else(|| {
        match args.output.extension().and_then(|ext| ext.to_str()) {
            Some("sfm") => OutputFormat::Sfm,
            _ => OutputFormat::Csv,
        }
    })
}

fn convert<S: DictionarySource>(
    source: &S,
    documents: &[Document],
    vocab: &Vocabulary,
    args: &Args,
) -> Result<Stats> {
    let options = RunOptions {
        limit: args.limit,
        parallel: ParallelConfig::with_threads(args.threads),
        progress: !args.quiet,
    };
    let profile = source.profile();
    let file = File::create(&args.output)?;
    let out = BufWriter::with_capacity(256 * 1024, file);

    match output_format(args) {
        OutputFormat::Csv => {
            let mut sink = CsvSink::new(out, profile, vocab, args.header)?;
            let stats = pipeline::run(source, documents, vocab, &mut sink, &options)?;
            sink.into_inner()?.flush()?;
            Ok(stats)
        }
        OutputFormat::Sfm => {
            let mut sink = SfmSink::new(out, profile);
            let stats = pipeline::run(source, documents, vocab, &mut sink, &options)?;
            sink.into_inner().flush()?;
            Ok(stats)
        }
    }
}

fn write_report(path: &Path, stats: &Stats) -> Result<()> {
    let file = File::create(path)?;
    pipeline::write_skipped_report(BufWriter::new(file), &stats.skipped_entries)
}

fn run(args: &Args) -> Result<()> {
    let vocab = init_vocabulary(args.vocab.as_deref())?;

    let documents = sources::input_paths(&args.inputs)
        .iter()
        .map(|path| sources::read_document(path))
        .collect::<Result<Vec<_>>>()?;

    if !args.quiet {
        println!("Source: {}", args.source.profile().label);
        println!("Inputs: {}", documents.len());
        println!("Output: {} ({:?})", args.output.display(), output_format(args));
        if let Some(limit) = args.limit {
            println!("Limit: {} entries", limit);
        }
        println!();
    }

    let stats = match args.source {
        SourceKind::Gundert => convert(&GundertSource::new(args.first_page), &documents, vocab, args)?,
        SourceKind::Bailey => convert(
            &BaileySource {
                repair: !args.no_repair,
            },
            &documents,
            vocab,
            args,
        )?,
        SourceKind::Stv => convert(&StvSource, &documents, vocab, args)?,
    };

    if let Some(path) = &args.skipped_report {
        write_report(path, &stats)?;
    }
    if !args.quiet {
        pipeline::print_stats(&stats, args.source.profile().label);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
