use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use cwindex::corpus::{
    read_docs, read_docs_limited, read_docs_packed, read_idf_file, read_query_tokens,
};
use cwindex::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Compressed-window min-hash index builder and query tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a binary document stream
    Build(BuildArgs),
    /// Query an index with a token sequence
    Query(QueryArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Binary document data file
    #[arg(short = 'f', long)]
    file: PathBuf,

    /// Number of hash functions
    #[arg(short = 'k', long, default_value_t = 64)]
    hashes: usize,

    /// Output index file (not saved when omitted)
    #[arg(short = 'i', long)]
    index: Option<PathBuf>,

    /// Limit the number of documents (0 = all)
    #[arg(short = 'n', long, default_value_t = 0)]
    doc_limit: usize,

    /// Re-chunk the stream into documents of exactly this many tokens
    /// (0 = keep record boundaries; requires a document limit)
    #[arg(short = 'l', long, default_value_t = 0)]
    len_limit: usize,

    /// TF weighting: raw, log, boolean, augmented, square
    #[arg(short = 't', long, default_value = "raw")]
    tf: String,

    /// Builder: monotonic, allalign, single
    #[arg(short = 'B', long, default_value = "monotonic")]
    builder: String,

    /// Monotonic active-key optimization (0 or 1)
    #[arg(short = 'a', long, default_value_t = 1)]
    active: u8,

    /// Monotonic search backend: binary or linear
    #[arg(short = 's', long, default_value = "binary")]
    strategy: String,

    /// Run the quadratic coverage validation after building (debug)
    #[arg(short = 'V', long)]
    validate: bool,

    /// Load IDF weights from a file
    #[arg(short = 'I', long)]
    idf: Option<PathBuf>,

    /// Derive IDF weights from the corpus instead
    #[arg(long, conflicts_with = "idf")]
    idf_corpus: bool,

    /// Vocabulary size
    #[arg(short = 'v', long, default_value_t = 50_257)]
    vocab: usize,

    /// Hash seed stored in the index
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Args)]
struct QueryArgs {
    /// Index file created by `build`
    #[arg(short = 'i', long)]
    index: PathBuf,

    /// Query tokens file (whitespace-separated ids)
    #[arg(short = 'f', long)]
    file: PathBuf,

    /// Matching threshold in [0, 1]
    #[arg(short = 't', long, default_value_t = 0.8)]
    threshold: f64,

    /// Match reporting: anchored or rectangle
    #[arg(long, default_value = "anchored")]
    sweep: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
    // Argument errors exit 1, like any other failure; --help and --version
    // stay on stdout with exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => {
            let _ = e.print();
            return Ok(());
        }
    };
    match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Query(args) => run_query(args),
    }
}

fn run_build(args: BuildArgs) -> Result<()> {
    let tf_mode = TfMode::parse(&args.tf)?;
    let builder = BuilderKind::parse(&args.builder)?;
    let strategy = SearchStrategy::parse(&args.strategy)?;
    if args.hashes == 0 {
        bail!("number of hash functions must be positive");
    }
    if args.len_limit != 0 && args.doc_limit == 0 {
        bail!("a token length limit needs a document limit");
    }

    info!(
        "build: file={} k={} tf={} builder={} vocab={} seed={}",
        args.file.display(),
        args.hashes,
        tf_mode.as_str(),
        builder.as_str(),
        args.vocab,
        args.seed
    );
    if builder == BuilderKind::Monotonic {
        info!(
            "monotonic: active={} strategy={}",
            args.active != 0,
            strategy.as_str()
        );
    }

    let load_start = Instant::now();
    let docs = if args.doc_limit == 0 {
        read_docs(&args.file)?
    } else if args.len_limit == 0 {
        read_docs_limited(&args.file, args.doc_limit)?
    } else {
        read_docs_packed(&args.file, args.doc_limit, args.len_limit)?
    };
    info!(
        "loaded {} documents in {:.3}s",
        docs.len(),
        load_start.elapsed().as_secs_f64()
    );

    let options = BuildOptions {
        builder,
        active: args.active != 0,
        strategy,
    };
    let use_idf = args.idf.is_some() || args.idf_corpus;
    match Precision::of(tf_mode, use_idf) {
        Precision::Integer => {
            info!("weight precision: integer (raw TF, no IDF)");
            let hasher = IntHasher::new(args.hashes, args.vocab, args.seed);
            build_and_save(&docs, hasher, options, &args)
        }
        Precision::Real => {
            info!("weight precision: real (consistent weighted sampling)");
            let mut hasher = CwsHasher::new(args.hashes, args.vocab, tf_mode, args.seed);
            if let Some(path) = &args.idf {
                hasher.set_idf(read_idf_file(path, args.vocab)?)?;
                info!("idf loaded from {}", path.display());
            } else if args.idf_corpus {
                hasher.idf_from_corpus(&docs);
                info!("idf derived from corpus");
            }
            build_and_save(&docs, hasher, options, &args)
        }
    }
}

fn build_and_save<K: HashKernel>(
    docs: &[Vec<u32>],
    hasher: K,
    options: BuildOptions,
    args: &BuildArgs,
) -> Result<()> {
    let build_start = Instant::now();
    let table = build_table(docs, &hasher, options);
    info!(
        "built {} windows in {:.3}s",
        table.total(),
        build_start.elapsed().as_secs_f64()
    );

    if args.validate {
        info!("running coverage validation");
        let report = validate(docs, &table);
        if report.is_clean() {
            info!("validation clean");
        } else {
            warn!(
                "validation found {} uncovered and {} multi-covered ranges",
                report.uncovered, report.multi_covered
            );
        }
    }

    if let Some(path) = &args.index {
        let save_start = Instant::now();
        save_index(path, &hasher, &table)?;
        info!(
            "index saved to {} in {:.3}s",
            path.display(),
            save_start.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

fn run_query(args: QueryArgs) -> Result<()> {
    let sweep = SweepMode::parse(&args.sweep)?;
    let tokens = read_query_tokens(&args.file)?;
    if tokens.is_empty() {
        bail!("query file {} contains no tokens", args.file.display());
    }
    info!(
        "query: {} tokens, threshold {}, {} reporting",
        tokens.len(),
        args.threshold,
        sweep.as_str()
    );

    let header = read_header(&args.index)?;
    info!(
        "index: k={} vocab={} tf={} idf={}",
        header.k,
        header.token_num,
        header.tf_mode.as_str(),
        header.use_idf
    );

    match header.precision() {
        Precision::Integer => {
            let engine = QueryEngine::<IntHasher>::open(&args.index)?;
            print_results(&engine, &tokens, args.threshold, sweep)
        }
        Precision::Real => {
            let engine = QueryEngine::<CwsHasher>::open(&args.index)?;
            print_results(&engine, &tokens, args.threshold, sweep)
        }
    }
}

fn print_results<K: HashKernel>(
    engine: &QueryEngine<K>,
    tokens: &[u32],
    threshold: f64,
    sweep: SweepMode,
) -> Result<()> {
    info!("index loaded: {} windows", engine.total_windows());

    let signature = engine.signature(tokens);
    let preview: Vec<String> = signature.iter().take(5).map(|v| v.to_string()).collect();
    println!(
        "signature: {}{}",
        preview.join(" "),
        if signature.len() > 5 { " ..." } else { "" }
    );

    let search_start = Instant::now();
    let hits = engine.search(tokens, threshold)?;
    info!("search took {:.3}s", search_start.elapsed().as_secs_f64());

    let mut collided = 0usize;
    let mut regions = 0usize;
    for hit in &hits {
        collided += hit.window_count;
        regions += hit.regions.len();
        println!(
            "document {}: {} matches ({} colliding windows)",
            hit.doc_id,
            hit.regions.len(),
            hit.window_count
        );
        for region in hit.regions.iter().take(3) {
            match sweep {
                SweepMode::Anchored => {
                    let (lo, hi) = region.anchored();
                    println!("  range [{}, {}]", lo, hi);
                }
                SweepMode::Rectangle => println!(
                    "  start [{}, {}] x end [{}, {}]",
                    region.start_lo, region.start_hi, region.end_lo, region.end_hi
                ),
            }
        }
        if hit.regions.len() > 3 {
            println!("  ... {} more", hit.regions.len() - 3);
        }
    }
    println!("matched documents: {}", hits.len());
    println!("colliding windows: {}", collided);
    println!("match regions: {}", regions);
    Ok(())
}
