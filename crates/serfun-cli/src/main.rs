//! serfun CLI: run, check and explain series programs, and ingest CSV files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use serfun_core::{EngineConfig, SeriesValue, Value};
use serfun_exec::{CsvIngest, Engine, ScriptArg};
use serfun_planner::{parse, parse_job, JobConfig};

#[derive(Parser)]
#[command(name = "serfun")]
#[command(about = "Series dataflow engine: compile and run series programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct StoreOpts {
    /// Store URI, `memory://` or `file:///path` (overrides env and job)
    #[arg(long)]
    store_uri: Option<String>,

    /// File store root when no URI is set
    #[arg(long)]
    store_dir: Option<String>,

    /// Points fetched per `load` page
    #[arg(long)]
    page_size: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program and print (or write) the values of its first output
    Run {
        /// Program file; omit when using --job
        script: Option<PathBuf>,

        /// YAML job manifest naming the program, its arguments and config
        #[arg(short, long, conflicts_with = "script")]
        job: Option<PathBuf>,

        /// Program argument: `@authority:path` or `@path` for a stored series,
        /// otherwise a number, `true`/`false`, or a string
        #[arg(short, long = "arg")]
        args: Vec<String>,

        /// Write one `column<TAB>value` line per value here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        store: StoreOpts,
    },

    /// Parse a program file (syntax check only)
    Validate {
        script: PathBuf,
    },

    /// Show a program and the graph one instantiation builds
    Explain {
        script: PathBuf,

        #[arg(short, long = "arg")]
        args: Vec<String>,

        #[command(flatten)]
        store: StoreOpts,
    },

    /// Load a CSV file into the store, one series per column
    Ingest {
        csv: PathBuf,

        /// Prepended to each sanitized header to form the series path
        #[arg(short, long)]
        prefix: String,

        /// Column holding the point keys
        #[arg(long, default_value_t = 0)]
        sort_column: usize,

        #[command(flatten)]
        store: StoreOpts,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            job,
            args,
            output,
            store,
        } => {
            if let Err(e) = run_program(script, job, args, output, &store) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { script } => {
            if let Err(e) = validate_program(&script) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Program is valid");
        }
        Commands::Explain {
            script,
            args,
            store,
        } => {
            if let Err(e) = explain_program(&script, args, &store) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Ingest {
            csv,
            prefix,
            sort_column,
            store,
        } => {
            if let Err(e) = ingest_csv(&csv, prefix, sort_column, &store) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_program(
    script: Option<PathBuf>,
    job_path: Option<PathBuf>,
    args: Vec<String>,
    output: Option<PathBuf>,
    opts: &StoreOpts,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = EngineConfig::from_env();

    let (source, args, output) = match (script, job_path) {
        (_, Some(path)) => {
            let job = parse_job(&fs::read_to_string(&path)?)?;
            if let Some(job_cfg) = &job.config {
                apply_job_config(&mut config, job_cfg)?;
            }
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            let source = job.program_source(base)?;
            let mut script_args: Vec<ScriptArg> = job.args.into_iter().map(ScriptArg::from).collect();
            script_args.extend(args.iter().map(|a| parse_arg(a)));
            let output = output.or_else(|| job.output.map(|o| base.join(o)));
            (source, script_args, output)
        }
        (Some(path), None) => (
            fs::read_to_string(path)?,
            args.iter().map(|a| parse_arg(a)).collect(),
            output,
        ),
        (None, None) => return Err("either a program file or --job is required".into()),
    };
    apply_store_opts(&mut config, opts)?;

    let engine = Engine::new(config)?;
    let values = engine.run_script(&source, args)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = std::io::BufWriter::new(fs::File::create(&path)?);
            write_values(&mut file, &values)?;
            file.flush()?;
            tracing::info!(values = values.len(), path = %path.display(), "results written");
        }
        None => {
            let stdout = std::io::stdout();
            write_values(&mut stdout.lock(), &values)?;
        }
    }

    Ok(())
}

fn validate_program(script: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(script)?;
    let _ = parse(&source)?;
    Ok(())
}

fn explain_program(
    script: &Path,
    args: Vec<String>,
    opts: &StoreOpts,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(script)?;
    let mut config = EngineConfig::from_env();
    apply_store_opts(&mut config, opts)?;

    let engine = Engine::new(config)?;
    let program = engine.compile(&source)?;
    let args = args.iter().map(|a| parse_arg(a)).collect();

    println!("Program Plan");
    println!("============");
    println!();
    print!("{}", engine.explain(&program, args)?);

    Ok(())
}

fn ingest_csv(
    csv: &Path,
    prefix: String,
    sort_column: usize,
    opts: &StoreOpts,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = EngineConfig::from_env();
    apply_store_opts(&mut config, opts)?;
    let engine = Engine::new(config)?;

    let store = engine.store();
    let report = CsvIngest::new(prefix)
        .sort_column(sort_column)
        .ingest_path(csv, store.as_ref())?;

    println!("✓ Ingested {} rows", report.rows);
    println!("  Points: {}", report.points);
    for series in &report.series {
        println!("  {series}");
    }

    Ok(())
}

fn apply_job_config(cfg: &mut EngineConfig, job: &JobConfig) -> Result<(), Box<dyn std::error::Error>> {
    job.apply(cfg)?;
    Ok(())
}

fn apply_store_opts(cfg: &mut EngineConfig, opts: &StoreOpts) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(uri) = &opts.store_uri {
        cfg.store_uri = Some(uri.clone());
    }
    if let Some(dir) = &opts.store_dir {
        cfg.store_dir = dir.clone();
    }
    if let Some(n) = opts.page_size {
        if n == 0 {
            return Err("--page-size must be positive".into());
        }
        cfg.page_size = n;
    }
    Ok(())
}

/// `@authority:path` and `@path` name stored series; anything else is a scalar.
fn parse_arg(raw: &str) -> ScriptArg {
    if let Some(reference) = raw.strip_prefix('@') {
        return ScriptArg::Series(reference.replacen(':', "/", 1));
    }
    let value = if let Ok(n) = raw.parse::<i64>() {
        Value::Long(n)
    } else if let Ok(d) = raw.parse::<f64>() {
        Value::Decimal(d)
    } else {
        match raw {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => Value::String(raw.to_string()),
        }
    };
    ScriptArg::Scalar(value)
}

fn write_values(out: &mut impl Write, values: &[SeriesValue]) -> std::io::Result<()> {
    for v in values {
        writeln!(out, "{}\t{}", v.column, v.value)?;
    }
    Ok(())
}
