use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use smrt_core::{TypeRegistry, compile_from};
use smrt_manifest::{IN_MEMORY_PATH, Manifest, RuntimeConfig};
use smrt_sqlite::{SqliteDatabase, SyncReport, generate_schema_sql, synchronize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "smrt")]
#[command(about = "Schema tooling for SMRT persistent objects")]
#[command(version)]
struct Cli {
    /// Runtime configuration YAML.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter directive (overrides RUST_LOG and the config file).
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the generated DDL for each type in a manifest.
    Schema(SchemaArgs),
    /// Create missing tables, columns, and triggers for every type in a manifest.
    Sync(SyncArgs),
    /// Compile a JSON filter object into a WHERE fragment and values.
    Where(WhereArgs),
    /// Inspect and verify manifest files.
    Manifest(ManifestArgs),
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Path to the manifest JSON.
    #[arg(long)]
    manifest: PathBuf,
    /// Only print this type.
    #[arg(long = "type")]
    type_name: Option<String>,
}

#[derive(Debug, Args)]
struct SyncArgs {
    /// Path to the manifest JSON.
    #[arg(long)]
    manifest: PathBuf,
    /// Database file path (default: database.path from the config).
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct WhereArgs {
    /// Filter object, e.g. '{"price >": 100, "status": "active"}'.
    filter: String,
    /// First placeholder index.
    #[arg(long, default_value_t = 1)]
    start: usize,
}

#[derive(Debug, Args)]
struct ManifestArgs {
    #[command(subcommand)]
    operation: ManifestOperation,
}

#[derive(Debug, Subcommand)]
enum ManifestOperation {
    /// Verify the checksum and validate every type.
    Check(ManifestFileArgs),
    /// Print the manifest as YAML.
    Show(ManifestFileArgs),
}

#[derive(Debug, Args)]
struct ManifestFileArgs {
    /// Path to the manifest JSON.
    file: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = RuntimeConfig::load_or_default(cli.config.as_deref())
        .map_err(|e| format!("Failed to load config: {e}"))?;
    init_logging(cli.log_level.as_deref(), &config)?;

    match cli.command {
        Command::Schema(args) => run_schema(args),
        Command::Sync(args) => run_sync(args, &config),
        Command::Where(args) => run_where(args),
        Command::Manifest(args) => match args.operation {
            ManifestOperation::Check(a) => run_manifest_check(a),
            ManifestOperation::Show(a) => run_manifest_show(a),
        },
    }
}

/// Logs go to stderr. The filter comes from `--log-level`, then `RUST_LOG`,
/// then `logging.level` in the config.
fn init_logging(cli_level: Option<&str>, config: &RuntimeConfig) -> Result<(), String> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| format!("Invalid log level '{level}': {e}"))?,
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&config.logging.level).map_err(|e| {
                format!("Invalid log level '{}': {e}", config.logging.level)
            })?,
        },
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn load_manifest(path: &Path) -> Result<Manifest, String> {
    let manifest = Manifest::load(path)
        .map_err(|e| format!("Failed to load manifest '{}': {e}", path.display()))?;
    manifest
        .verify_checksum()
        .map_err(|e| format!("Manifest '{}' failed verification: {e}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        types = manifest.types.len(),
        checksum = %manifest.checksum,
        "loaded manifest"
    );
    Ok(manifest)
}

fn load_registry(path: &Path) -> Result<TypeRegistry, String> {
    load_manifest(path)?
        .into_registry()
        .map_err(|e| format!("Failed to rebuild registry from '{}': {e}", path.display()))
}

fn run_schema(args: SchemaArgs) -> Result<(), String> {
    let registry = load_registry(&args.manifest)?;
    let descriptors = match &args.type_name {
        Some(name) => vec![
            registry
                .get(name)
                .ok_or_else(|| format!("Unknown type '{name}'"))?,
        ],
        None => registry.get_all(),
    };

    for (i, descriptor) in descriptors.iter().enumerate() {
        let sql = generate_schema_sql(descriptor)
            .map_err(|e| format!("Failed to generate schema for '{}': {e}", descriptor.name))?;
        if i > 0 {
            println!();
        }
        println!("-- {}", descriptor.name);
        println!("{sql}");
    }
    Ok(())
}

fn run_sync(args: SyncArgs, config: &RuntimeConfig) -> Result<(), String> {
    let registry = load_registry(&args.manifest)?;
    if config.registry.freeze_after_load {
        registry.freeze();
    }

    let db_path = args
        .db
        .unwrap_or_else(|| PathBuf::from(&config.database.path));
    let db = if db_path == Path::new(IN_MEMORY_PATH) {
        SqliteDatabase::open_in_memory()
    } else {
        SqliteDatabase::open(&db_path)
    }
    .map_err(|e| format!("Failed to open database '{}': {e}", db_path.display()))?;
    db.set_foreign_keys(config.database.foreign_keys)
        .map_err(|e| format!("Failed to configure database: {e}"))?;

    let mut report = SyncReport::default();
    for descriptor in registry.get_all() {
        let sql = generate_schema_sql(&descriptor)
            .map_err(|e| format!("Failed to generate schema for '{}': {e}", descriptor.name))?;
        let step = synchronize(&db, &sql)
            .map_err(|e| format!("Sync failed for '{}': {e}", descriptor.name))?;
        tracing::info!(
            type_name = %descriptor.name,
            table = %descriptor.table_name,
            tables_created = step.tables_created.len(),
            columns_added = step.columns_added.len(),
            "synchronized type"
        );
        report.merge(step);
    }

    println!("Sync complete for '{}':", db_path.display());
    println!("  Types: {}", registry.len());
    println!("  Tables created: {}", list_or_none(&report.tables_created));
    println!("  Columns added: {}", list_or_none(&report.columns_added));
    println!(
        "  Triggers installed: {}",
        list_or_none(&report.triggers_installed)
    );
    Ok(())
}

fn run_where(args: WhereArgs) -> Result<(), String> {
    let filter = match serde_json::from_str::<Value>(&args.filter) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err("Filter must be a JSON object".to_string()),
        Err(e) => return Err(format!("Invalid filter JSON: {e}")),
    };
    let predicate =
        compile_from(&filter, args.start).map_err(|e| format!("Invalid filter: {e}"))?;
    tracing::debug!(conditions = filter.len(), start = args.start, "compiled filter");
    let next_index = predicate.next_index();
    let output = json!({
        "fragment": predicate.fragment,
        "values": predicate.values,
        "next_index": next_index,
    });
    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|e| format!("Failed to render output: {e}"))?;
    println!("{rendered}");
    Ok(())
}

fn run_manifest_check(args: ManifestFileArgs) -> Result<(), String> {
    let manifest = load_manifest(&args.file)?;
    let problems = manifest.validate();
    if !problems.is_empty() {
        eprintln!("Problems in '{}':", args.file.display());
        for (type_name, problem) in &problems {
            eprintln!("  {type_name}: {problem}");
        }
        return Err(format!("{} problem(s) found", problems.len()));
    }
    println!(
        "Manifest OK: {} type(s), checksum {}",
        manifest.types.len(),
        manifest.checksum
    );
    Ok(())
}

fn run_manifest_show(args: ManifestFileArgs) -> Result<(), String> {
    let manifest = Manifest::load(&args.file)
        .map_err(|e| format!("Failed to load manifest '{}': {e}", args.file.display()))?;
    let yaml = manifest
        .to_yaml()
        .map_err(|e| format!("Failed to render manifest: {e}"))?;
    print!("{yaml}");
    Ok(())
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
