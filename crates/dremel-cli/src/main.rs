//! Dremel CLI tool
//!
//! Stripes newline-delimited JSON records into columns along a schema, prints
//! the transition table, or shreds and reassembles records.
//!
//! Examples:
//!   dremel fsm schema.json
//!   dremel columns schema.json records.ndjson
//!   dremel assemble schema.json records.ndjson --json
//!   dremel assemble schema.json - < records.ndjson

use std::fmt::Write as _;
use std::io::{self, Read};

use dremel_assembly::{AbsentPolicy, Assembler, AssemblyError, AssemblyOptions, ColumnStore};
use dremel_schema::{Schema, SchemaError, TransitionTable};
use dremel_shred::{ShredError, Shredder};
use facet::Facet;
use figue as args;
use serde_json::Value;

// ============================================================================
// Exit codes
// ============================================================================

const EXIT_SUCCESS: i32 = 0;
const EXIT_USAGE_ERROR: i32 = 1;
const EXIT_DATA_ERROR: i32 = 2;
const EXIT_IO_ERROR: i32 = 3;

// ============================================================================
// CLI argument structures
// ============================================================================

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Top-level CLI
#[derive(Facet, Debug)]
struct Args {
    /// Show version
    #[facet(args::named, args::short = 'V', default)]
    version: bool,

    /// Subcommand to run
    #[facet(args::subcommand, default)]
    command: Option<Command>,
}

/// Available subcommands
#[derive(Facet, Debug)]
#[repr(u8)]
enum Command {
    /// Shred records and print every column
    Columns {
        /// Schema file (JSON)
        #[facet(args::positional)]
        schema: String,

        /// Records, one JSON object per line (or "-" for stdin)
        #[facet(args::positional)]
        records: String,
    },

    /// Print the transition table of a schema
    Fsm {
        /// Schema file (JSON)
        #[facet(args::positional)]
        schema: String,
    },

    /// Shred records, assemble them back and print them
    Assemble {
        /// Schema file (JSON)
        #[facet(args::positional)]
        schema: String,

        /// Records, one JSON object per line (or "-" for stdin)
        #[facet(args::positional)]
        records: String,

        /// Print one JSON object per record instead of a tree listing
        #[facet(args::named, default)]
        json: bool,

        /// Null-cell policy: parents, path or definition-level
        #[facet(args::named, default)]
        absent: Option<String>,
    },
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let raw_args: Vec<String> = std::env::args().skip(1).collect();

    if raw_args.is_empty() {
        print_help();
        std::process::exit(EXIT_SUCCESS);
    }

    if raw_args[0] == "--version" || raw_args[0] == "-V" {
        println!("dremel {VERSION}");
        std::process::exit(EXIT_SUCCESS);
    }

    if raw_args[0] == "--help" || raw_args[0] == "-h" {
        print_help();
        std::process::exit(EXIT_SUCCESS);
    }

    match run(&raw_args) {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

fn print_help() {
    eprintln!("dremel {VERSION} - column striping and record assembly for nested data\n");
    eprintln!("USAGE:");
    eprintln!("    dremel <command> [args]\n");
    eprintln!("SUBCOMMANDS:");
    eprintln!("    fsm <schema>                    Print the transition table");
    eprintln!("    columns <schema> <records>      Shred records and print every column");
    eprintln!("    assemble <schema> <records>     Shred records and assemble them back\n");
    eprintln!("ASSEMBLE OPTIONS:");
    eprintln!("        --json                      One JSON object per record");
    eprintln!("        --absent <POLICY>           parents, path or definition-level");
    eprintln!("                                    (default: definition-level)\n");
    eprintln!("    Records are read one JSON object per line; '-' reads stdin.\n");
    eprintln!("EXAMPLES:");
    eprintln!("    dremel fsm schema.json");
    eprintln!("    dremel columns schema.json records.ndjson");
    eprintln!("    dremel assemble schema.json records.ndjson --json");
}

fn run(args: &[String]) -> Result<(), CliError> {
    let args_strs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let parsed: Args =
        figue::from_slice(&args_strs).map_err(|e| CliError::Usage(e.to_string()))?;

    if parsed.version {
        println!("dremel {VERSION}");
        return Ok(());
    }

    match parsed.command {
        Some(Command::Fsm { schema }) => run_fsm(&schema),
        Some(Command::Columns { schema, records }) => run_columns(&schema, &records),
        Some(Command::Assemble {
            schema,
            records,
            json,
            absent,
        }) => {
            let policy = match absent.as_deref() {
                Some(name) => parse_policy(name)?,
                None => AbsentPolicy::DefinitionLevel,
            };
            run_assemble(&schema, &records, json, policy)
        }
        None => {
            print_help();
            Ok(())
        }
    }
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Usage(String),
    Schema(SchemaError),
    /// A records line is not valid JSON.
    Json {
        line: usize,
        error: serde_json::Error,
    },
    Shred {
        line: usize,
        error: ShredError,
    },
    Assembly(AssemblyError),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Io(_) => EXIT_IO_ERROR,
            CliError::Usage(_) => EXIT_USAGE_ERROR,
            CliError::Schema(_) => EXIT_USAGE_ERROR,
            CliError::Json { .. } => EXIT_USAGE_ERROR,
            CliError::Shred { .. } => EXIT_DATA_ERROR,
            CliError::Assembly(_) => EXIT_DATA_ERROR,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "{e}"),
            CliError::Usage(e) => write!(f, "{e}"),
            CliError::Schema(e) => write!(f, "schema: {e}"),
            CliError::Json { line, error } => write!(f, "line {line}: {error}"),
            CliError::Shred { line, error } => write!(f, "line {line}: {error}"),
            CliError::Assembly(e) => write!(f, "{e}"),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        CliError::Schema(e)
    }
}

impl From<AssemblyError> for CliError {
    fn from(e: AssemblyError) -> Self {
        CliError::Assembly(e)
    }
}

// ============================================================================
// Subcommand implementations
// ============================================================================

fn run_fsm(schema: &str) -> Result<(), CliError> {
    let schema = load_schema(schema)?;
    let table = TransitionTable::build(schema.fields())?;
    print!("{}", table.describe(schema.fields()));
    Ok(())
}

fn run_columns(schema: &str, records: &str) -> Result<(), CliError> {
    let schema = load_schema(schema)?;
    let columns = shred(&schema, &read_input(records)?)?;
    print!("{}", describe_columns(&schema, &columns));
    Ok(())
}

fn run_assemble(
    schema: &str,
    records: &str,
    json: bool,
    policy: AbsentPolicy,
) -> Result<(), CliError> {
    let schema = load_schema(schema)?;
    let columns = shred(&schema, &read_input(records)?)?;
    let table = TransitionTable::build(schema.fields())?;
    let options = AssemblyOptions::new()
        .absent(policy)
        .root_name(schema.name());

    let mut assembler = Assembler::new(schema.fields(), &table, &columns)?.with_options(options);
    for record in assembler.records() {
        let record = record?;
        if json {
            println!("{}", record.to_json());
        } else {
            print!("{}", record.render());
        }
    }
    assembler.finish()?;
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn load_schema(path: &str) -> Result<Schema, CliError> {
    let source = std::fs::read_to_string(path)?;
    Ok(Schema::parse(&source)?)
}

fn read_input(path: &str) -> Result<String, io::Error> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

fn parse_policy(name: &str) -> Result<AbsentPolicy, CliError> {
    match name {
        "parents" => Ok(AbsentPolicy::Parents),
        "path" => Ok(AbsentPolicy::Path),
        "definition-level" => Ok(AbsentPolicy::DefinitionLevel),
        other => Err(CliError::Usage(format!(
            "unknown absent policy '{other}' (expected parents, path or definition-level)"
        ))),
    }
}

/// Shred newline-delimited records. Blank lines are skipped; line numbers in
/// errors are 1-based.
fn shred(schema: &Schema, source: &str) -> Result<ColumnStore<Value>, CliError> {
    let mut shredder = Shredder::new(schema);
    for (index, text) in source.lines().enumerate() {
        if text.trim().is_empty() {
            continue;
        }
        let line = index + 1;
        let record: Value =
            serde_json::from_str(text).map_err(|error| CliError::Json { line, error })?;
        shredder
            .shred(&record)
            .map_err(|error| CliError::Shred { line, error })?;
    }
    Ok(shredder.finish())
}

/// Every column in schema order, one `value r=R d=D` line per cell.
fn describe_columns(schema: &Schema, columns: &ColumnStore<Value>) -> String {
    let mut out = String::new();
    for field in schema.fields() {
        let _ = writeln!(out, "{} ({})", field.path(), field.mode());
        for cell in columns.column(field.path()).unwrap_or(&[]) {
            let value = match &cell.value {
                Some(value) => value.to_string(),
                None => "NULL".to_string(),
            };
            let _ = writeln!(
                out,
                "  {} r={} d={}",
                value, cell.repetition_level, cell.definition_level
            );
        }
    }
    out
}
