//! airisk CLI - Convert the MIT AI Risk Repository to JSON
//!
//! # Main Command
//!
//! ```bash
//! airisk convert --input repository.xlsx --output risks.json
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! airisk sheets repository.xlsx                  # List sheet names
//! airisk read repository.xlsx --sheet S -r 2     # Dump one sheet as JSON rows
//! airisk default-config                          # Print the built-in configuration
//! ```

use airisk::logs::{log_error, LogTally};
use airisk::{convert_source, open_source, ConversionConfig, Source};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "airisk")]
#[command(about = "Convert the MIT AI Risk Repository spreadsheet to JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a workbook (or a directory of per-sheet CSV exports) to JSON
    Convert {
        /// Input workbook or CSV directory
        #[arg(short, long, env = "AIRISK_INPUT")]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long, env = "AIRISK_OUTPUT")]
        output: Option<PathBuf>,

        /// Name of the main sheet
        #[arg(short, long)]
        sheet_name: Option<String>,

        /// Name of the metadata sheet
        #[arg(short, long)]
        metadata_sheet: Option<String>,

        /// JSON configuration file (default: built-in repository layout)
        #[arg(short, long, env = "AIRISK_CONFIG")]
        config: Option<PathBuf>,

        /// Fail without writing output if the conversion logged warnings
        #[arg(long)]
        deny_warnings: bool,
    },

    /// List the sheets of a workbook
    Sheets {
        /// Input workbook or CSV directory
        input: PathBuf,
    },

    /// Read one sheet and output its rows as JSON
    Read {
        /// Input workbook or CSV directory
        input: PathBuf,

        /// Sheet to read
        #[arg(short, long)]
        sheet: String,

        /// Number of non-blank rows above the header row
        #[arg(short = 'r', long, default_value = "0")]
        header_row: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the built-in configuration as JSON
    DefaultConfig,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            sheet_name,
            metadata_sheet,
            config,
            deny_warnings,
        } => cmd_convert(
            &input,
            output.as_deref(),
            sheet_name.as_deref(),
            metadata_sheet.as_deref(),
            config.as_deref(),
            deny_warnings,
        ),

        Commands::Sheets { input } => cmd_sheets(&input),

        Commands::Read {
            input,
            sheet,
            header_row,
            output,
        } => cmd_read(&input, &sheet, header_row, output.as_deref()),

        Commands::DefaultConfig => cmd_default_config(),
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    sheet_name: Option<&str>,
    metadata_sheet: Option<&str>,
    config_path: Option<&Path>,
    deny_warnings: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut tally = LogTally::start();

    let config = match config_path {
        Some(path) => {
            eprintln!("⚙️  Config: {}", path.display());
            ConversionConfig::from_json_file(path)?
        }
        None => ConversionConfig::default(),
    }
    .with_sheet_names(sheet_name, metadata_sheet);

    let conversion = convert_source(&Source::Path(input.to_path_buf()), &config)?;

    eprintln!("\n📊 Records: {}", conversion.stats.primary_rows);
    eprintln!("   With metadata: {}", conversion.stats.matched);
    eprintln!("   Without metadata: {}", conversion.stats.unmatched);
    if conversion.stats.duplicate_keys > 0 {
        eprintln!("   Duplicate metadata keys: {}", conversion.stats.duplicate_keys);
    }

    let warnings = tally.warnings();
    if !warnings.is_empty() {
        eprintln!("   Warnings: {}", warnings.len());
        if tally.skipped() > 0 {
            eprintln!("   ({} log entries not counted)", tally.skipped());
        }
        if deny_warnings {
            return Err(format!("{} warning(s) logged, output not written", warnings.len()).into());
        }
    }

    write_output(&conversion.json, output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_sheets(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let reader = open_source(&Source::Path(input.to_path_buf()))?;
    for name in reader.sheet_names() {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_read(
    input: &Path,
    sheet: &str,
    header_row: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Reading '{}' from {}", sheet, input.display());

    let mut reader = open_source(&Source::Path(input.to_path_buf()))?;
    let table = reader.read_sheet(sheet, header_row)?;

    eprintln!("   Columns: {}", table.columns.join(", "));
    eprintln!("✓ Read {} rows", table.len());

    let json = serde_json::to_string_pretty(&table.rows)?;
    write_output(&json, output)
}

fn cmd_default_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", ConversionConfig::default().to_json()?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
