use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use eicr_extract::layout::TemplateLayout;
use eicr_extract::ocr::OcrSettings;
use eicr_extract::parser::{find_page_with_all, scan_sections, PageSource, PdfReader};
use eicr_extract::pipeline::{export_record, Extractor, ExtractorSettings, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "eicr-extract")]
#[command(version, about = "Structured data extraction from EICR PDF reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract one report to JSON
    Extract {
        /// Input PDF file path
        input: PathBuf,

        /// Output directory (default: ./<input_name>_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ExtractOptions,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Extract multiple reports with one shared OCR process
    Batch {
        /// Input PDF files
        inputs: Vec<PathBuf>,

        /// Base output directory; each input gets a subdirectory named after it
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ExtractOptions,
    },

    /// Show the report structure found in a PDF file
    Info {
        /// Input PDF file path
        input: PathBuf,

        /// Template layout override (JSON)
        #[arg(long)]
        layout: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
struct ExtractOptions {
    /// Tick image used for polarity and means-of-earthing detection
    #[arg(long, default_value = "template.png")]
    template: PathBuf,

    /// Template layout override (JSON)
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Skip OCR; OCR-derived fields are left empty
    #[arg(long)]
    no_ocr: bool,

    /// OCR bridge script
    #[arg(long, default_value = "ocr/bridge/ocr_bridge.py")]
    bridge_script: PathBuf,

    /// Python interpreter running the OCR bridge
    #[arg(long, default_value = "python3")]
    python: PathBuf,
}

impl ExtractOptions {
    fn settings(&self) -> Result<ExtractorSettings> {
        let ocr = (!self.no_ocr).then(|| OcrSettings {
            python: self.python.clone(),
            script: self.bridge_script.clone(),
        });
        ExtractorSettings::load(self.layout.as_deref(), Some(self.template.clone()), ocr)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eicr_extract=info")),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            output,
            options,
            quiet,
        } => {
            let extractor = Extractor::new(options.settings()?);
            extract_single(&extractor, input, output, quiet)
        }
        Commands::Batch {
            inputs,
            output,
            options,
        } => extract_batch(inputs, output, &options),
        Commands::Info { input, layout } => show_info(input, layout),
    }
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    PathBuf::from(format!("{stem}_output"))
}

fn extract_single(
    extractor: &Extractor,
    input: PathBuf,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }

    let output_dir = output.unwrap_or_else(|| default_output(&input));
    let config = PipelineConfig::new(input.clone(), output_dir, quiet);

    if !config.quiet {
        println!("[*] Processing: {}", config.input.display());
        println!("[*] Output: {}", config.output.display());
        println!("\n[+] Extracting report...");
    }

    let record = extractor
        .process(&config.input)
        .with_context(|| format!("Failed to process PDF: {}", input.display()))?;

    if !config.quiet {
        println!("[+] Boards found: {}", record.boards.len());
        println!("[+] Exporting results...");
    }

    let path = export_record(&record, &config)
        .with_context(|| format!("Failed to export to: {}", config.output.display()))?;

    if !config.quiet {
        println!("\n[✓] Done! Results saved to: {}", path.display());
    }

    Ok(())
}

fn extract_batch(inputs: Vec<PathBuf>, output: Option<PathBuf>, options: &ExtractOptions) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }

    let base_output = output.unwrap_or_else(|| PathBuf::from("batch_output"));
    let extractor = Extractor::new(options.settings()?);

    println!("[*] Batch processing {} file(s)", inputs.len());
    println!("[*] Base output: {}\n", base_output.display());

    let mut success = 0;
    let mut failed = 0;

    for (i, input) in inputs.iter().enumerate() {
        println!("[{}/{}] Processing: {}", i + 1, inputs.len(), input.display());

        if !input.exists() {
            eprintln!("  [!] Skipped: file does not exist");
            failed += 1;
            continue;
        }

        // reports without a number all export as final_output.json
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let output_dir = base_output.join(&*stem);

        match extract_single(&extractor, input.clone(), Some(output_dir), true) {
            Ok(()) => {
                println!("  [✓] Success");
                success += 1;
            }
            Err(e) => {
                eprintln!("  [✗] Failed: {:#}", e);
                failed += 1;
            }
        }
        println!();
    }

    println!("\n[*] Summary: {} succeeded, {} failed", success, failed);

    if failed > 0 {
        anyhow::bail!("{} file(s) failed to process", failed);
    }

    Ok(())
}

fn show_info(input: PathBuf, layout: Option<PathBuf>) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let layout = match layout {
        Some(path) => TemplateLayout::from_file(&path)?,
        None => TemplateLayout::default(),
    };

    let reader = PdfReader::new(input.clone())
        .with_context(|| format!("Failed to open PDF: {}", input.display()))?;

    let page_count = reader.page_count()?;
    let scan = scan_sections(&reader, &layout.sections)?;
    let supply_page = find_page_with_all(&reader, &layout.sections.supply_page)?;

    println!("EICR Information");
    println!("================");
    println!("File: {}", input.display());
    println!("Pages: {}", page_count);
    println!("Circuit details pages: {:?}", scan.circuit_pages);
    println!("Test results pages: {:?}", scan.test_pages);
    println!("Boards: {}", scan.board_names.join(", "));
    match supply_page {
        Some(idx) => println!("Supply characteristics page: {}", idx + 1),
        None => println!("Supply characteristics page: not found"),
    }

    Ok(())
}
