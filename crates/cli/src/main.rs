//! `office-to-pdf`: convert every Office document in a directory to PDF.

mod progress;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Input;
use office_to_pdf_core::{
    init_logging, ConversionError, Converter, ConverterConfig, RunSummary, DEFAULT_LOG_FILE,
};
use progress::BarReporter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "office-to-pdf",
    version,
    about = "Convert Office documents to PDF format",
    after_help = "Examples:\n  office-to-pdf /path/to/documents\n  office-to-pdf /path/to/documents -o /path/to/output\n  office-to-pdf /path/to/documents --log-file custom_log.txt"
)]
struct Cli {
    /// Input directory containing files to convert. Prompted for when omitted.
    input_directory: Option<PathBuf>,

    /// Output directory (default: <INPUT_DIRECTORY>/converted_pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// JSON configuration file; command line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the soffice binary
    #[arg(long)]
    soffice: Option<PathBuf>,

    /// Per-file timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Hide the progress bar
    #[arg(long, default_value_t = false)]
    no_progress: bool,
}

impl Cli {
    fn load_config(&self) -> Result<ConverterConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => ConverterConfig::default(),
        };
        if let Some(soffice) = &self.soffice {
            config.backend.soffice_path = Some(soffice.clone());
        }
        if let Some(secs) = self.timeout {
            config.backend.conversion_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

fn prompt_input_directory() -> Result<PathBuf> {
    println!("Office File to PDF Converter");
    let input: String = Input::new()
        .with_prompt("Enter the input directory path")
        .validate_with(|input: &String| -> Result<(), String> {
            if Path::new(input.trim()).is_dir() {
                Ok(())
            } else {
                Err("Invalid directory. Please enter a valid path.".to_string())
            }
        })
        .interact_text()
        .context("Failed to read input directory")?;
    Ok(PathBuf::from(input.trim()))
}

fn print_info(input: &Path, output: &Path, log_file: &Path) {
    println!("Processing Information");
    println!("  Input Directory:  {}", input.display());
    println!("  Output Directory: {}", output.display());
    println!("  Log File:         {}", log_file.display());
}

fn print_results(summary: &RunSummary, failures: &[(String, String)]) {
    println!("Processing Results");
    println!("  Total Files:            {}", summary.total);
    println!("  Successfully Processed: {}", summary.succeeded);
    if summary.failed > 0 {
        println!("  Failed:                 {}", summary.failed);
        for (filename, reason) in failures {
            println!("    {}: {}", filename, reason);
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let input = match &cli.input_directory {
        Some(dir) => dir.clone(),
        None => prompt_input_directory()?,
    };
    let config = cli.load_config()?;

    init_logging(&cli.log_file)
        .with_context(|| format!("Failed to open log file {}", cli.log_file.display()))?;

    let converter = Converter::new(config)?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| converter.default_output_dir(&input));
    print_info(&input, &output, &cli.log_file);

    let cancel = converter.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current file");
            cancel.cancel();
        }
    });

    let reporter = BarReporter::new(cli.no_progress, converter.config().max_label_len);
    match converter.run(&input, Some(&output), &reporter).await {
        Ok(summary) => {
            print_results(&summary, &reporter.failures());
            info!("Run finished: {:?}", summary);
            println!("Processing complete.");
            Ok(ExitCode::SUCCESS)
        }
        Err(ConversionError::Interrupted { completed, total }) => {
            info!("Run cancelled after {} of {} tasks", completed, total);
            eprintln!("\nOperation cancelled by user.");
            Ok(ExitCode::FAILURE)
        }
        Err(e @ ConversionError::InvalidInput(_)) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Unexpected error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["office-to-pdf", "/docs"]).unwrap();
        assert_eq!(cli.input_directory, Some(PathBuf::from("/docs")));
        assert_eq!(cli.output, None);
        assert_eq!(cli.log_file, PathBuf::from(DEFAULT_LOG_FILE));
        assert!(!cli.no_progress);
    }

    #[test]
    fn test_parse_without_input_is_interactive() {
        let cli = Cli::try_parse_from(["office-to-pdf"]).unwrap();
        assert!(cli.input_directory.is_none());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "office-to-pdf",
            "/docs",
            "-o",
            "/out",
            "--soffice",
            "/opt/lo/soffice",
            "--timeout",
            "30",
            "--no-progress",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("/out")));
        assert_eq!(config.backend.conversion_timeout, Duration::from_secs(30));
        assert_eq!(
            config.backend.soffice_path,
            Some(PathBuf::from("/opt/lo/soffice"))
        );
        assert!(cli.no_progress);
    }

    #[test]
    fn test_config_file_then_flag_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "output_subdir": "pdfs", "backend": { "max_docs_per_instance": 5 } }"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "office-to-pdf",
            "/docs",
            "--config",
            path.to_str().unwrap(),
            "--timeout",
            "9",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.output_subdir, "pdfs");
        assert_eq!(config.backend.max_docs_per_instance, 5);
        assert_eq!(config.backend.conversion_timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli =
            Cli::try_parse_from(["office-to-pdf", "/docs", "--config", "/nonexistent.json"])
                .unwrap();
        assert!(cli.load_config().is_err());
    }
}
