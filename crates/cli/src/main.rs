//! CLI tool for translating PowerPoint and Excel files.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use xlate_core::{
    DocumentFormat, EngineOptions, LanguagePair, RunReport, TaggingPort, TranslationPort,
    DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE,
};
use xlate_service::{
    translated_file_name, DocumentTranslationService, GoogleTranslatePort, DEFAULT_ENDPOINT,
    DEFAULT_TIMEOUT,
};

/// Translate the text of .pptx and .xlsx files, keeping their layout.
#[derive(Parser, Debug)]
#[command(name = "xlate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file(s) (.pptx or .xlsx)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Target language code
    #[arg(short, long, default_value = DEFAULT_TARGET_LANGUAGE)]
    target: String,

    /// Source language code
    #[arg(short, long, default_value = DEFAULT_SOURCE_LANGUAGE)]
    source: String,

    /// Output directory (default: same as input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Document format, overriding detection (pptx, xlsx)
    #[arg(long)]
    format: Option<String>,

    /// Per-call translation timeout in seconds
    #[arg(long, env = "XLATE_TIMEOUT", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Extra attempts for a failed translation call
    #[arg(long, default_value = "0")]
    retries: u32,

    /// Translation calls in flight at once
    #[arg(short, long, default_value = "1")]
    jobs: usize,

    /// Tag text with the target language instead of calling a translator
    #[arg(long)]
    dry_run: bool,

    /// Translation endpoint URL
    #[arg(long, env = "XLATE_ENDPOINT")]
    endpoint: Option<String>,

    /// Write a JSON run report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Report entry for one input file.
#[derive(Debug, Serialize)]
struct FileReport {
    input: PathBuf,
    output: Option<PathBuf>,
    format: Option<DocumentFormat>,
    error: Option<String>,
    #[serde(flatten)]
    report: Option<RunReport>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let languages = LanguagePair::new(&args.source, &args.target)?;
    let declared = args
        .format
        .as_deref()
        .map(DocumentFormat::from_tag)
        .transpose()?;
    let service = DocumentTranslationService::new(build_port(&args)?).with_options(EngineOptions {
        retries: args.retries,
        concurrency: args.jobs.max(1),
    });

    let (reports, failed) = translate_all(&args, declared, &service, &languages);

    if let Some(path) = &args.report {
        let json = serde_json::to_vec_pretty(&reports).context("Failed to serialize report")?;
        write_output(path, &json)?;
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, args.input.len());
    }
    Ok(())
}

/// Translate every input; a failing file is reported and skipped.
fn translate_all(
    args: &Args,
    declared: Option<DocumentFormat>,
    service: &DocumentTranslationService<Box<dyn TranslationPort>>,
    languages: &LanguagePair,
) -> (Vec<FileReport>, usize) {
    let mut reports = Vec::new();
    let mut failed = 0;
    for input_path in &args.input {
        if args.verbose {
            eprintln!("Processing: {}", input_path.display());
        }

        match process_file(input_path, &args, declared, &service, &languages) {
            Ok(entry) => {
                if let (Some(output), Some(report)) = (&entry.output, &entry.report) {
                    eprintln!(
                        "{} -> {} ({}/{} units translated, {} failed)",
                        input_path.display(),
                        output.display(),
                        report.translated,
                        report.candidates,
                        report.failures.len()
                    );
                }
                reports.push(entry);
            }
            Err(e) => {
                eprintln!("Error processing {}: {:#}", input_path.display(), e);
                failed += 1;
                reports.push(FileReport {
                    input: input_path.clone(),
                    output: None,
                    format: None,
                    error: Some(format!("{:#}", e)),
                    report: None,
                });
            }
        }
    }
    (reports, failed)
}

/// Pick the translation backend.
fn build_port(args: &Args) -> Result<Box<dyn TranslationPort>> {
    if args.dry_run {
        log::info!("Dry run: tagging text instead of translating");
        return Ok(Box::new(TaggingPort));
    }
    let timeout = Duration::from_secs(args.timeout);
    let endpoint = args.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
    let port = GoogleTranslatePort::with_endpoint(endpoint, timeout)
        .context("Failed to set up translation client")?;
    Ok(Box::new(port))
}

/// Translate a single document and write the result.
fn process_file(
    input_path: &Path,
    args: &Args,
    declared: Option<DocumentFormat>,
    service: &DocumentTranslationService<Box<dyn TranslationPort>>,
    languages: &LanguagePair,
) -> Result<FileReport> {
    let bytes = std::fs::read(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;

    let format = resolve_format(declared, &bytes, input_path)?;
    log::debug!("{}: {}", input_path.display(), format);

    let document = service
        .translate_document(&bytes, format, languages)
        .with_context(|| format!("Failed to translate {}", input_path.display()))?;

    let output_path = get_output_path(input_path, args.output.as_ref())?;
    write_output(&output_path, &document.bytes)?;
    if args.verbose {
        eprintln!("Written to: {}", output_path.display());
    }

    Ok(FileReport {
        input: input_path.to_path_buf(),
        output: Some(output_path),
        format: Some(format),
        error: None,
        report: Some(document.report),
    })
}

/// Declared format first, then the container contents, then the file name.
fn resolve_format(
    declared: Option<DocumentFormat>,
    bytes: &[u8],
    input_path: &Path,
) -> Result<DocumentFormat> {
    declared
        .or_else(|| DocumentFormat::sniff(bytes))
        .or_else(|| {
            input_path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(DocumentFormat::from_file_name)
        })
        .ok_or_else(|| anyhow::anyhow!("Could not detect file format"))
}

/// Determine the output path for a translated file.
fn get_output_path(input_path: &Path, output_dir: Option<&PathBuf>) -> Result<PathBuf> {
    let name = input_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let output_filename = translated_file_name(name);

    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(output_filename)
        }
        None => {
            if let Some(parent) = input_path.parent() {
                parent.join(output_filename)
            } else {
                PathBuf::from(output_filename)
            }
        }
    };

    Ok(output_path)
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use xlate_xlsx::fixtures::{Cell, WorkbookBuilder};
    use xlate_xlsx::{CellRef, XlsxParser};

    fn workbook() -> Vec<u8> {
        WorkbookBuilder::new()
            .sheet("Sheet1", vec![vec![Cell::Text("税金"), Cell::Number("100")]])
            .build()
    }

    fn dry_run_service() -> DocumentTranslationService<Box<dyn TranslationPort>> {
        DocumentTranslationService::new(Box::new(TaggingPort) as Box<dyn TranslationPort>)
    }

    #[test]
    fn test_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out/nested");
        let path = get_output_path(Path::new("/data/売上.xlsx"), Some(&out)).unwrap();
        assert_eq!(path, out.join("translated_売上.xlsx"));
        assert!(out.is_dir());

        let path = get_output_path(Path::new("/data/deck.pptx"), None).unwrap();
        assert_eq!(path, PathBuf::from("/data/translated_deck.pptx"));
        let path = get_output_path(Path::new("deck.pptx"), None).unwrap();
        assert_eq!(path, PathBuf::from("translated_deck.pptx"));
    }

    #[test]
    fn test_format_resolution_order() {
        let book = workbook();
        // Declared format wins, even over the container.
        assert_eq!(
            resolve_format(Some(DocumentFormat::Pptx), &book, Path::new("a.xlsx")).unwrap(),
            DocumentFormat::Pptx
        );
        // Container contents win over a misleading name.
        assert_eq!(
            resolve_format(None, &book, Path::new("deck.pptx")).unwrap(),
            DocumentFormat::Xlsx
        );
        // Name is the last resort.
        assert_eq!(
            resolve_format(None, b"garbage", Path::new("deck.PPTX")).unwrap(),
            DocumentFormat::Pptx
        );
        assert!(resolve_format(None, b"garbage", Path::new("notes.txt")).is_err());
    }

    #[test]
    fn test_failed_file_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.xlsx");
        let good = dir.path().join("税金.xlsx");
        std::fs::write(&broken, b"not a workbook").unwrap();
        std::fs::write(&good, workbook()).unwrap();
        let out = dir.path().join("out");

        let args = Args::parse_from([
            OsString::from("xlate"),
            OsString::from("--dry-run"),
            OsString::from("-o"),
            out.clone().into_os_string(),
            broken.clone().into_os_string(),
            good.clone().into_os_string(),
        ]);
        let languages = LanguagePair::new(&args.source, &args.target).unwrap();
        let (reports, failed) = translate_all(&args, None, &dry_run_service(), &languages);

        assert_eq!(failed, 1);
        assert_eq!(reports.len(), 2);
        assert!(reports[0].error.is_some());
        assert!(!out.join("translated_broken.xlsx").exists());

        let written = std::fs::read(out.join("translated_税金.xlsx")).unwrap();
        let book = XlsxParser::new()
            .parse(xlate_core::Package::from_bytes(written).unwrap())
            .unwrap();
        assert_eq!(
            book.string_at("Sheet1", CellRef::new(1, 1)).as_deref(),
            Some("税金 [en]")
        );
        assert_eq!(reports[1].report.as_ref().map(|r| r.translated), Some(1));
    }
}
