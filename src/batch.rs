use std::fs::DirEntry;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::Settings;
use crate::debug_log::DebugLog;
use crate::error::ExtractError;
use crate::parser::events::{Observer, Recorder, Trace};
use crate::parser::model::DocumentRecord;
use crate::parser::process_document;
use crate::source;

const CHUNK: usize = 64;

pub struct FileFailure {
    pub path: PathBuf,
    pub error: ExtractError,
}

#[derive(Default)]
pub struct BatchReport {
    /// In file-name order.
    pub records: Vec<DocumentRecord>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn line_items(&self) -> usize {
        self.records.iter().map(|r| r.line_items.len()).sum()
    }

    pub fn documents_with_items(&self) -> usize {
        self.records.iter().filter(|r| !r.line_items.is_empty()).count()
    }
}

struct FileOutcome {
    path: PathBuf,
    result: Result<DocumentRecord, ExtractError>,
    log: Vec<String>,
}

/// Eligible files directly inside the input directory, sorted by name.
pub fn discover(settings: &Settings) -> Result<Vec<PathBuf>> {
    let dir = &settings.input_dir;
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading input directory {}", dir.display()))?
        .filter_map(|entry| entry_path(dir, entry))
        .filter(|p| p.is_file() && settings.accepts(p))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn entry_path(dir: &Path, entry: std::io::Result<DirEntry>) -> Option<PathBuf> {
    match entry {
        Ok(entry) => Some(entry.path()),
        Err(e) => {
            warn!("skipping unreadable entry in {}: {}", dir.display(), e);
            None
        }
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load one file's pages and extract its record.
pub fn extract_file(path: &Path, observer: &dyn Observer) -> Result<DocumentRecord, ExtractError> {
    let pages = source::load_pages(path)?;
    Ok(process_document(&file_name(path), &pages, observer))
}

fn process_file(path: &Path, record_events: bool) -> FileOutcome {
    let recorder = Recorder::new();
    let result = if record_events {
        recorder.note(format!("########## {} ##########", file_name(path)));
        extract_file(path, &(&recorder, Trace))
    } else {
        extract_file(path, &Trace)
    };
    let mut log = recorder.into_messages();
    if let Err(e) = &result {
        if record_events {
            log.push(format!("Error processing {}: {}", path.display(), e));
        }
    }
    FileOutcome {
        path: path.to_path_buf(),
        result,
        log,
    }
}

/// Extract every file in parallel. Output order follows `files`.
pub fn run(
    settings: &Settings,
    files: &[PathBuf],
    log: Option<&DebugLog>,
    progress: &ProgressBar,
) -> Result<BatchReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.jobs)
        .build()
        .context("building worker pool")?;

    let mut report = BatchReport::default();
    for chunk in files.chunks(CHUNK) {
        let outcomes: Vec<FileOutcome> = pool.install(|| {
            chunk
                .par_iter()
                .map(|p| process_file(p, log.is_some()))
                .collect()
        });

        for outcome in outcomes {
            if let Some(log) = log {
                log.append(&outcome.log)
                    .context("writing debug log")?;
            }
            match outcome.result {
                Ok(record) => {
                    info!(
                        file = %record.source_file,
                        line_items = record.line_items.len(),
                        "extracted"
                    );
                    report.records.push(record);
                }
                Err(error) => {
                    warn!("{}: {}", outcome.path.display(), error);
                    report.failures.push(FileFailure {
                        path: outcome.path,
                        error,
                    });
                }
            }
            progress.inc(1);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &Path) -> Settings {
        Settings {
            input_dir: dir.to_path_buf(),
            output: dir.join("output.csv"),
            debug: false,
            debug_log: dir.join("debug_log.txt"),
            extensions: vec!["txt".into()],
            jobs: 2,
        }
    }

    fn write(dir: &Path, name: &str, text: &str) {
        std::fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn discovery_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.txt", "");
        write(dir.path(), "A.TXT", "");
        write(dir.path(), "c.pdf", "");
        std::fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let files = discover(&settings(dir.path())).unwrap();
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["A.TXT", "b.txt"]);
    }

    #[test]
    fn unreadable_entry_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(entry_path(dir.path(), Err(err)), None);

        write(dir.path(), "a.txt", "");
        let entry = std::fs::read_dir(dir.path()).unwrap().next().unwrap();
        assert_eq!(entry_path(dir.path(), entry), Some(dir.path().join("a.txt")));
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(&dir.path().join("nope"));
        assert!(discover(&s).is_err());
    }

    #[test]
    fn runs_batch_with_failures_reported() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = std::fs::read_to_string("tests/fixtures/contract.txt").unwrap();
        write(dir.path(), "1-contract.txt", &fixture);
        write(dir.path(), "2-empty.txt", "cover letter only");

        let mut s = settings(dir.path());
        s.extensions.push("pdf".into());
        write(dir.path(), "3-broken.pdf", "garbage");

        let files = discover(&s).unwrap();
        assert_eq!(files.len(), 3);

        let log = DebugLog::create(&s.debug_log).unwrap();
        let report = run(&s, &files, Some(&log), &ProgressBar::hidden()).unwrap();
        log.flush().unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].source_file, "1-contract.txt");
        assert_eq!(report.records[1].source_file, "2-empty.txt");
        assert_eq!(report.line_items(), 5);
        assert_eq!(report.documents_with_items(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, ExtractError::Pdf { .. }));

        let text = std::fs::read_to_string(&s.debug_log).unwrap();
        let first = text.find("########## 1-contract.txt").unwrap();
        let second = text.find("########## 2-empty.txt").unwrap();
        assert!(first < second);
        assert!(text.contains("Extracted PR Number: RCS-2024-0417"));
        assert!(text.contains("Error processing"));
    }

    #[test]
    fn no_log_no_messages() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "ITEM NO.\n0001 Widget 1 EA $1.00\nQty");
        let outcome = process_file(&dir.path().join("a.txt"), false);
        assert!(outcome.log.is_empty());
        assert_eq!(outcome.result.unwrap().line_items.len(), 1);
    }
}
