use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

mod charset;
mod opcodes;

pub mod msg;
pub mod text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Extract,
    Insert,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashTextSettings {
    pub mode: Mode,
    pub target: PathBuf,
    pub debug: bool,
}

#[derive(Debug, Error)]
pub enum DashTextError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("format error: {0}")]
    Format(String),
    #[error("text codec error: {0}")]
    Text(#[from] text::TextCodecError),
    #[error("rebuilt MSG entry is {new_size} bytes but the allocation is {limit} bytes")]
    EntryOverflow { new_size: usize, limit: usize },
    #[error("edited text holds {found} blocks but the pointer table expects {expected}")]
    BlockCountMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, DashTextError>;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub enum FileOutcome {
    Extracted(ExtractSummary),
    Inserted(InsertSummary),
    SkippedMissingText { text_path: PathBuf },
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractSummary {
    pub blocks: usize,
    pub text_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertSummary {
    pub blocks: usize,
    pub payload_bytes: usize,
    pub padding_bytes: usize,
}

fn is_msg_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("msg"))
        .unwrap_or(false)
}

/// The editable artifact sits next to its MSG file as `NAME.MSG.txt`.
fn text_artifact_path(msg_path: &Path) -> PathBuf {
    let mut name = msg_path.as_os_str().to_os_string();
    name.push(".txt");
    PathBuf::from(name)
}

/// Decode one MSG file and write its text artifact next to it.
pub fn extract_file(msg_path: &Path) -> Result<ExtractSummary> {
    let raw = fs::read(msg_path)?;
    let layout = msg::parse_msg_layout(&raw)?;
    let artifact = msg::extract_to_string(&raw)?;

    let text_path = text_artifact_path(msg_path);
    fs::write(&text_path, artifact)?;
    Ok(ExtractSummary {
        blocks: layout.spans.len(),
        text_path,
    })
}

/// Rebuild one MSG file in place from its edited text artifact. Nothing is
/// written unless the whole rebuild succeeds.
pub fn insert_file(msg_path: &Path, text_path: &Path) -> Result<InsertSummary> {
    let raw = fs::read(msg_path)?;
    let artifact = fs::read_to_string(text_path)?;
    let rebuilt = msg::insert_from_str(&raw, &artifact)?;

    let layout = msg::parse_msg_layout(&rebuilt)?;
    let payload_bytes = layout.payload_len - layout.table.len() * 2;
    let padding_bytes = rebuilt.len() - msg::HEADER_SIZE - layout.payload_len;
    fs::write(msg_path, &rebuilt)?;
    Ok(InsertSummary {
        blocks: layout.spans.len(),
        payload_bytes,
        padding_bytes,
    })
}

fn process_file(settings: &DashTextSettings, path: PathBuf) -> Result<FileReport> {
    let outcome = match settings.mode {
        Mode::Extract => FileOutcome::Extracted(extract_file(&path)?),
        Mode::Insert => {
            let text_path = text_artifact_path(&path);
            if text_path.exists() {
                FileOutcome::Inserted(insert_file(&path, &text_path)?)
            } else {
                FileOutcome::SkippedMissingText { text_path }
            }
        }
    };
    Ok(FileReport { path, outcome })
}

pub fn run(settings: DashTextSettings) -> Result<RunReport> {
    if !settings.target.exists() {
        return Err(DashTextError::Format(format!(
            "Target path does not exist: {}",
            settings.target.display()
        )));
    }

    let mut files = Vec::new();
    if settings.target.is_file() {
        files.push(process_file(&settings, settings.target.clone())?);
    } else {
        // Sorted so reports are stable across directory iteration orders.
        let mut msg_paths = Vec::new();
        for entry in WalkDir::new(&settings.target) {
            let entry = entry.map_err(|e| DashTextError::Io(e.into()))?;
            if entry.file_type().is_file() && is_msg_file(entry.path()) {
                msg_paths.push(entry.into_path());
            }
        }
        msg_paths.sort();
        for path in msg_paths {
            files.push(process_file(&settings, path)?);
        }
    }

    let report = RunReport { files };
    if settings.debug {
        let report_root = if settings.target.is_dir() {
            settings.target.clone()
        } else {
            settings
                .target
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| DashTextError::Format(format!("cannot serialize run report: {e}")))?;
        fs::write(report_root.join("dashtext_report.json"), json)?;
    }
    Ok(report)
}
