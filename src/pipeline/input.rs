//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! Tesseract, the image decoder, and the spreadsheet reader all want a
//! file-system path, so URLs are downloaded into a `TempDir` that is removed
//! when [`ResolvedInput`] is dropped. The source kind is decided from the
//! file extension, and images are checked against their magic bytes so a
//! mislabelled file fails here with a clear message instead of deep inside
//! OCR.

use crate::error::ExtractionError;
use crate::output::SourceKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PNG_MAGIC: [u8; 4] = [0x89, b'P', b'N', b'G'];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// The resolved input: a local path (possibly inside a temp dir) and its kind.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local { path: PathBuf, kind: SourceKind },
    /// Input was a URL; the file lives in a temp directory kept alive here.
    Downloaded {
        path: PathBuf,
        kind: SourceKind,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } => path,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ResolvedInput::Local { kind, .. } => *kind,
            ResolvedInput::Downloaded { kind, .. } => *kind,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Classify a path by extension (case-insensitive).
pub fn source_kind(path: &Path) -> Result<SourceKind, ExtractionError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "png" | "jpg" | "jpeg" => Ok(SourceKind::Image),
        "csv" => Ok(SourceKind::Csv),
        "xlsx" | "xlsm" | "xls" | "ods" => Ok(SourceKind::Spreadsheet),
        "txt" => Ok(SourceKind::Text),
        _ => Err(ExtractionError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        }),
    }
}

/// Resolve the input string to a local file path and source kind.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractionError> {
    if input.trim().is_empty() {
        return Err(ExtractionError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence, readability and format.
pub fn resolve_local(path_str: &str) -> Result<ResolvedInput, ExtractionError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ExtractionError::FileNotFound { path });
    }

    let kind = source_kind(&path)?;

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            if kind == SourceKind::Image {
                use std::io::Read;
                let mut magic = [0u8; 4];
                if f.read_exact(&mut magic).is_ok() {
                    check_image_magic(&path, &magic)?;
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractionError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ExtractionError::FileNotFound { path });
        }
    }

    debug!("Resolved local {:?} input: {}", kind, path.display());
    Ok(ResolvedInput::Local { path, kind })
}

fn check_image_magic(path: &Path, magic: &[u8; 4]) -> Result<(), ExtractionError> {
    let is_png_name = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));

    let (ok, expected) = if is_png_name {
        (*magic == PNG_MAGIC, "PNG")
    } else {
        (magic[..3] == JPEG_MAGIC, "JPEG")
    };

    if ok {
        Ok(())
    } else {
        Err(ExtractionError::NotAnImage {
            path: path.to_path_buf(),
            expected,
            magic: *magic,
        })
    }
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractionError> {
    info!("Downloading menu from: {}", url);

    let filename = extract_filename(url);
    // Classify before downloading so unsupported URLs fail fast.
    let kind = source_kind(Path::new(&filename))?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractionError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractionError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ExtractionError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ExtractionError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractionError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let temp_dir = TempDir::new().map_err(|e| ExtractionError::Io {
        path: std::env::temp_dir(),
        source: e,
    })?;
    let file_path = temp_dir.path().join(&filename);

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ExtractionError::Io {
            path: file_path.clone(),
            source: e,
        })?;

    if kind == SourceKind::Image && bytes.len() >= 4 {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        check_image_magic(&file_path, &magic)?;
    }

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        kind,
        _temp_dir: temp_dir,
    })
}

/// Last URL path segment when it looks like a file name, else `download.png`.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "download.png".to_string()
}
