//! Codebase model: a typed representation of the input to a validation
//! task — files, detected languages, provenance, and derived statistics.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::errors::{Result, ValidationError};

/// How a [`Codebase`]'s files were obtained. Every variant is a black box
/// emitting an in-memory file list; the orchestrator never reaches into the
/// network/VCS/archive machinery itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodebaseSource {
    /// Cloned from a remote VCS.
    Git {
        /// Clone URL.
        url: String,
        /// Branch to check out, if any.
        branch: Option<String>,
        /// Commit to check out, if any.
        commit: Option<String>,
        /// Tag to check out, if any.
        tag: Option<String>,
        /// Clone depth (0 = full history).
        depth: u32,
        /// Whether to recurse into submodules.
        submodules: bool,
    },
    /// Downloaded from a remote archive.
    Archive {
        /// Archive URL.
        url: String,
        /// Archive format.
        format: ArchiveFormat,
        /// Expected sha256 digest, if the caller pinned one.
        sha256: Option<String>,
    },
    /// Previously uploaded blob.
    Upload {
        /// Original filename.
        filename: String,
        /// Size in bytes.
        size: u64,
        /// MIME type.
        mime: String,
        /// Content hash of the blob.
        content_hash: String,
    },
    /// Raw files supplied inline, in memory.
    Inline,
}

/// Supported archive formats for [`CodebaseSource::Archive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarZst,
}

/// File-class tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileClass {
    Source,
    Test,
    Config,
    Documentation,
    Build,
    Asset,
    Data,
    Other,
}

/// A single file inside a [`Codebase`]. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    /// Relative, POSIX-separated path, unique within the codebase.
    pub path: String,
    /// Raw byte content.
    pub content: Vec<u8>,
    /// Size in bytes (always `content.len()`).
    pub size: u64,
    /// Content hash (sha256, hex-encoded).
    pub content_hash: String,
    /// Detected language, if any.
    pub language: Option<String>,
    /// File-class tag.
    pub class: FileClass,
    /// Whether this file is binary (not valid UTF-8, or a known binary extension).
    pub binary: bool,
    /// Whether this file is a test file (path contains "test", case-insensitive).
    pub is_test: bool,
    /// Number of lines in the file (0 for binary files).
    pub line_count: usize,
}

impl File {
    /// Construct a `File` from a path and raw bytes, running detection once.
    pub fn new(path: impl Into<String>, content: Vec<u8>) -> Result<Self> {
        let path = path.into();
        if path.is_empty() {
            return Err(ValidationError::invalid_codebase("file path must not be empty"));
        }
        let path = path.replace('\\', "/");

        let size = content.len() as u64;
        let content_hash = hex_sha256(&content);
        let binary = is_binary(&path, &content);
        let language = if binary { None } else { detect_language(&path) };
        let line_count = if binary {
            0
        } else {
            String::from_utf8_lossy(&content).lines().count()
        };
        let is_test = path.to_ascii_lowercase().contains("test");
        let class = classify(&path, is_test);

        Ok(Self {
            path,
            content,
            size,
            content_hash,
            language,
            class,
            binary,
            is_test,
            line_count,
        })
    }

    /// Lossily decode the file content as UTF-8 text.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

const BINARY_EXTENSIONS: &[&str] = &[
    "zip", "tar", "gz", "bz2", "xz", "7z", "rar", "png", "jpg", "jpeg", "gif", "bmp", "ico",
    "webp", "mp3", "mp4", "avi", "wav", "mov", "mkv", "pdf", "doc", "docx", "xls", "xlsx", "exe",
    "dll", "so", "dylib", "bin", "woff", "woff2", "ttf", "class", "jar", "wasm",
];

fn is_binary(path: &str, content: &[u8]) -> bool {
    if let Some(ext) = path.rsplit('.').next() {
        if BINARY_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            return true;
        }
    }
    let sample = &content[..content.len().min(1024)];
    if sample.is_empty() {
        return false;
    }
    let null_count = sample.iter().filter(|&&b| b == 0).count();
    (null_count as f64 / sample.len() as f64) > 0.01
}

/// Closed, extension-driven language detection table. A handful
/// of extensionless filenames are also recognized.
const LANGUAGE_EXTENSIONS: &[(&str, &[&str])] = &[
    ("go", &["go"]),
    ("python", &["py", "pyi"]),
    ("javascript", &["js", "jsx", "mjs", "cjs"]),
    ("typescript", &["ts", "tsx", "cts", "mts"]),
    ("rust", &["rs"]),
    ("java", &["java"]),
    ("c", &["c", "h"]),
    ("cpp", &["cpp", "cxx", "cc", "hpp", "hh"]),
    ("csharp", &["cs"]),
    ("ruby", &["rb"]),
    ("php", &["php"]),
    ("yaml", &["yaml", "yml"]),
    ("json", &["json"]),
    ("markdown", &["md", "markdown"]),
    ("shell", &["sh", "bash"]),
    ("html", &["html", "htm"]),
    ("css", &["css", "scss"]),
    ("sql", &["sql"]),
    ("toml", &["toml"]),
];

const EXTENSIONLESS_LANGUAGES: &[(&str, &str)] = &[
    ("Dockerfile", "docker"),
    ("Makefile", "makefile"),
];

fn detect_language(path: &str) -> Option<String> {
    let filename = path.rsplit('/').next().unwrap_or(path);
    for (name, lang) in EXTENSIONLESS_LANGUAGES {
        if filename == *name {
            return Some((*lang).to_string());
        }
    }
    let ext = filename.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase())?;
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(_, exts)| exts.iter().any(|e| *e == ext))
        .map(|(lang, _)| (*lang).to_string())
}

fn classify(path: &str, is_test: bool) -> FileClass {
    let lower = path.to_ascii_lowercase();
    if is_test {
        return FileClass::Test;
    }
    let filename = lower.rsplit('/').next().unwrap_or(&lower);
    let ext = filename.rsplit_once('.').map(|(_, e)| e);

    if matches!(
        filename,
        "dockerfile" | "makefile" | ".gitlab-ci.yml" | "jenkinsfile"
    ) || matches!(ext, Some("toml") | Some("lock"))
        || lower.contains("cargo.toml")
        || lower.contains("package.json")
    {
        return FileClass::Build;
    }
    if matches!(ext, Some("yaml") | Some("yml") | Some("ini") | Some("env")) || filename.starts_with('.') {
        return FileClass::Config;
    }
    if matches!(ext, Some("md") | Some("markdown") | Some("rst") | Some("txt")) {
        return FileClass::Documentation;
    }
    if matches!(
        ext,
        Some("png") | Some("jpg") | Some("jpeg") | Some("gif") | Some("svg") | Some("ico")
    ) {
        return FileClass::Asset;
    }
    if matches!(ext, Some("json") | Some("csv") | Some("sql")) {
        return FileClass::Data;
    }
    if LANGUAGE_EXTENSIONS
        .iter()
        .any(|(_, exts)| ext.is_some_and(|e| exts.contains(&e)))
    {
        return FileClass::Source;
    }
    FileClass::Other
}

/// Aggregate statistics derived from a [`Codebase`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebaseStats {
    /// Total number of files.
    pub total_files: usize,
    /// Total bytes across all files.
    pub total_bytes: u64,
    /// Total line count across all non-binary files.
    pub total_lines: usize,
    /// File count per detected language.
    pub per_language: HashMap<String, usize>,
    /// Path of the largest file by byte size, if any.
    pub largest_file: Option<String>,
    /// Blank / comment-prefixed / code line counts, crudely classified.
    pub blank_lines: usize,
    pub comment_lines: usize,
    pub code_lines: usize,
}

/// Typed representation of a codebase submitted for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Codebase {
    /// Stable identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Provenance of the files.
    pub source: CodebaseSource,
    /// Ordered sequence of files.
    pub files: Vec<File>,
    /// Derived set of detected languages (union of per-file languages).
    pub languages: HashSet<String>,
    /// Construction timestamp.
    pub created_at: DateTime<Utc>,
    /// Opaque metadata.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Codebase {
    /// Create a new, empty codebase. Call [`Codebase::add_file`] to populate
    /// it, then [`Codebase::validate`] before use.
    pub fn new(id: impl Into<String>, name: impl Into<String>, source: CodebaseSource) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source,
            files: Vec::new(),
            languages: HashSet::new(),
            created_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Append a file, updating the derived language set. Rejects duplicate
    /// paths to preserve path uniqueness within the codebase.
    pub fn add_file(&mut self, file: File) -> Result<()> {
        if self.files.iter().any(|f| f.path == file.path) {
            return Err(ValidationError::invalid_codebase(format!(
                "duplicate file path: {}",
                file.path
            )));
        }
        if let Some(lang) = &file.language {
            self.languages.insert(lang.clone());
        }
        self.files.push(file);
        Ok(())
    }

    /// Recompute the derived language set from scratch. Idempotent; primarily
    /// useful after bulk-loading files without going through `add_file`.
    pub fn detect_languages(&mut self) {
        self.languages = self
            .files
            .iter()
            .filter_map(|f| f.language.clone())
            .collect();
    }

    /// All files whose detected language matches `lang`.
    pub fn files_by_language<'a>(&'a self, lang: &'a str) -> impl Iterator<Item = &'a File> {
        self.files
            .iter()
            .filter(move |f| f.language.as_deref() == Some(lang))
    }

    /// All files tagged with the given [`FileClass`].
    pub fn files_by_class(&self, class: FileClass) -> impl Iterator<Item = &File> {
        self.files.iter().filter(move |f| f.class == class)
    }

    /// Enforce structural invariants: non-empty, unique paths, no path
    /// escaping the codebase root.
    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(ValidationError::invalid_codebase(
                "codebase must contain at least one file",
            ));
        }
        let mut seen = HashSet::new();
        for file in &self.files {
            if file.path.is_empty() {
                return Err(ValidationError::invalid_codebase("file path must not be empty"));
            }
            if file.path.starts_with('/') {
                return Err(ValidationError::invalid_codebase(format!(
                    "file path must be relative: {}",
                    file.path
                )));
            }
            if !seen.insert(file.path.as_str()) {
                return Err(ValidationError::invalid_codebase(format!(
                    "duplicate file path: {}",
                    file.path
                )));
            }
        }
        let expected_languages: HashSet<String> = self
            .files
            .iter()
            .filter_map(|f| f.language.clone())
            .collect();
        if expected_languages != self.languages {
            return Err(ValidationError::invalid_codebase(
                "language set does not match union of per-file languages",
            ));
        }
        Ok(())
    }

    /// Walk a local directory into an inline [`Codebase`], skipping anything
    /// `ignore`'s walker excludes (`.gitignore`, hidden files, `.git/`).
    pub fn from_directory(root: impl AsRef<std::path::Path>, name: impl Into<String>) -> Result<Self> {
        let root = root.as_ref();
        let mut codebase = Self::new(Uuid::new_v4().to_string(), name, CodebaseSource::Inline);
        for entry in ignore::Walk::new(root) {
            let entry = entry.map_err(|e| {
                ValidationError::io(e.to_string(), std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            })?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            let content = std::fs::read(entry.path())?;
            codebase.add_file(File::new(relative, content)?)?;
        }
        Ok(codebase)
    }

    /// Compute aggregate statistics over the codebase's files.
    pub fn stats(&self) -> CodebaseStats {
        let mut per_language: HashMap<String, usize> = HashMap::new();
        let mut largest_file: Option<(&str, u64)> = None;
        let mut total_bytes = 0u64;
        let mut total_lines = 0usize;
        let mut blank_lines = 0usize;
        let mut comment_lines = 0usize;
        let mut code_lines = 0usize;

        for file in &self.files {
            total_bytes += file.size;
            total_lines += file.line_count;
            if let Some(lang) = &file.language {
                *per_language.entry(lang.clone()).or_insert(0) += 1;
            }
            match largest_file {
                Some((_, size)) if size >= file.size => {}
                _ => largest_file = Some((&file.path, file.size)),
            }
            if file.binary {
                continue;
            }
            for line in file.text().lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    blank_lines += 1;
                } else if trimmed.starts_with("//")
                    || trimmed.starts_with('#')
                    || trimmed.starts_with("/*")
                {
                    comment_lines += 1;
                } else {
                    code_lines += 1;
                }
            }
        }

        CodebaseStats {
            total_files: self.files.len(),
            total_bytes,
            total_lines,
            per_language,
            largest_file: largest_file.map(|(p, _)| p.to_string()),
            blank_lines,
            comment_lines,
            code_lines,
        }
    }
}
