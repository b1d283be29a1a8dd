//! Utility functions for string manipulation and file system operations.
//!
//! - String truncation and slugification for logging and file names
//! - Atomic JSON persistence shared by the record store, history and manifest
//! - File system validation for output directories

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fs as stdfs;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (backing off to a character
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Convert a base name into a filesystem-safe slug.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single hyphen and trims hyphens from both ends. An input with nothing
/// usable left becomes `"post"`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Daily AI News 2024"), "daily-ai-news-2024");
/// assert_eq!(slugify("日本語"), "post");
/// ```
pub fn slugify(base: &str) -> String {
    let mut slug = String::with_capacity(base.len());
    let mut pending_hyphen = false;
    for c in base.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    if slug.is_empty() {
        "post".to_string()
    } else {
        slug
    }
}

/// Read a JSON file, treating a missing or malformed file as the default value.
///
/// A corrupted file is logged and replaced by `T::default()`; the next save
/// overwrites it. Only unexpected I/O errors (permissions, etc.) propagate.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn read_json_or_default<T>(path: &Path) -> Result<T, Box<dyn Error>>
where
    T: DeserializeOwned + Default,
{
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("File does not exist yet; starting empty");
            return Ok(T::default());
        }
        Err(e) => return Err(Box::new(e)),
    };

    match serde_json::from_str::<T>(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(
                error = %e,
                preview = %truncate_for_log(&raw, 120),
                "Persisted JSON is malformed; treating it as empty"
            );
            Ok(T::default())
        }
    }
}

/// Serialize `value` as pretty JSON and replace `path` atomically.
///
/// The data goes to a `.tmp` sibling first and is then renamed over the
/// target, so readers observe either the previous or the new file.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn write_json_atomic<T>(path: &Path, value: &T) -> Result<(), Box<dyn Error>>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let raw = serde_json::to_vec_pretty(value)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, raw).await?;
    if let Err(e) = fs::rename(tmp_path, path).await {
        let _ = fs::remove_file(tmp_path).await;
        return Err(Box::new(e));
    }
    debug!("Replaced file atomically");
    Ok(())
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // Each kana is three bytes; a cut at byte 4 must back off to 3.
        let result = truncate_for_log("あいう", 4);
        assert!(result.starts_with("あ…"));
        assert!(result.contains("(+6 bytes)"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Daily AI News 2024"), "daily-ai-news-2024");
        assert_eq!(slugify("daily-ai-news-20240101-120000"), "daily-ai-news-20240101-120000");
        assert_eq!(slugify("--Hello!!  World--"), "hello-world");
        assert_eq!(slugify("日本語"), "post");
        assert_eq!(slugify(""), "post");
    }

    #[tokio::test]
    async fn test_read_json_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let value: Vec<String> = read_json_or_default(&dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn test_read_json_malformed_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[\"a\", ").unwrap();
        let value: Vec<String> = read_json_or_default(&path).await.unwrap();
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn test_write_json_atomic_round_trip_and_no_tmp_left() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");
        write_json_atomic(&path, &vec!["x".to_string(), "y".to_string()])
            .await
            .unwrap();

        let value: Vec<String> = read_json_or_default(&path).await.unwrap();
        assert_eq!(value, vec!["x", "y"]);
        assert!(!dir.path().join("nested").join("data.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("post");
        ensure_writable_dir(&target).await.unwrap();
        assert!(target.is_dir());
        assert!(!target.join("..__probe_write__").exists());
    }
}
