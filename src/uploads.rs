//! On-disk storage for post attachments.
//!
//! Files land in the configured uploads directory as `<stem><millis><.ext>`,
//! so two uploads of `notes.txt` never overwrite each other.

use std::io::ErrorKind;
use std::path::Path;

use chrono::Utc;
use tokio::io::AsyncWriteExt;

const MAX_NAME_ATTEMPTS: i64 = 16;

/// Reduce a client-supplied file name to a bare, printable file name.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `notes.txt` + 1700000000000 -> `notes1700000000000.txt`
pub fn stored_file_name(original: &str, millis: i64) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(original);

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}{millis}.{ext}"),
        None => format!("{stem}{millis}"),
    }
}

/// Write `bytes` under a fresh timestamped name and return that name.
///
/// `original` must already be sanitized.
pub async fn save_upload(dir: &Path, original: &str, bytes: &[u8]) -> std::io::Result<String> {
    tokio::fs::create_dir_all(dir).await?;

    let mut millis = Utc::now().timestamp_millis();
    for _ in 0..MAX_NAME_ATTEMPTS {
        let name = stored_file_name(original, millis);
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&name))
            .await;

        match opened {
            Ok(mut file) => {
                file.write_all(bytes).await?;
                file.flush().await?;
                return Ok(name);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => millis += 1,
            Err(e) => return Err(e),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free stored name for {original}"),
    ))
}

/// Best-effort delete of a stored upload.
pub async fn remove_upload(dir: &Path, stored: &str) {
    if let Err(e) = tokio::fs::remove_file(dir.join(stored)).await {
        tracing::warn!("Could not remove upload {}: {}", stored, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_name_puts_timestamp_before_extension() {
        assert_eq!(
            stored_file_name("notes.txt", 1700000000000),
            "notes1700000000000.txt"
        );
        assert_eq!(
            stored_file_name("archive.tar.gz", 5),
            "archive.tar5.gz"
        );
    }

    #[test]
    fn stored_name_without_extension() {
        assert_eq!(stored_file_name("README", 42), "README42");
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("plain.txt"), "plain.txt");
    }

    #[test]
    fn sanitize_falls_back_for_empty_names() {
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name("dir/"), "upload");
        assert_eq!(sanitize_file_name("\u{0}\u{7}"), "upload");
    }

    #[test]
    fn sanitize_keeps_non_ascii() {
        assert_eq!(sanitize_file_name("사진.png"), "사진.png");
    }

    #[tokio::test]
    async fn save_upload_writes_bytes_under_new_name() {
        let tmp = tempfile::tempdir().unwrap();
        let name = save_upload(tmp.path(), "notes.txt", b"hello").await.unwrap();

        assert!(name.starts_with("notes"));
        assert!(name.ends_with(".txt"));
        assert_ne!(name, "notes.txt");
        let written = tokio::fs::read(tmp.path().join(&name)).await.unwrap();
        assert_eq!(written, b"hello");
    }

    #[tokio::test]
    async fn save_upload_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let a = save_upload(tmp.path(), "same.txt", b"a").await.unwrap();
        let b = save_upload(tmp.path(), "same.txt", b"b").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(tokio::fs::read(tmp.path().join(&a)).await.unwrap(), b"a");
        assert_eq!(tokio::fs::read(tmp.path().join(&b)).await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn remove_upload_deletes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let name = save_upload(tmp.path(), "gone.bin", b"x").await.unwrap();
        remove_upload(tmp.path(), &name).await;
        assert!(!tmp.path().join(&name).exists());
    }
}
