use std::{
    io,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

/// Replace `path` with `bytes` via a sibling temp file and a rename, so a
/// crash mid-write never leaves a truncated file behind.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    tokio::fs::create_dir_all(parent).await?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|v| v.to_str()).unwrap_or("file"),
        nanos
    ));

    tokio::fs::write(&tmp_path, bytes).await?;
    if let Err(err) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err);
    }
    Ok(())
}
