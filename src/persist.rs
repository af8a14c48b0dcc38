//! Disk I/O helpers: load from file and atomic write.
//!
//! The rename-over approach is close to atomic on most platforms. On FAT32 or
//! network shares there are no hard guarantees.

use crate::error::{Error, Result};
use crate::serializer::Serializer;
use serde_json::{Map, Value};
use std::path::Path;

/// Reads and deserializes the file at `path`. Returns an empty map if the file
/// is missing or empty (not an error). Never creates the file.
pub fn load(path: &Path, serializer: &dyn Serializer) -> Result<Map<String, Value>> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "config file absent, starting empty");
            return Ok(Map::new());
        }
        Err(e) => return Err(Error::Io(e.to_string())),
    };
    let text = String::from_utf8(bytes)
        .map_err(|e| Error::Deserialize(format!("config file is not valid UTF-8: {e}")))?;
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    serializer.deserialize(&text)
}

/// Write `bytes` to `<path>.tmp` and then rename over `path`. This avoids
/// leaving a half-written file if the process crashes mid-write.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => path.with_extension(format!("{ext}.tmp")),
        None => {
            let mut name = path.file_name().unwrap_or_default().to_os_string();
            name.push(".tmp");
            path.with_file_name(name)
        }
    };
    std::fs::write(&tmp, bytes).map_err(|e| Error::Io(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| Error::Io(e.to_string()))?;
    Ok(())
}
