use anyhow::Result;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "pathshala";

/// Returns the application data directory.
/// Uses `dirs::data_dir()` + "pathshala" (e.g. %APPDATA%/pathshala or ~/.local/share/pathshala).
/// Creates the directory if it doesn't exist.
pub fn get_data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| std::env::var_os("APPDATA").map(PathBuf::from))
        .or_else(|| std::env::var_os("LOCALAPPDATA").map(PathBuf::from))
        .unwrap_or_else(std::env::temp_dir);

    ensure_dir(base.join(APP_DIR))
}

/// The configured override if any, otherwise [`get_data_dir`].
pub fn resolve_data_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    match override_dir {
        Some(dir) => ensure_dir(dir.to_path_buf()),
        None => get_data_dir(),
    }
}

pub fn settings_file(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

pub fn env_file(data_dir: &Path) -> PathBuf {
    data_dir.join(".env")
}

/// Where generated audio and diagrams land.
pub fn output_dir(data_dir: &Path) -> Result<PathBuf> {
    ensure_dir(data_dir.join("output"))
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    if !path.exists() {
        std::fs::create_dir_all(&path)?;
    }
    Ok(path)
}
