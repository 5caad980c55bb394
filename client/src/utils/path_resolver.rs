use anyhow::Result;
use std::path::PathBuf;

const LOG_DIR_ENV: &str = "MEGAMAIL_LOG_DIR";

/// Resolve log folder (absolute path), creating it if needed.
///
/// Order: explicit override, `$MEGAMAIL_LOG_DIR`, the platform data dir, then `./megamail-logs`.
pub fn resolve_log_folder(explicit: Option<&str>) -> Result<PathBuf> {
    let from_env = std::env::var(LOG_DIR_ENV).ok().filter(|v| !v.trim().is_empty());

    let dir = explicit
        .map(PathBuf::from)
        .or_else(|| from_env.map(PathBuf::from))
        .or_else(|| dirs::data_local_dir().map(|d| d.join("megamail").join("logs")))
        .unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("megamail-logs")
        });

    std::fs::create_dir_all(&dir)
        .map_err(|e| anyhow::anyhow!("Failed to create log folder {:?}: {}", dir, e))?;
    Ok(dir)
}

/// Default location of the optional settings file.
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("megamail").join("config.toml"))
}
