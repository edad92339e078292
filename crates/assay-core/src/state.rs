use crate::errors::ConfigError;
use nix::fcntl::{Flock, FlockArg};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn acquire_lock(path: &Path) -> Result<Flock<std::fs::File>, ConfigError> {
    let lock_path = lock_path_for(path);
    if let Some(parent) = lock_path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| ConfigError::PathIo {
            path: lock_path.clone(),
            source: e,
        })?;

    Flock::lock(lock_file, FlockArg::LockExclusive).map_err(|(_, errno)| {
        ConfigError::StateLock {
            path: lock_path,
            reason: errno.to_string(),
        }
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    match fs_err::read_to_string(path) {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::Io(e)),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let tmp_path = path.with_extension("json.tmp");
    fs_err::write(&tmp_path, serde_json::to_vec_pretty(value)?)?;
    fs_err::rename(&tmp_path, path)?;
    Ok(())
}

/// Runs `f` on the decoded contents of `path` while holding an exclusive
/// lock, then persists the value `f` left behind.
///
/// `f` sees `None` when the file does not exist yet. If `f` fails nothing is
/// written.
pub fn with_locked_json<T, R, E, F>(path: &Path, f: F) -> Result<R, E>
where
    T: Serialize + DeserializeOwned,
    E: From<ConfigError>,
    F: FnOnce(&mut Option<T>) -> Result<R, E>,
{
    let _lock = acquire_lock(path)?;
    let original: Option<T> = read_json(path)?;
    let existed = original.is_some();
    let mut value = original;

    let result = f(&mut value)?;

    match &value {
        Some(value) => write_json(path, value)?,
        None if existed => fs_err::remove_file(path).map_err(ConfigError::Io)?,
        None => {}
    }
    Ok(result)
}
