use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use super::errors::InstallError;

/// File names currently present in an environment's script directory.
pub(crate) fn scan_scripts(bin_dir: &Path) -> io::Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    let entries = match fs::read_dir(bin_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(names),
        Err(err) => return Err(err),
    };
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.insert(name.to_string());
        }
    }
    Ok(names)
}

/// Points `dest` at `source`, replacing a previous link but never a real file.
pub(crate) fn link_entry_point(source: &Path, dest: &Path) -> Result<(), InstallError> {
    let link_error = |reason: String| InstallError::Link {
        path: dest.to_path_buf(),
        reason,
    };
    if !source.is_file() {
        return Err(link_error(format!(
            "{} is missing from the environment",
            source.display()
        )));
    }
    if let Ok(meta) = dest.symlink_metadata() {
        if !meta.file_type().is_symlink() {
            return Err(link_error(
                "target exists and is not a symlink".to_string(),
            ));
        }
        fs::remove_file(dest).map_err(|err| link_error(err.to_string()))?;
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|err| link_error(err.to_string()))?;
    }
    create_link(source, dest).map_err(|err| link_error(err.to_string()))
}

#[cfg(unix)]
fn create_link(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(windows)]
fn create_link(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(source, dest)
}

/// Whether `dest` is a link to `source` that still resolves to a file.
pub(crate) fn link_points_to(dest: &Path, source: &Path) -> bool {
    match fs::read_link(dest) {
        Ok(target) => target == source && dest.is_file(),
        Err(_) => false,
    }
}
