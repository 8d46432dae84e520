//! Output artifacts.
//!
//! - [`table`] - normalized CSV (write and read back)
//! - [`sidarthe`] - SIDARTHE simulation input text
//! - [`verify`] - consistency checks between the two artifacts
//!
//! Writers go through [`write_atomic`] or [`write_all_atomic`], so an
//! artifact on disk is either the previous complete file or the new one.

pub mod sidarthe;
pub mod table;
pub mod verify;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ExportError, ExportResult};

pub use sidarthe::{format_series, format_sidarthe, write_sidarthe, POPULATION_PLACEHOLDER};
pub use table::{parse_csv, read_csv, render_csv, write_csv};
pub use verify::{verify, verify_artifacts, VerifySummary};

/// Write `contents` to a sibling temp file, then rename it over `path`.
///
/// Missing parent directories are created.
pub fn write_atomic(path: &Path, contents: &[u8]) -> ExportResult<()> {
    write_all_atomic(&[(path, contents)])
}

/// Write a set of files so that either all of them are replaced or none is.
///
/// Every file is first written to its `.tmp` sibling. Renames start only
/// once all temp files exist and no target is a directory; on any earlier
/// failure the temp files are removed and the targets are left untouched.
pub fn write_all_atomic(files: &[(&Path, &[u8])]) -> ExportResult<()> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());

    for (path, contents) in files {
        match stage(path, contents) {
            Ok(tmp) => staged.push(tmp),
            Err(e) => {
                discard(&staged);
                return Err(e);
            }
        }
    }

    if let Some((path, _)) = files.iter().find(|(path, _)| path.is_dir()) {
        discard(&staged);
        return Err(ExportError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    for (idx, ((path, _), tmp)) in files.iter().zip(&staged).enumerate() {
        if let Err(source) = fs::rename(tmp, path) {
            discard(&staged[idx..]);
            return Err(ExportError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    Ok(())
}

/// Write `contents` next to `path` and return the temp file.
fn stage(path: &Path, contents: &[u8]) -> ExportResult<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp = temp_path(path);
    if let Err(source) = fs::write(&tmp, contents) {
        let _ = fs::remove_file(&tmp);
        return Err(ExportError::Io { path: tmp, source });
    }
    Ok(tmp)
}

fn discard(staged: &[PathBuf]) {
    for tmp in staged {
        let _ = fs::remove_file(tmp);
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
