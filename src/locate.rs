//! Office engine discovery.
//!
//! Finds a LibreOffice `soffice` binary: first on `PATH` (Linux and most
//! package-managed installs), then at the conventional macOS application
//! bundle locations for hosts where the app is installed but not on `PATH`.

use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Binary names probed on `PATH`, in preference order.
const PATH_CANDIDATES: &[&str] = &["soffice", "libreoffice"];

static CACHED: OnceCell<Option<PathBuf>> = OnceCell::new();

/// Locate the office conversion engine, or `None` when no candidate exists.
///
/// The result is cached process-wide: installed software does not move
/// during the process lifetime, and sessions call this on every office job.
pub fn find_office_engine() -> Option<PathBuf> {
    CACHED.get_or_init(probe).clone()
}

fn probe() -> Option<PathBuf> {
    for name in PATH_CANDIDATES {
        if let Some(found) = search_path(name) {
            debug!("office engine on PATH: {}", found.display());
            return Some(found);
        }
    }

    for candidate in well_known_paths() {
        if candidate.is_file() {
            debug!("office engine at well-known path: {}", candidate.display());
            return Some(candidate);
        }
    }

    None
}

/// Walk `PATH` looking for an executable with the given name.
fn search_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Fixed install locations outside `PATH` (macOS application bundles).
fn well_known_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(
        "/Applications/LibreOffice.app/Contents/MacOS/soffice",
    )];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(
            PathBuf::from(home).join("Applications/LibreOffice.app/Contents/MacOS/soffice"),
        );
    }
    paths
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
