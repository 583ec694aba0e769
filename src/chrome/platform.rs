use std::path::{Path, PathBuf};

use super::ChromeError;

/// Environment variable overriding browser binary discovery.
pub const BROWSER_ENV_VAR: &str = "HTML2PDF_BROWSER";

/// Executable names searched for on the PATH, in order.
pub const BROWSER_EXECUTABLES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// True when `spec` names a running browser's debug endpoint rather than
/// a binary on disk.
#[must_use]
pub fn is_remote_url(spec: &str) -> bool {
    spec.starts_with("http://")
        || spec.starts_with("https://")
        || spec.starts_with("ws://")
        || spec.starts_with("wss://")
}

/// Find a browser executable.
///
/// Lookup order: the `HTML2PDF_BROWSER` environment variable, then the
/// known executable names on the PATH, then fixed well-known paths.
/// The `--browser` flag takes precedence over all of these but is
/// handled by the caller.
///
/// # Errors
///
/// Returns `ChromeError::NotFound` if nothing matches.
pub fn find_browser() -> Result<PathBuf, ChromeError> {
    let env_override = std::env::var(BROWSER_ENV_VAR).ok().map(PathBuf::from);
    let path_dirs: Vec<PathBuf> = std::env::var("PATH")
        .unwrap_or_default()
        .split(path_separator())
        .map(PathBuf::from)
        .collect();

    find_browser_from(env_override.as_deref(), &path_dirs, &well_known_paths()).ok_or_else(|| {
        ChromeError::NotFound(format!(
            "no Chromium/Chrome executable found. Install one, pass --browser, \
             or set {BROWSER_ENV_VAR}"
        ))
    })
}

/// The testable core of [`find_browser`]: precedence is env override,
/// then PATH search over the known names, then fixed paths. First
/// existing match wins.
fn find_browser_from(
    env_override: Option<&Path>,
    path_dirs: &[PathBuf],
    well_known: &[PathBuf],
) -> Option<PathBuf> {
    if let Some(p) = env_override {
        if p.exists() {
            return Some(p.to_path_buf());
        }
    }

    for name in BROWSER_EXECUTABLES {
        for dir in path_dirs {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    well_known.iter().find(|p| p.exists()).cloned()
}

/// Fixed last-resort install locations for the current platform.
fn well_known_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        [
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium-browser",
            "/usr/bin/chromium",
            "/usr/bin/chrome",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect()
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from("C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe"),
            PathBuf::from("C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe"),
        ]
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

fn path_separator() -> char {
    if cfg!(windows) { ';' } else { ':' }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn remote_url_detection() {
        assert!(is_remote_url("http://localhost:9222"));
        assert!(is_remote_url("https://cdp.internal:9222"));
        assert!(is_remote_url("ws://127.0.0.1:9222/devtools/browser/x"));
        assert!(!is_remote_url("/usr/bin/chromium"));
        assert!(!is_remote_url("chromium"));
    }

    #[test]
    fn env_override_wins_over_path_search() {
        let dir = tempfile::tempdir().unwrap();
        let override_bin = dir.path().join("my-chrome");
        File::create(&override_bin).unwrap();
        let path_bin = dir.path().join("chromium");
        File::create(&path_bin).unwrap();

        let found = find_browser_from(
            Some(&override_bin),
            &[dir.path().to_path_buf()],
            &[],
        )
        .unwrap();
        assert_eq!(found, override_bin);
    }

    #[test]
    fn missing_env_override_falls_through_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path_bin = dir.path().join("chromium");
        File::create(&path_bin).unwrap();

        let found = find_browser_from(
            Some(Path::new("/nonexistent/browser")),
            &[dir.path().to_path_buf()],
            &[],
        )
        .unwrap();
        assert_eq!(found, path_bin);
    }

    #[test]
    fn path_search_tries_names_in_order() {
        let dir = tempfile::tempdir().unwrap();
        // Both present: "chromium" is earlier in BROWSER_EXECUTABLES.
        File::create(dir.path().join("chromium")).unwrap();
        File::create(dir.path().join("google-chrome")).unwrap();

        let found = find_browser_from(None, &[dir.path().to_path_buf()], &[]).unwrap();
        assert_eq!(found, dir.path().join("chromium"));
    }

    #[test]
    fn well_known_paths_are_the_last_resort() {
        let dir = tempfile::tempdir().unwrap();
        let fixed = dir.path().join("fixed-chrome");
        File::create(&fixed).unwrap();

        let found = find_browser_from(None, &[], std::slice::from_ref(&fixed)).unwrap();
        assert_eq!(found, fixed);
    }

    #[test]
    fn nothing_found_yields_none() {
        assert_eq!(
            find_browser_from(None, &[PathBuf::from("/nonexistent-dir")], &[]),
            None
        );
    }
}
