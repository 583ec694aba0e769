#![allow(unused_imports)]

mod discovery;
mod error;
mod launcher;
mod platform;

pub use discovery::{BrowserVersion, query_version, query_version_at, resolve_ws_url};
pub use error::ChromeError;
pub use launcher::{ChromeProcess, LaunchConfig, find_available_port, launch_browser};
pub use platform::{BROWSER_ENV_VAR, BROWSER_EXECUTABLES, find_browser, is_remote_url};
