pub mod build;
pub mod graph;
pub mod resolve;

use graft_core::config::CONFIG_FILE_NAME;
use graft_core::{BuildConfig, BuildContext, Error};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Error payload for JSON output.
#[derive(Serialize)]
pub struct ErrorJson {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorResult {
    ok: bool,
    error: ErrorJson,
}

/// Config path from `--config` (relative to `cwd`), else `cwd/graft.json`.
pub fn config_path(cwd: &Path, config: Option<&Path>) -> PathBuf {
    config.map_or_else(|| cwd.join(CONFIG_FILE_NAME), |path| cwd.join(path))
}

/// Load the config and set up a build context with the SWC compiler.
pub fn context(config_path: &Path) -> graft_core::Result<BuildContext> {
    let config = BuildConfig::load(config_path)?;
    BuildContext::new(config, Arc::new(graft_core::compiler::SwcCompiler::new()))
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()
}

/// Print `value` as a single JSON line.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value).into_diagnostic()?);
    Ok(())
}

/// Report a failed command and exit.
///
/// JSON mode prints `{ ok: false, error }` on stdout; human mode prints to stderr.
pub fn fail(err: &Error, json: bool) -> ! {
    if json {
        let result = ErrorResult {
            ok: false,
            error: ErrorJson {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        };
        match serde_json::to_string(&result) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("error: {e}"),
        }
    } else {
        eprintln!("error: {err}");
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
    }
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_defaults_to_graft_json() {
        let path = config_path(Path::new("/project"), None);
        assert_eq!(path, PathBuf::from("/project/graft.json"));
    }

    #[test]
    fn test_config_path_relative_to_cwd() {
        let path = config_path(Path::new("/project"), Some(Path::new("conf/app.json")));
        assert_eq!(path, PathBuf::from("/project/conf/app.json"));

        let abs = config_path(Path::new("/project"), Some(Path::new("/etc/graft.json")));
        assert_eq!(abs, PathBuf::from("/etc/graft.json"));
    }
}
