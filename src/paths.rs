use std::path::PathBuf;
use std::sync::OnceLock;

/// Where pitchscope looks for its config.
///
/// On Linux this follows the XDG Base Directory Specification:
///   Config:  $XDG_CONFIG_HOME/pitchscope  (~/.config/pitchscope)
///
/// On macOS:
///   Config:  ~/Library/Application Support/pitchscope
///
/// The `dirs` crate handles platform detection. The resolved directory is
/// cached in a OnceLock so the lookup only happens once.

static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Root config directory: $XDG_CONFIG_HOME/pitchscope
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pitchscope")
    })
}

/// Config file path: <config_dir>/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}
