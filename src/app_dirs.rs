use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "keydrill").map(|pd| pd.config_dir().join("config.json"))
    }

    /// Default log location; logs never go to stdout since the TUI owns it.
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("keydrill");
            Some(state_dir.join("keydrill.log"))
        } else {
            ProjectDirs::from("", "", "keydrill")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("keydrill.log"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_end_in_expected_files() {
        if let Some(p) = AppDirs::config_path() {
            assert!(p.ends_with("config.json"));
        }
        if let Some(p) = AppDirs::log_path() {
            assert!(p.ends_with("keydrill.log"));
        }
    }
}
