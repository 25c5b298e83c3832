// File: ./src/context.rs
//! Where `duebump` keeps its config file.
//!
//! Everything that reads or writes `config.toml` is handed a `&dyn AppContext`
//! instead of looking the location up itself. The binary uses
//! [`StandardContext`]; tests use [`TestContext`], which lives in a throwaway
//! temp directory.

use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.toml";

pub trait AppContext: Send + Sync + std::fmt::Debug {
    /// Directory holding `config.toml`. Created if missing.
    fn get_config_dir(&self) -> Result<PathBuf>;

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(self.get_config_dir()?.join(CONFIG_FILE_NAME))
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create config directory {}", dir.display()))
}

/// OS config location (`~/.config/duebump` on Linux), or `<root>/config` when
/// `--root` is given.
#[derive(Clone, Debug)]
pub struct StandardContext {
    root: Option<PathBuf>,
}

impl StandardContext {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

impl AppContext for StandardContext {
    fn get_config_dir(&self) -> Result<PathBuf> {
        let dir = match &self.root {
            Some(root) => root.join("config"),
            None => ProjectDirs::from("com", "duebump", "duebump")
                .ok_or_else(|| anyhow!("Cannot locate a home directory for the config"))?
                .config_dir()
                .to_path_buf(),
        };
        create_dir(&dir)?;
        Ok(dir)
    }
}

/// A unique directory under the system temp dir, deleted on drop.
#[derive(Clone, Debug)]
pub struct TestContext {
    pub root: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!("duebump_test_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&root).expect("failed to create test directory");
        Self { root }
    }

    /// `<root>/vault`, for tests that need a document tree next to the config.
    pub fn vault_dir(&self) -> PathBuf {
        let dir = self.root.join("vault");
        let _ = fs::create_dir_all(&dir);
        dir
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext for TestContext {
    fn get_config_dir(&self) -> Result<PathBuf> {
        let dir = self.root.join("config");
        create_dir(&dir)?;
        Ok(dir)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}
