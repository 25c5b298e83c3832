// File store for markdown documents and the low-level write helpers shared
// with the config.
//
// The batch driver only sees the `DocumentSource` / `DocumentSink` traits.
// `FsVault` is the on-disk implementation: every `*.md` file below a root
// directory, dot-entries and symlinks skipped, so each file is listed once.
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const MARKDOWN_EXTENSION: &str = "md";

/// Identifies a document: its `/`-separated path relative to the store root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    /// Wraps an already `/`-separated relative path. Other characters,
    /// backslashes included, are kept as part of the file name.
    pub fn new(relative: impl Into<String>) -> Self {
        Self(relative.into())
    }

    /// Builds a handle from a path relative to the store root, joining its
    /// components with `/` whatever the platform separator is.
    pub fn from_relative_path(rel: &Path) -> Self {
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Self(parts.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name without the `.md` extension, as used in wiki links.
    pub fn note_name(&self) -> &str {
        let file = self.0.rsplit('/').next().unwrap_or(&self.0);
        match file.len().checked_sub(3) {
            Some(cut) if file.is_char_boundary(cut) && file[cut..].eq_ignore_ascii_case(".md") => {
                &file[..cut]
            }
            _ => file,
        }
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read side of the file store.
pub trait DocumentSource {
    /// Every document in the collection. Order is not significant.
    fn list_documents(&self) -> Result<Vec<DocumentHandle>>;
    fn read_text(&self, handle: &DocumentHandle) -> Result<String>;
    fn exists(&self, handle: &DocumentHandle) -> bool;
}

/// Write side of the file store. Implementations own atomicity of a write.
pub trait DocumentSink {
    fn write_text(&self, handle: &DocumentHandle, text: &str) -> Result<()>;
}

/// Shared file helpers.
pub struct LocalStorage;

impl LocalStorage {
    /// Sidecar lock file: `config.toml` is guarded by `config.toml.lock`.
    pub fn lock_path_for(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Runs `f` while another `duebump` process is kept out of `path` by an
    /// exclusive advisory lock on its sidecar.
    pub fn with_lock<F, T>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::lock_path_for(path);
        let guard = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

        FileExt::lock_exclusive(&guard)
            .with_context(|| format!("Failed to lock {}", lock_path.display()))?;
        let outcome = f();
        FileExt::unlock(&guard)?;
        outcome
    }

    /// Atomic write: write to a hidden sibling temp file, then rename over the target.
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Not a file path: {}", path.display()))?;
        let mut tmp_name = std::ffi::OsString::from(".");
        tmp_name.push(file_name);
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);
        fs::write(&tmp_path, contents)?;
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MARKDOWN_EXTENSION))
}

/// A directory tree of markdown files.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, handle: &DocumentHandle) -> PathBuf {
        handle
            .as_str()
            .split('/')
            .fold(self.root.clone(), |p, part| p.join(part))
    }

    // `DirEntry::file_type` does not follow symlinks. Linked files and
    // folders are skipped so a loop or an alias cannot list a document twice.
    fn collect_md_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let kind = entry.file_type()?;
            if kind.is_symlink() {
                log::debug!("Not following symlink {}", path.display());
                continue;
            }
            if kind.is_dir() {
                Self::collect_md_files(&path, out)?;
            } else if kind.is_file() && is_markdown(&path) {
                out.push(path);
            }
        }
        Ok(())
    }
}

impl DocumentSource for FsVault {
    fn list_documents(&self) -> Result<Vec<DocumentHandle>> {
        let mut files = Vec::new();
        Self::collect_md_files(&self.root, &mut files)
            .with_context(|| format!("Failed to scan vault {}", self.root.display()))?;
        files.sort();

        let mut handles = Vec::with_capacity(files.len());
        for path in files {
            let rel = path
                .strip_prefix(&self.root)
                .with_context(|| format!("{} is outside the vault", path.display()))?;
            handles.push(DocumentHandle::from_relative_path(rel));
        }
        Ok(handles)
    }

    // read_to_string validates UTF-8, so a file is never rewritten from a
    // lossy decode.
    fn read_text(&self, handle: &DocumentHandle) -> Result<String> {
        let path = self.path_for(handle);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn exists(&self, handle: &DocumentHandle) -> bool {
        self.path_for(handle).exists()
    }
}

impl DocumentSink for FsVault {
    fn write_text(&self, handle: &DocumentHandle, text: &str) -> Result<()> {
        let path = self.path_for(handle);
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        LocalStorage::atomic_write(&path, text.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;

    #[test]
    fn test_lists_markdown_recursively_and_skips_hidden() {
        let ctx = TestContext::new();
        let root = ctx.vault_dir();
        fs::create_dir_all(root.join("projects/deep")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::write(root.join("inbox.md"), "- [ ] a").unwrap();
        fs::write(root.join("projects/deep/plan.md"), "- [ ] b").unwrap();
        fs::write(root.join("projects/image.png"), [0u8, 1, 2]).unwrap();
        fs::write(root.join(".obsidian/workspace.md"), "x").unwrap();
        fs::write(root.join(".hidden.md"), "x").unwrap();

        let vault = FsVault::new(&root);
        let docs = vault.list_documents().unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.as_str()).collect();
        assert_eq!(names, vec!["inbox.md", "projects/deep/plan.md"]);
    }

    #[test]
    fn test_write_creates_parent_and_leaves_no_temp_file() {
        let ctx = TestContext::new();
        let vault = FsVault::new(ctx.vault_dir());
        let handle = DocumentHandle::new("Tasks/Buy milk.md");
        vault.write_text(&handle, "# Buy milk\n").unwrap();

        assert!(vault.exists(&handle));
        assert_eq!(vault.read_text(&handle).unwrap(), "# Buy milk\n");
        let leftovers: Vec<_> = fs::read_dir(ctx.vault_dir().join("Tasks"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_non_utf8_is_a_read_error() {
        let ctx = TestContext::new();
        let root = ctx.vault_dir();
        fs::write(root.join("latin1.md"), [0x2d, 0x20, 0xe9, 0xff]).unwrap();
        let vault = FsVault::new(&root);
        assert!(vault.read_text(&DocumentHandle::new("latin1.md")).is_err());
    }

    #[test]
    fn test_note_name() {
        assert_eq!(DocumentHandle::new("a/b/Daily.md").note_name(), "Daily");
        assert_eq!(DocumentHandle::new("Top.md").note_name(), "Top");
        assert_eq!(DocumentHandle::new("Loud.MD").note_name(), "Loud");
        assert_eq!(
            DocumentHandle::from_relative_path(Path::new("a").join("b.md").as_path()).as_str(),
            "a/b.md"
        );
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let ctx = TestContext::new();
        let root = ctx.vault_dir();
        fs::write(root.join("Note.MD"), "- [ ] a").unwrap();
        fs::write(root.join("plain.Md"), "- [ ] b").unwrap();
        fs::write(root.join("notes.txt"), "- [ ] c").unwrap();

        let docs = FsVault::new(&root).list_documents().unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.as_str()).collect();
        assert_eq!(names, vec!["Note.MD", "plain.Md"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        use std::os::unix::fs::symlink;

        let ctx = TestContext::new();
        let root = ctx.vault_dir();
        fs::create_dir_all(root.join("Projects")).unwrap();
        fs::write(root.join("a.md"), "- [ ] a").unwrap();
        fs::write(root.join("Projects/p.md"), "- [ ] p").unwrap();
        symlink(&root, root.join("loop")).unwrap();
        symlink(root.join("Projects"), root.join("Archive")).unwrap();
        symlink(root.join("a.md"), root.join("alias.md")).unwrap();

        let docs = FsVault::new(&root).list_documents().unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.as_str()).collect();
        assert_eq!(names, vec!["Projects/p.md", "a.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_backslash_file_name_reopens() {
        let ctx = TestContext::new();
        let root = ctx.vault_dir();
        fs::write(root.join("a\\b.md"), "- [ ] odd").unwrap();

        let vault = FsVault::new(&root);
        let docs = vault.list_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].as_str(), "a\\b.md");
        assert_eq!(vault.read_text(&docs[0]).unwrap(), "- [ ] odd");
    }

    #[test]
    fn test_with_lock_runs_closure() {
        let ctx = TestContext::new();
        let path = ctx.root.join("config.toml");
        let out = LocalStorage::with_lock(&path, || {
            LocalStorage::atomic_write(&path, "a = 1\n")?;
            Ok(42)
        })
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a = 1\n");
        assert!(ctx.root.join("config.toml.lock").exists());
    }
}
