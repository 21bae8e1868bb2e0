//! # Plugin Workspace Layout
//!
//! Every plugin name owns a private directory tree:
//!
//! ```text
//! <root>/
//!   env/       interpreter environments, ready marker
//!   sources/   cloned third-party repositories
//!   train/     seed files and training artifacts
//! ```
//!
//! The core never interprets the contents beyond handing the paths to the
//! plugin. The `env/.ready` marker is what survives between process runs
//! and lets `setup` detect earlier provisioning.

use std::path::{Path, PathBuf};

use sixkit_common::error::KitResult;

const READY_MARKER: &str = ".ready";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn env_dir(&self) -> PathBuf {
        self.root.join("env")
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.root.join("sources")
    }

    pub fn train_dir(&self) -> PathBuf {
        self.root.join("train")
    }

    pub fn ready_marker(&self) -> PathBuf {
        self.env_dir().join(READY_MARKER)
    }

    /// Creates the whole tree. Safe to call repeatedly.
    pub fn ensure_layout(&self) -> KitResult<()> {
        std::fs::create_dir_all(self.env_dir())?;
        std::fs::create_dir_all(self.sources_dir())?;
        std::fs::create_dir_all(self.train_dir())?;
        Ok(())
    }

    /// True once a previous `setup` completed here.
    pub fn is_provisioned(&self) -> bool {
        self.ready_marker().exists()
    }

    pub fn mark_provisioned(&self) -> KitResult<()> {
        self.ensure_layout()?;
        std::fs::write(self.ready_marker(), b"")?;
        Ok(())
    }

    /// Writes seeds one-per-line into `train/<name>` and returns the path.
    pub fn write_seeds(&self, name: &str, seeds: &[String]) -> KitResult<PathBuf> {
        std::fs::create_dir_all(self.train_dir())?;
        let path = self.train_dir().join(name);
        let mut contents = seeds.join("\n");
        contents.push('\n');
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Deletes everything this plugin provisioned.
    pub fn clear(&self) -> KitResult<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_and_marker_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path().join("tga-static").join("sixgen"));

        assert!(!ws.is_provisioned());
        ws.mark_provisioned().unwrap();
        assert!(ws.is_provisioned());
        assert!(ws.sources_dir().is_dir());
        assert!(ws.train_dir().is_dir());

        ws.clear().unwrap();
        assert!(!ws.is_provisioned());
        assert!(!ws.root().exists());
    }

    #[test]
    fn write_seeds_is_one_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path().to_path_buf());
        let path = ws
            .write_seeds("seeds.txt", &["::1".to_string(), "::2".to_string()])
            .unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(written, "::1\n::2\n");
    }
}
