#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Oid, Repository, Signature};
use tempfile::TempDir;
use todoline::store::{StoreOptions, TaskStore};
use todoline::SyncEngine;

pub struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    pub fn init() -> Result<Self, git2::Error> {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let repo = Repository::init(dir.path())?;
        set_identity(&repo)?;
        Ok(Self { dir, repo })
    }

    /// A second working copy wired to `remote` as `origin`.
    pub fn with_remote(remote: &BareRemote) -> Result<Self, git2::Error> {
        let repo = Self::init()?;
        repo.repo.remote("origin", &remote.url())?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn todo_path(&self) -> PathBuf {
        self.dir.path().join("todo.txt")
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(self.dir.path())
    }

    pub fn store(&self, options: StoreOptions) -> TaskStore {
        TaskStore::new(self.todo_path(), Some(self.engine()), options)
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_file(&self, rel_path: &str) -> std::io::Result<String> {
        fs::read_to_string(self.dir.path().join(rel_path))
    }

    pub fn commit_all(&self, message: &str) -> Result<Oid, git2::Error> {
        let mut index = self.repo.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let sig = Signature::now("todoline-test", "todoline-test@example.com")?;

        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.target())
            .and_then(|oid| self.repo.find_commit(oid).ok());

        let oid = match parent {
            Some(parent) => self
                .repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?,
            None => self
                .repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &[])?,
        };

        Ok(oid)
    }

    pub fn head_message(&self) -> Option<String> {
        let commit = self.repo.head().ok()?.peel_to_commit().ok()?;
        commit.message().map(|m| m.trim_end().to_string())
    }

    /// Number of commits reachable from HEAD (0 on an unborn branch).
    pub fn commit_count(&self) -> usize {
        let Ok(mut walk) = self.repo.revwalk() else {
            return 0;
        };
        if walk.push_head().is_err() {
            return 0;
        }
        walk.count()
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }
}

/// A bare repository in a temp dir, reachable through libgit2's local
/// transport.
pub struct BareRemote {
    dir: TempDir,
    repo: Repository,
}

impl BareRemote {
    pub fn init() -> Result<Self, git2::Error> {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let repo = Repository::init_bare(dir.path())?;
        Ok(Self { dir, repo })
    }

    pub fn url(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    /// Blob contents of `rel_path` on `branch`, if present.
    pub fn file_on(&self, branch: &str, rel_path: &str) -> Option<String> {
        let reference = self
            .repo
            .find_reference(&format!("refs/heads/{branch}"))
            .ok()?;
        let tree = reference.peel_to_tree().ok()?;
        let entry = tree.get_path(Path::new(rel_path)).ok()?;
        let blob = self.repo.find_blob(entry.id()).ok()?;
        Some(String::from_utf8_lossy(blob.content()).into_owned())
    }
}

fn set_identity(repo: &Repository) -> Result<(), git2::Error> {
    let mut cfg = repo.config()?;
    cfg.set_str("user.name", "todoline-test")?;
    cfg.set_str("user.email", "todoline-test@example.com")?;
    Ok(())
}
