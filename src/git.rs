//! Git-backed synchronization of the task directory.
//!
//! [`SyncEngine`] wraps the libgit2 calls todoline needs: repository
//! discovery and creation, remotes, staging, committing, pulling and pushing.
//! Each operation opens the repository, uses it and drops it again; nothing
//! is held between calls.
//!
//! The operations the store relies on report a plain `bool`. Internally they
//! are written against [`Result`] and the boolean wrappers log the reason for
//! a failure before collapsing it. Staging a path outside the repository is
//! the exception: it is a caller bug and surfaces as
//! [`Error::PathOutsideRepo`].

use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{
    Config, Cred, CredentialType, ErrorClass, ErrorCode, FetchOptions, IndexAddOption,
    PushOptions, RemoteCallbacks, Repository, RepositoryState, Signature,
};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::sync::{self, SyncBackend, SyncOptions, SyncOutcome};

/// Identity used for commits when the repository config has none.
pub const FALLBACK_NAME: &str = "todoline";
pub const FALLBACK_EMAIL: &str = "todoline@localhost";

/// Branch assumed when HEAD does not name one.
pub const DEFAULT_BRANCH: &str = "master";

/// Why a push did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushFailure {
    NoRemote,
    DetachedHead,
    Authentication,
    NonFastForward,
    /// The remote refused the update for another reason (hooks, permissions).
    Rejected,
    Other,
}

impl std::fmt::Display for PushFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            PushFailure::NoRemote => "no remote configured",
            PushFailure::DetachedHead => "no current branch",
            PushFailure::Authentication => "authentication failed",
            PushFailure::NonFastForward => "remote has commits not present locally",
            PushFailure::Rejected => "remote rejected the update",
            PushFailure::Other => "push failed",
        };
        f.write_str(text)
    }
}

/// Classify a libgit2 push error.
pub fn classify_push_error(err: &git2::Error) -> PushFailure {
    let message = err.message().to_ascii_lowercase();
    if err.code() == ErrorCode::Auth
        || message.contains("authentication")
        || message.contains("credentials")
    {
        PushFailure::Authentication
    } else if err.code() == ErrorCode::NotFastForward
        || message.contains("non-fast-forward")
        || message.contains("non-fastforwardable")
    {
        PushFailure::NonFastForward
    } else {
        PushFailure::Other
    }
}

fn classify_rejection(status: &str) -> PushFailure {
    let status = status.to_ascii_lowercase();
    if status.contains("non-fast-forward") || status.contains("fetch first") {
        PushFailure::NonFastForward
    } else {
        PushFailure::Rejected
    }
}

/// What a successful pull did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    NoRemote,
    /// The remote has no branch with the local branch's name yet.
    NoRemoteBranch,
    UpToDate,
    FastForward,
    Merged,
    /// The merge stopped on conflicts, or an earlier one is still waiting for
    /// its commit. Markers are left in the working tree.
    Conflicted(Vec<PathBuf>),
}

/// Synchronization engine rooted at the task directory.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    root: PathBuf,
}

impl SyncEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the engine was created for (the repository may sit above it).
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn open(&self) -> Result<Repository> {
        let repo = Repository::discover(&self.root).map_err(|err| {
            if err.code() == ErrorCode::NotFound {
                Error::RepoNotFound(self.root.clone())
            } else {
                Error::Git(err)
            }
        })?;
        if repo.is_bare() {
            return Err(Error::NotARepo(self.root.clone()));
        }
        Ok(repo)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// True when a repository is discoverable at or above the root.
    pub fn is_repo(&self) -> bool {
        self.open().is_ok()
    }

    /// True when at least one remote is configured.
    pub fn has_remote(&self) -> bool {
        !self.remotes().is_empty()
    }

    /// Names of the configured remotes, in configuration order.
    pub fn remotes(&self) -> Vec<String> {
        let Ok(repo) = self.open() else {
            return Vec::new();
        };
        remote_names(&repo)
    }

    /// Branch HEAD points at, when HEAD is attached.
    pub fn current_branch(&self) -> Option<String> {
        let repo = self.open().ok()?;
        let head = repo.head().ok()?;
        if !head.is_branch() {
            return None;
        }
        head.shorthand().map(String::from)
    }

    /// True when the index holds nothing that differs from HEAD. A merge
    /// waiting for its commit is never clean.
    pub fn is_clean(&self) -> Result<bool> {
        let repo = self.open()?;
        if repo.state() == RepositoryState::Merge {
            return Ok(false);
        }
        let index = repo.index()?;
        let clean = match head_commit(&repo)? {
            Some(head) => {
                let tree = head.tree()?;
                let diff = repo.diff_tree_to_index(Some(&tree), Some(&index), None)?;
                diff.deltas().count() == 0
            }
            None => index.is_empty(),
        };
        Ok(clean)
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Create a repository at the root. Succeeds without changes when one is
    /// already discoverable.
    pub fn init(&self) -> bool {
        if self.is_repo() {
            info!(root = %self.root.display(), "git repository already exists");
            return true;
        }
        match self.try_init() {
            Ok(()) => {
                info!(root = %self.root.display(), "initialized git repository");
                true
            }
            Err(err) => {
                warn!(root = %self.root.display(), "failed to initialize git repository: {err}");
                false
            }
        }
    }

    fn try_init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Repository::init(&self.root)?;
        Ok(())
    }

    /// Add remote `name`, replacing it when it exists with a different URL.
    pub fn add_remote(&self, name: &str, url: &str) -> bool {
        match self.try_add_remote(name, url) {
            Ok(()) => true,
            Err(err) => {
                warn!(remote = name, url, "failed to add remote: {err}");
                false
            }
        }
    }

    fn try_add_remote(&self, name: &str, url: &str) -> Result<()> {
        let repo = self.open()?;
        let existing_url = match repo.find_remote(name) {
            Ok(remote) => Some(remote.url().map(String::from)),
            Err(err) if err.code() == ErrorCode::NotFound => None,
            Err(err) => return Err(Error::Git(err)),
        };

        match existing_url {
            Some(Some(current)) if current == url => {
                debug!(remote = name, url, "remote already configured");
            }
            Some(_) => {
                repo.remote_delete(name)?;
                repo.remote(name, url)?;
                info!(remote = name, url, "updated remote");
            }
            None => {
                repo.remote(name, url)?;
                info!(remote = name, url, "added remote");
            }
        }
        Ok(())
    }

    // =========================================================================
    // Stage and commit
    // =========================================================================

    /// Stage `path` (or every change when `None`) and write the index.
    ///
    /// Returns `Ok(false)` on ordinary failures, including a missing
    /// repository. A path outside the repository's working tree is a
    /// contract violation and returns [`Error::PathOutsideRepo`].
    pub fn stage_changes(&self, path: Option<&Path>) -> Result<bool> {
        let repo = match self.open() {
            Ok(repo) => repo,
            Err(err) => {
                debug!("nothing to stage: {err}");
                return Ok(false);
            }
        };
        match stage(&repo, path) {
            Ok(()) => Ok(true),
            Err(err) if err.is_contract_violation() => Err(err),
            Err(err) => {
                warn!("failed to stage changes: {err}");
                Ok(false)
            }
        }
    }

    /// Commit the index. Fails when the message is blank or the index
    /// matches HEAD.
    pub fn commit(&self, message: &str) -> bool {
        match self.try_commit(message) {
            Ok(oid) => {
                info!(%oid, "committed changes");
                true
            }
            Err(err) => {
                warn!("commit failed: {err}");
                false
            }
        }
    }

    fn try_commit(&self, message: &str) -> Result<git2::Oid> {
        if message.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "commit message cannot be empty".to_string(),
            ));
        }
        let mut repo = self.open()?;
        let merging = repo.state() == RepositoryState::Merge;
        let mut merge_heads = Vec::new();
        if merging {
            repo.mergehead_foreach(|oid| {
                merge_heads.push(*oid);
                true
            })?;
        }

        let mut index = repo.index()?;
        let tree_oid = index.write_tree()?;
        let tree = repo.find_tree(tree_oid)?;

        let parent = head_commit(&repo)?;
        if let Some(parent) = &parent {
            if !merging && parent.tree_id() == tree_oid {
                return Err(Error::OperationFailed("nothing to commit".to_string()));
            }
        }
        let merged = merge_heads
            .iter()
            .map(|oid| repo.find_commit(*oid))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let signature = signature(&repo)?;
        let parents: Vec<&git2::Commit> = parent.iter().chain(merged.iter()).collect();
        let oid = repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        if merging {
            repo.cleanup_state()?;
            debug!(heads = merged.len(), "concluded merge");
        }
        Ok(oid)
    }

    // =========================================================================
    // Remote exchange
    // =========================================================================

    /// Fetch the first remote and merge its copy of the current branch.
    ///
    /// No remote, a remote without the branch, and a merge that stops on
    /// conflicts all count as success.
    pub fn pull(&self) -> bool {
        match self.try_pull() {
            Ok(PullOutcome::Conflicted(paths)) => {
                warn!(
                    conflicts = paths.len(),
                    "pull merged with conflicts; resolve them in the task file"
                );
                true
            }
            Ok(outcome) => {
                debug!(?outcome, "pull finished");
                true
            }
            Err(err) => {
                warn!("pull failed: {err}");
                false
            }
        }
    }

    pub fn try_pull(&self) -> Result<PullOutcome> {
        let repo = self.open()?;
        let Some(remote_name) = remote_names(&repo).into_iter().next() else {
            return Ok(PullOutcome::NoRemote);
        };
        {
            let index = repo.index()?;
            if repo.state() == RepositoryState::Merge || index.has_conflicts() {
                debug!("merge in progress; not pulling again");
                return Ok(PullOutcome::Conflicted(conflicted_paths(&index)?));
            }
        }
        let branch = tracking_branch_name(&repo);

        {
            let config = repo.config()?;
            let mut remote = repo.find_remote(&remote_name)?;
            let mut options = FetchOptions::new();
            options.remote_callbacks(credential_callbacks(&config));
            remote.fetch::<&str>(&[], Some(&mut options), None)?;
        }

        let tracking = format!("refs/remotes/{remote_name}/{branch}");
        let reference = match repo.find_reference(&tracking) {
            Ok(reference) => reference,
            Err(err) if err.code() == ErrorCode::NotFound => {
                debug!(%tracking, "remote branch does not exist yet");
                return Ok(PullOutcome::NoRemoteBranch);
            }
            Err(err) => return Err(Error::Git(err)),
        };
        let fetched = repo.reference_to_annotated_commit(&reference)?;
        let (analysis, _) = repo.merge_analysis(&[&fetched])?;

        if analysis.is_up_to_date() {
            return Ok(PullOutcome::UpToDate);
        }

        let local_ref = format!("refs/heads/{branch}");
        if analysis.is_unborn() || analysis.is_fast_forward() {
            let target = repo.find_commit(fetched.id())?;
            repo.checkout_tree(target.as_object(), Some(CheckoutBuilder::new().safe()))?;
            let log_message = format!("pull: fast-forward to {tracking}");
            match repo.find_reference(&local_ref) {
                Ok(mut existing) => {
                    existing.set_target(target.id(), &log_message)?;
                }
                Err(err) if err.code() == ErrorCode::NotFound => {
                    repo.reference(&local_ref, target.id(), true, &log_message)?;
                }
                Err(err) => return Err(Error::Git(err)),
            }
            repo.set_head(&local_ref)?;
            return Ok(PullOutcome::FastForward);
        }

        repo.merge(&[&fetched], None, Some(CheckoutBuilder::new().safe()))?;
        let mut index = repo.index()?;
        if index.has_conflicts() {
            return Ok(PullOutcome::Conflicted(conflicted_paths(&index)?));
        }

        let tree = repo.find_tree(index.write_tree()?)?;
        let ours = repo.head()?.peel_to_commit()?;
        let theirs = repo.find_commit(fetched.id())?;
        let signature = signature(&repo)?;
        let message = format!("Merge {tracking} into {branch}");
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&ours, &theirs],
        )?;
        repo.cleanup_state()?;
        Ok(PullOutcome::Merged)
    }

    /// Push the current branch to the same-named branch on the first remote.
    pub fn push(&self) -> bool {
        match self.try_push() {
            Ok(()) => {
                info!("pushed changes");
                true
            }
            Err((kind, err)) => {
                warn!(reason = %kind, "push failed: {err}");
                false
            }
        }
    }

    pub fn try_push(&self) -> std::result::Result<(), (PushFailure, Error)> {
        let repo = self.open().map_err(|err| (PushFailure::Other, err))?;
        let Some(remote_name) = remote_names(&repo).into_iter().next() else {
            return Err((
                PushFailure::NoRemote,
                Error::OperationFailed("no remote configured".to_string()),
            ));
        };
        let branch = repo
            .head()
            .ok()
            .filter(|head| head.is_branch())
            .and_then(|head| head.shorthand().map(String::from))
            .ok_or_else(|| {
                (
                    PushFailure::DetachedHead,
                    Error::OperationFailed("HEAD is not on a branch".to_string()),
                )
            })?;

        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let git_failure = |err: git2::Error| (classify_push_error(&err), Error::Git(err));

        let config = repo.config().map_err(git_failure)?;
        let mut remote = repo.find_remote(&remote_name).map_err(git_failure)?;
        let mut rejection: Option<String> = None;
        {
            let mut callbacks = credential_callbacks(&config);
            callbacks.push_update_reference(|refname, status| {
                if let Some(status) = status {
                    rejection = Some(format!("{refname}: {status}"));
                }
                Ok(())
            });
            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);
            remote
                .push(&[refspec.as_str()], Some(&mut options))
                .map_err(git_failure)?;
        }

        if let Some(status) = rejection {
            return Err((classify_rejection(&status), Error::OperationFailed(status)));
        }
        Ok(())
    }

    // =========================================================================
    // Orchestration
    // =========================================================================

    /// Pull, stage, commit and push. See [`sync::run`] for the exact steps.
    pub fn sync(&self, path: Option<&Path>, message: &str, options: SyncOptions) -> bool {
        self.sync_report(path, message, options).is_success()
    }

    pub fn sync_report(&self, path: Option<&Path>, message: &str, options: SyncOptions) -> SyncOutcome {
        sync::run(self, path, message, options)
    }
}

impl SyncBackend for SyncEngine {
    fn is_repo(&self) -> bool {
        SyncEngine::is_repo(self)
    }

    fn has_remote(&self) -> bool {
        SyncEngine::has_remote(self)
    }

    fn pull(&self) -> bool {
        SyncEngine::pull(self)
    }

    fn stage_changes(&self, path: Option<&Path>) -> Result<bool> {
        SyncEngine::stage_changes(self, path)
    }

    fn is_clean(&self) -> Result<bool> {
        SyncEngine::is_clean(self)
    }

    fn commit(&self, message: &str) -> bool {
        SyncEngine::commit(self, message)
    }

    fn push(&self) -> bool {
        SyncEngine::push(self)
    }
}

fn remote_names(repo: &Repository) -> Vec<String> {
    match repo.remotes() {
        Ok(names) => names.iter().flatten().map(String::from).collect(),
        Err(err) => {
            debug!("unable to list remotes: {err}");
            Vec::new()
        }
    }
}

/// Paths with unresolved conflict entries in the index.
fn conflicted_paths(index: &git2::Index) -> Result<Vec<PathBuf>> {
    if !index.has_conflicts() {
        return Ok(Vec::new());
    }
    let paths = index
        .conflicts()?
        .filter_map(|conflict| conflict.ok())
        .filter_map(|conflict| conflict.our.or(conflict.their))
        .map(|entry| PathBuf::from(String::from_utf8_lossy(&entry.path).into_owned()))
        .collect();
    Ok(paths)
}

/// HEAD's commit, or `None` on an unborn branch.
fn head_commit(repo: &Repository) -> Result<Option<git2::Commit<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(err) if err.code() == ErrorCode::UnbornBranch || err.code() == ErrorCode::NotFound => {
            Ok(None)
        }
        Err(err) => Err(Error::Git(err)),
    }
}

/// Current branch name, following HEAD's symbolic target on an unborn
/// branch and falling back to [`DEFAULT_BRANCH`].
fn tracking_branch_name(repo: &Repository) -> String {
    if let Ok(head) = repo.head() {
        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return name.to_string();
            }
        }
    }
    repo.find_reference("HEAD")
        .ok()
        .and_then(|head| {
            head.symbolic_target()
                .and_then(|target| target.strip_prefix("refs/heads/"))
                .map(String::from)
        })
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string())
}

fn signature(repo: &Repository) -> Result<Signature<'static>> {
    match repo.signature() {
        Ok(signature) => Ok(signature),
        Err(err) => {
            debug!("no git identity configured ({err}); using fallback");
            Ok(Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)?)
        }
    }
}

fn stage(repo: &Repository, path: Option<&Path>) -> Result<()> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| Error::OperationFailed("repository has no working directory".to_string()))?;
    let mut index = repo.index()?;

    let relative = match path {
        Some(path) => relative_to(workdir, path)?,
        None => PathBuf::new(),
    };

    if relative.as_os_str().is_empty() {
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
    } else if workdir.join(&relative).exists() {
        index.add_path(&relative)?;
    } else {
        index.remove_path(&relative)?;
    }

    index.write()?;
    Ok(())
}

/// `path` relative to `workdir`, or [`Error::PathOutsideRepo`].
fn relative_to(workdir: &Path, path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let resolved = resolve(&absolute);
    let root = resolve(workdir);
    resolved
        .strip_prefix(&root)
        .map(Path::to_path_buf)
        .map_err(|_| Error::PathOutsideRepo {
            path: path.to_path_buf(),
            root: workdir.to_path_buf(),
        })
}

/// Canonicalize, tolerating a final component that does not exist yet.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Credential lookup for fetch and push: ssh-agent, then the git credential
/// helper, then default (negotiate) credentials. Each source is tried once so
/// a rejected credential ends the attempt instead of looping.
fn credential_callbacks(config: &Config) -> RemoteCallbacks<'_> {
    let mut tried_agent = false;
    let mut tried_helper = false;
    let mut tried_default = false;

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username, allowed| {
        let user = username.unwrap_or("git");
        if allowed.contains(CredentialType::SSH_KEY) && !tried_agent {
            tried_agent = true;
            return Cred::ssh_key_from_agent(user);
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) && !tried_helper {
            tried_helper = true;
            return Cred::credential_helper(config, url, username);
        }
        if allowed.contains(CredentialType::DEFAULT) && !tried_default {
            tried_default = true;
            return Cred::default();
        }
        Err(git2::Error::new(
            ErrorCode::Auth,
            ErrorClass::Net,
            format!("no usable credentials for {url}"),
        ))
    });
    callbacks
}
