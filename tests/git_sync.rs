use std::fs;
use std::path::PathBuf;

use todoline::codec;
use todoline::git::{PullOutcome, PushFailure, SyncEngine};
use todoline::store::{StoreOptions, SyncStatus};
use todoline::sync::{SyncOptions, SyncOutcome};

mod support;

use support::{BareRemote, TestRepo};

fn local_only() -> StoreOptions {
    StoreOptions {
        auto_sort: true,
        auto_commit: true,
        auto_sync: false,
    }
}

#[test]
fn plain_directory_is_not_a_repo() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = SyncEngine::new(dir.path());
    assert!(!engine.is_repo());
    assert!(!engine.has_remote());
    assert!(!engine.stage_changes(None).expect("not a contract violation"));
    assert!(!engine.sync(None, "Update todo.txt", SyncOptions::default()));
}

#[test]
fn init_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = SyncEngine::new(dir.path().join("data"));
    assert!(engine.init());
    assert!(engine.is_repo());
    assert!(engine.init());
}

#[test]
fn add_remote_replaces_changed_url() {
    let repo = TestRepo::init().expect("repo");
    let engine = repo.engine();
    assert!(engine.add_remote("origin", "/srv/git/one.git"));
    assert!(engine.add_remote("origin", "/srv/git/one.git"));
    assert!(engine.add_remote("origin", "/srv/git/two.git"));

    assert_eq!(engine.remotes(), vec!["origin".to_string()]);
    let remote = repo.repo().find_remote("origin").expect("remote");
    assert_eq!(remote.url(), Some("/srv/git/two.git"));
}

#[test]
fn staging_outside_root_is_contract_violation() {
    let repo = TestRepo::init().expect("repo");
    let outside = tempfile::tempdir().expect("tempdir");
    let stray = outside.path().join("todo.txt");
    fs::write(&stray, "stray\n").expect("write");

    let err = repo
        .engine()
        .stage_changes(Some(&stray))
        .expect_err("outside path");
    assert!(err.is_contract_violation());
    assert_eq!(err.exit_code(), 2);

    let outcome = repo
        .engine()
        .sync_report(Some(&stray), "Update todo.txt", SyncOptions::default());
    assert_eq!(outcome, SyncOutcome::ContractViolation);
    assert_eq!(repo.commit_count(), 0);
}

#[test]
fn commit_requires_message_and_changes() {
    let repo = TestRepo::init().expect("repo");
    repo.write_file("todo.txt", "first\n").expect("write");
    let engine = repo.engine();

    assert!(engine.stage_changes(Some(&repo.todo_path())).expect("stage"));
    assert!(!engine.commit(""));
    assert!(engine.commit("first"));
    assert!(!engine.commit("nothing changed"));
    assert_eq!(repo.commit_count(), 1);
}

#[test]
fn staging_a_deleted_file_records_removal() {
    let repo = TestRepo::init().expect("repo");
    repo.write_file("todo.txt", "first\n").expect("write");
    repo.commit_all("seed").expect("commit");
    fs::remove_file(repo.todo_path()).expect("remove");

    let engine = repo.engine();
    assert!(engine.stage_changes(Some(&repo.todo_path())).expect("stage"));
    assert!(!engine.is_clean().expect("status"));
    assert!(engine.commit("drop list"));
}

#[test]
fn sync_on_clean_tree_does_not_commit() {
    let repo = TestRepo::init().expect("repo");
    repo.write_file("todo.txt", "seeded\n").expect("write");
    repo.commit_all("seed").expect("commit");
    let before = repo.commit_count();

    let outcome = repo.engine().sync_report(
        Some(&repo.todo_path()),
        "Update todo.txt",
        SyncOptions::default(),
    );
    assert_eq!(outcome, SyncOutcome::Clean);
    assert!(outcome.is_success());
    assert_eq!(repo.commit_count(), before);
}

#[test]
fn store_write_commits_with_file_name() {
    let repo = TestRepo::init().expect("repo");
    let store = repo.store(local_only());
    let mut tasks = vec![codec::parse("(B) write report"), codec::parse("(A) call bank")];

    let status = store.write(&mut tasks).expect("write");
    assert_eq!(
        status,
        SyncStatus::Synced(SyncOutcome::Committed { pushed: None })
    );
    assert_eq!(repo.head_message().as_deref(), Some("Update todo.txt"));
    assert_eq!(
        repo.read_file("todo.txt").expect("read"),
        "(A) call bank\n(B) write report\n"
    );
}

#[test]
fn auto_commit_off_leaves_changes_staged() {
    let repo = TestRepo::init().expect("repo");
    let options = StoreOptions {
        auto_commit: false,
        ..local_only()
    };
    let status = repo
        .store(options)
        .append(codec::parse("draft"))
        .expect("append");

    assert_eq!(status, SyncStatus::Synced(SyncOutcome::Staged));
    assert_eq!(repo.commit_count(), 0);
    assert!(!repo.engine().is_clean().expect("status"));
}

#[test]
fn pull_without_remote_is_noop_success() {
    let repo = TestRepo::init().expect("repo");
    let engine = repo.engine();
    assert_eq!(engine.try_pull().expect("pull"), PullOutcome::NoRemote);
    assert!(engine.pull());
}

#[test]
fn push_needs_remote_and_branch() {
    let repo = TestRepo::init().expect("repo");
    let engine = repo.engine();
    let (kind, _) = engine.try_push().expect_err("no remote");
    assert_eq!(kind, PushFailure::NoRemote);

    assert!(engine.add_remote("origin", "/srv/git/unused.git"));
    let (kind, _) = engine.try_push().expect_err("unborn branch");
    assert_eq!(kind, PushFailure::DetachedHead);
    assert!(!engine.push());
}

#[test]
fn changes_travel_between_devices() {
    let remote = BareRemote::init().expect("remote");
    let laptop = TestRepo::with_remote(&remote).expect("laptop");
    let phone = TestRepo::with_remote(&remote).expect("phone");

    let status = laptop
        .store(StoreOptions::default())
        .append(codec::parse("(A) buy milk"))
        .expect("append");
    assert_eq!(
        status,
        SyncStatus::Synced(SyncOutcome::Committed { pushed: Some(true) })
    );
    let branch = laptop.engine().current_branch().expect("branch");
    assert_eq!(
        remote.file_on(&branch, "todo.txt").as_deref(),
        Some("(A) buy milk\n")
    );

    let tasks = phone.store(StoreOptions::default()).read().expect("read");
    assert_eq!(tasks, vec![codec::parse("(A) buy milk")]);
    assert_eq!(phone.engine().current_branch(), Some(branch));
}

#[test]
fn remote_without_branch_is_not_an_error() {
    let remote = BareRemote::init().expect("remote");
    let repo = TestRepo::with_remote(&remote).expect("repo");
    repo.write_file("todo.txt", "local only\n").expect("write");
    repo.commit_all("seed").expect("commit");

    assert_eq!(
        repo.engine().try_pull().expect("pull"),
        PullOutcome::NoRemoteBranch
    );
}

#[test]
fn diverged_histories_merge_when_files_differ() {
    let remote = BareRemote::init().expect("remote");
    let laptop = TestRepo::with_remote(&remote).expect("laptop");
    let phone = TestRepo::with_remote(&remote).expect("phone");

    laptop
        .store(StoreOptions::default())
        .append(codec::parse("first"))
        .expect("append");
    phone.store(StoreOptions::default()).read().expect("read");

    phone
        .write_file("done.txt", "x 2024-01-01 old chore\n")
        .expect("write");
    phone.commit_all("archive").expect("commit");

    laptop
        .store(StoreOptions::default())
        .append(codec::parse("second"))
        .expect("append");

    let phone_engine = phone.engine();
    assert_eq!(phone_engine.try_pull().expect("pull"), PullOutcome::Merged);
    assert_eq!(phone.read_file("todo.txt").expect("read"), "first\nsecond\n");
    assert!(phone_engine.is_clean().expect("status"));

    assert!(phone_engine.push());
    let branch = phone_engine.current_branch().expect("branch");
    assert_eq!(
        remote.file_on(&branch, "done.txt").as_deref(),
        Some("x 2024-01-01 old chore\n")
    );
}

#[test]
fn push_behind_remote_is_non_fast_forward() {
    let remote = BareRemote::init().expect("remote");
    let laptop = TestRepo::with_remote(&remote).expect("laptop");
    let phone = TestRepo::with_remote(&remote).expect("phone");

    laptop
        .store(StoreOptions::default())
        .append(codec::parse("first"))
        .expect("append");
    phone.store(StoreOptions::default()).read().expect("read");
    laptop
        .store(StoreOptions::default())
        .append(codec::parse("second"))
        .expect("append");

    phone.write_file("done.txt", "x done\n").expect("write");
    phone.commit_all("local").expect("commit");

    let (kind, _) = phone.engine().try_push().expect_err("behind remote");
    assert_eq!(kind, PushFailure::NonFastForward);
}

#[test]
fn conflicting_edits_are_left_for_the_user() {
    let remote = BareRemote::init().expect("remote");
    let laptop = TestRepo::with_remote(&remote).expect("laptop");
    let phone = TestRepo::with_remote(&remote).expect("phone");

    laptop
        .store(StoreOptions::default())
        .append(codec::parse("call mom"))
        .expect("append");
    phone.store(StoreOptions::default()).read().expect("read");

    let mut edited = vec![codec::parse("(A) call mom")];
    laptop
        .store(StoreOptions::default())
        .write(&mut edited)
        .expect("write");

    phone
        .write_file("todo.txt", "call mom +family\n")
        .expect("write");
    phone.commit_all("local edit").expect("commit");

    match phone.engine().try_pull().expect("pull") {
        PullOutcome::Conflicted(paths) => assert_eq!(paths, vec![PathBuf::from("todo.txt")]),
        other => panic!("expected conflict, got {other:?}"),
    }
    assert!(phone.repo().index().expect("index").has_conflicts());
}

#[test]
fn unreachable_remote_keeps_local_commit() {
    let repo = TestRepo::init().expect("repo");
    let missing = repo.path().join("no-such-remote.git");
    assert!(repo
        .engine()
        .add_remote("origin", &missing.to_string_lossy()));

    let store = repo.store(StoreOptions::default());
    let status = store.append(codec::parse("offline task")).expect("append");
    assert_eq!(
        status,
        SyncStatus::Synced(SyncOutcome::Committed {
            pushed: Some(false)
        })
    );
    assert_eq!(repo.commit_count(), 1);
    assert_eq!(store.read().expect("read"), vec![codec::parse("offline task")]);
}

#[test]
fn resolved_conflict_commits_as_merge_and_pushes() {
    let remote = BareRemote::init().expect("remote");
    let laptop = TestRepo::with_remote(&remote).expect("laptop");
    let phone = TestRepo::with_remote(&remote).expect("phone");

    laptop
        .store(StoreOptions::default())
        .append(codec::parse("call mom"))
        .expect("append");
    phone.store(StoreOptions::default()).read().expect("read");

    let mut edited = vec![codec::parse("(A) call mom")];
    laptop
        .store(StoreOptions::default())
        .write(&mut edited)
        .expect("write");

    phone
        .write_file("todo.txt", "call mom +family\n")
        .expect("write");
    phone.commit_all("local edit").expect("commit");
    let engine = phone.engine();
    assert!(matches!(
        engine.try_pull().expect("pull"),
        PullOutcome::Conflicted(_)
    ));

    // A second pull while the merge is open must not touch the file again.
    phone
        .write_file("todo.txt", "(A) call mom +family\n")
        .expect("resolve");
    assert_eq!(
        engine.try_pull().expect("pull"),
        PullOutcome::Conflicted(vec![PathBuf::from("todo.txt")])
    );
    assert_eq!(
        phone.read_file("todo.txt").expect("read"),
        "(A) call mom +family\n"
    );

    let store = phone.store(StoreOptions::default());
    let mut resolved = vec![codec::parse("(A) call mom +family")];
    let status = store.write(&mut resolved).expect("write");
    assert_eq!(
        status,
        SyncStatus::Synced(SyncOutcome::Committed { pushed: Some(true) })
    );

    let head = phone.repo().head().expect("head").peel_to_commit().expect("commit");
    assert_eq!(head.parent_count(), 2);
    assert_eq!(phone.repo().state(), git2::RepositoryState::Clean);

    let branch = engine.current_branch().expect("branch");
    assert_eq!(
        remote.file_on(&branch, "todo.txt").as_deref(),
        Some("(A) call mom +family\n")
    );
    assert_eq!(store.read().expect("read"), resolved);
    assert_eq!(engine.try_pull().expect("pull"), PullOutcome::UpToDate);
}
