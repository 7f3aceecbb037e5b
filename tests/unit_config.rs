use std::fs;
use std::path::PathBuf;

use todoline::config::Config;
use todoline::paths::Paths;
use todoline::store::StoreOptions;
use todoline::Error;

#[test]
fn config_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load_or_default(dir.path()).expect("defaults");

    assert_eq!(config.todo_file, "todo.txt");
    assert_eq!(config.done_file, "done.txt");
    assert_eq!(config.default_priority, None);
    assert!(config.auto_commit);
    assert!(config.auto_sync);
    assert!(config.auto_sort);
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toml = r#"
todo_file = "work.txt"
default_priority = "C"
auto_sync = false
auto_sort = false
"#;
    fs::write(Config::path_in(dir.path()), toml)?;

    let config = Config::load_or_default(dir.path())?;
    assert_eq!(config.todo_file, "work.txt");
    assert_eq!(config.done_file, "done.txt");
    assert_eq!(config.default_priority, Some('C'));

    let options = StoreOptions::from(&config);
    assert_eq!(
        options,
        StoreOptions {
            auto_sort: false,
            auto_commit: true,
            auto_sync: false,
        }
    );

    if std::env::var_os("TODO_FILE").is_none() {
        let paths = Paths::resolve(PathBuf::from("/data"), &config);
        assert_eq!(paths.todo_file, PathBuf::from("/data/work.txt"));
    }
    Ok(())
}

#[test]
fn config_rejects_malformed_toml() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(Config::path_in(dir.path()), "auto_sync = \"sometimes\"\n").expect("write");
    let err = Config::load_or_default(dir.path()).unwrap_err();
    assert!(matches!(err, Error::TomlParse(_)));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn config_rejects_empty_file_names() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(Config::path_in(dir.path()), "todo_file = \"\"\n").expect("write");
    assert!(matches!(
        Config::load_or_default(dir.path()),
        Err(Error::InvalidConfig(_))
    ));
}
