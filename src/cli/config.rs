//! `todoline config` subcommands.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::paths::Paths;

use super::Globals;

fn load(globals: &Globals) -> Result<(PathBuf, Config)> {
    let dir = Paths::data_dir(globals.dir.as_deref())?;
    let config = Config::load_or_default(&dir)?;
    Ok((Config::path_in(&dir), config))
}

fn render(header: &str, config: &Config) -> (BTreeMap<&'static str, String>, HumanOutput) {
    let mut human = HumanOutput::new(header);
    let mut data = BTreeMap::new();
    for (key, value) in config.entries() {
        human.push_summary(key, value.clone());
        data.insert(key, value);
    }
    (data, human)
}

pub fn run_show(globals: Globals) -> Result<()> {
    let (_, config) = load(&globals)?;
    let (data, human) = render("Current configuration:", &config);
    emit_success(globals.output(), "config show", &data, Some(&human))
}

pub fn run_get(key: &str, globals: Globals) -> Result<()> {
    let (_, config) = load(&globals)?;
    let value = config.get(key)?;
    let human = HumanOutput::new(format!("{key}: {value}"));
    let data = BTreeMap::from([(key, value)]);
    emit_success(globals.output(), "config get", &data, Some(&human))
}

pub fn run_set(key: &str, value: &str, globals: Globals) -> Result<()> {
    let (path, mut config) = load(&globals)?;
    config.set(key, value)?;
    config.save(&path)?;

    let stored = config.get(key)?;
    let human = HumanOutput::new(format!("Set {key} = {stored}"));
    let data = BTreeMap::from([(key, stored)]);
    emit_success(globals.output(), "config set", &data, Some(&human))
}

pub fn run_reset(globals: Globals) -> Result<()> {
    let (path, mut config) = load(&globals)?;
    config.reset();
    config.save(&path)?;
    let (data, human) = render("Configuration reset to defaults:", &config);
    emit_success(globals.output(), "config reset", &data, Some(&human))
}
