// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rhai::{Dynamic, Engine, EvalAltResult, Map, Scope};
use tend_core::{State, Target};

use crate::error::ConfigError;
use crate::script::{Accumulator, AuthScript, TargetScript};

/// Reads every `*.js` file directly under `dir` (sorted by filename),
/// evaluates them as one `rhai` scope, and returns the resulting
/// [`State`] with `HOSTNAME` bound to `hostname` and `ENV` bound to
/// `process_env`.
pub fn load(dir: &Path, hostname: &str, process_env: &BTreeMap<String, String>) -> Result<State, ConfigError> {
    let source = concatenate_scripts(dir)?;
    let accumulator = Arc::new(Mutex::new(Accumulator {
        env: process_env.clone(),
        ..Accumulator::default()
    }));

    let engine = build_engine(Arc::clone(&accumulator));
    let mut scope = Scope::new();
    scope.push_constant("HOSTNAME", hostname.to_string());
    scope.push_constant("ENV", env_to_map(process_env));

    engine
        .eval_with_scope::<Dynamic>(&mut scope, &source)
        .map_err(|e| ConfigError::Script(e.to_string()))?;
    drop(engine); // drops the closures' Arc clones

    let accumulator = std::mem::take(&mut *accumulator.lock());

    let mut state: State = serde_json::from_value(accumulator.into_state_json())?;

    for target in &mut state.targets {
        let mut merged = state.env.clone();
        merged.extend(std::mem::take(&mut target.env));
        target.env = merged;
    }

    state.targets = validate_targets(state.targets)?;
    check_no_duplicate_working_dirs(&state)?;

    Ok(state)
}

fn concatenate_scripts(dir: &Path) -> Result<String, ConfigError> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .map_err(|source| ConfigError::ReadDir {
            path: dir.display().to_string(),
            source,
        })?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("js"))
        .collect();
    paths.sort();

    let mut source = String::new();
    for path in paths {
        let contents = std::fs::read_to_string(&path).map_err(|source_err| ConfigError::ReadScript {
            path: path.display().to_string(),
            source: source_err,
        })?;
        source.push_str(&contents);
        source.push('\n');
    }
    Ok(source)
}

fn build_engine(accumulator: Arc<Mutex<Accumulator>>) -> Engine {
    let mut engine = Engine::new();

    let target_acc = Arc::clone(&accumulator);
    engine.register_fn("T", move |obj: Map| -> Result<(), Box<EvalAltResult>> {
        let script: TargetScript = rhai::serde::from_dynamic(&Dynamic::from_map(obj))
            .map_err(|e| format!("T(): {e}"))?;
        target_acc.lock().targets.push(script);
        Ok(())
    });

    let env_acc = Arc::clone(&accumulator);
    engine.register_fn("E", move |key: String, value: String| {
        env_acc.lock().env.insert(key, value);
    });

    let auth_acc = Arc::clone(&accumulator);
    engine.register_fn("A", move |obj: Map| -> Result<String, Box<EvalAltResult>> {
        let script: AuthScript =
            rhai::serde::from_dynamic(&Dynamic::from_map(obj)).map_err(|e| format!("A(): {e}"))?;
        let name = script.name.clone();
        auth_acc.lock().auths.push(script);
        Ok(name)
    });

    engine
}

fn env_to_map(env: &BTreeMap<String, String>) -> Map {
    env.iter()
        .map(|(k, v)| (k.into(), Dynamic::from(v.clone())))
        .collect()
}

/// Re-runs [`Target::new`]'s construction-time checks (empty `up`, chiefly)
/// against targets that arrived via `serde` deserialization rather than
/// through that constructor directly.
fn validate_targets(targets: Vec<Target>) -> Result<Vec<Target>, ConfigError> {
    targets
        .into_iter()
        .map(|target| {
            let Target {
                name,
                url,
                branch,
                up,
                down,
                env,
                initial_run,
                auth,
            } = target;
            let err_name = name.clone();
            Target::new(name, url, branch, up, down, env, initial_run, auth)
                .map_err(|source| ConfigError::InvalidTarget { name: err_name, source })
        })
        .collect()
}

fn check_no_duplicate_working_dirs(state: &State) -> Result<(), ConfigError> {
    let mut seen: BTreeMap<std::path::PathBuf, &str> = BTreeMap::new();
    for target in &state.targets {
        let dir = target.working_dir(Path::new(""));
        if let Some(first) = seen.insert(dir.clone(), target.name.as_str()) {
            return Err(ConfigError::DuplicateWorkingDir {
                first: first.to_string(),
                second: target.name.clone(),
                directory: dir,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_script(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).expect("write script");
    }

    #[test]
    fn loads_a_single_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_script(
            dir.path(),
            "01-app.js",
            r#"T(#{ name: "app", url: "https://example.com/app.git", up: ["true"] });"#,
        );

        let state = load(dir.path(), "host-a", &BTreeMap::new()).expect("load");
        assert_eq!(state.targets.len(), 1);
        assert_eq!(state.targets[0].name, "app");
    }

    #[test]
    fn missing_required_field_fails_whole_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_script(dir.path(), "01-app.js", r#"T(#{ name: "app" });"#);

        let result = load(dir.path(), "host-a", &BTreeMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn global_env_merges_into_target_env_with_target_winning() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_script(
            dir.path(),
            "01-app.js",
            r#"
            E("SHARED", "global");
            T(#{ name: "app", url: "https://example.com/app.git", up: ["true"],
                 env: #{ "SHARED": "local", "ONLY_LOCAL": "x" } });
            "#,
        );

        let state = load(dir.path(), "host-a", &BTreeMap::new()).expect("load");
        let target = &state.targets[0];
        assert_eq!(target.env.get("SHARED"), Some(&"local".to_string()));
        assert_eq!(target.env.get("ONLY_LOCAL"), Some(&"x".to_string()));
    }

    #[test]
    fn auth_registers_and_returns_its_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_script(
            dir.path(),
            "01-app.js",
            r#"
            let auth_name = A(#{ name: "gh", path: "secret/gh", user_key: "u", pass_key: "p" });
            T(#{ name: "app", url: "https://example.com/app.git", up: ["true"], auth: auth_name });
            "#,
        );

        let state = load(dir.path(), "host-a", &BTreeMap::new()).expect("load");
        assert_eq!(state.auths.len(), 1);
        assert_eq!(state.targets[0].auth.as_deref(), Some("gh"));
    }

    #[test]
    fn empty_up_command_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_script(
            dir.path(),
            "01-app.js",
            r#"T(#{ name: "app", url: "https://example.com/app.git", up: [] });"#,
        );

        let result = load(dir.path(), "host-a", &BTreeMap::new());
        assert!(matches!(result, Err(ConfigError::InvalidTarget { .. })));
    }

    #[test]
    fn duplicate_working_directory_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_script(
            dir.path(),
            "01-app.js",
            r#"
            T(#{ name: "app", url: "https://example.com/a.git", up: ["true"] });
            T(#{ name: "app", url: "https://example.com/b.git", up: ["true"] });
            "#,
        );

        let result = load(dir.path(), "host-a", &BTreeMap::new());
        assert!(matches!(result, Err(ConfigError::DuplicateWorkingDir { .. })));
    }

    #[test]
    fn scripts_run_in_sorted_filename_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_script(dir.path(), "02-second.js", r#"E("ORDER", "second");"#);
        write_script(dir.path(), "01-first.js", r#"E("ORDER", "first");"#);

        let state = load(dir.path(), "host-a", &BTreeMap::new()).expect("load");
        assert_eq!(state.env.get("ORDER"), Some(&"second".to_string()));
    }
}
