use std::fs;
use std::path::Path;
use std::process::Command;

use sb_api::{
    DetachedSurface, EngineFamily, FileStorage, InsertSource, MemoryDisplay, ParentKey,
    ScriptBundleSession, SessionOptions,
};

fn seed_ace_project(dir: &Path) {
    let path = dir.join(EngineFamily::RmvxAce.scripts_path());
    let mut options = SessionOptions::for_engine(EngineFamily::RmvxAce);
    options.random_seed = Some(5);
    let mut session = ScriptBundleSession::new_empty(MemoryDisplay::new(), options);
    let group = session
        .insert(ParentKey::Root, usize::MAX, InsertSource::named("Modules", ""))
        .expect("group");
    for name in ["Vocab", "Sound", "Cache"] {
        session
            .insert(
                ParentKey::Entry(group),
                usize::MAX,
                InsertSource::named(name, format!("module {}\nend\n", name)),
            )
            .expect("module");
    }
    session
        .insert(ParentKey::Root, usize::MAX, InsertSource::named("Main", "rgss_main { }"))
        .expect("main");
    session
        .save(&mut DetachedSurface, &mut FileStorage, &path)
        .expect("seed save");
    fs::write(
        dir.join("project.json"),
        r#"{"scriptsPath":"Data/Scripts.rvdata2","randomSeed":17}"#,
    )
    .expect("config");
}

fn run(args: &[&str]) -> String {
    let bin = env!("CARGO_BIN_EXE_sb-cli");
    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("cli should execute");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() && !stdout.contains("RESULT:ERROR") {
        panic!(
            "sb-cli {:?} failed\nstdout:\n{}\nstderr:\n{}",
            args,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    stdout
}

fn node_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| line.starts_with("NODE:"))
        .map(|line| {
            let mut parts = line.trim_start_matches("NODE:").splitn(3, '|');
            let depth = parts.next().unwrap_or_default();
            let _key = parts.next();
            format!("{}|{}", depth, parts.next().unwrap_or_default())
        })
        .collect()
}

fn key_of(stdout: &str, name: &str) -> String {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("NODE:"))
        .find(|line| line.ends_with(&format!("|\"{}\"", name)))
        .and_then(|line| line.split('|').nth(1))
        .map(str::to_string)
        .expect("script should be listed")
}

#[test]
fn configured_project_is_edited_through_the_binary() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_ace_project(dir.path());
    let config = dir.path().join("project.json");
    let config = config.to_str().expect("utf8 path");

    let tree = run(&["--config", config, "tree"]);
    assert!(tree.starts_with("RESULT:OK\nENGINE:RMVXAce\n"), "{}", tree);
    assert_eq!(
        node_lines(&tree),
        [
            "0|\"Modules\"",
            "1|\"Vocab\"",
            "1|\"Sound\"",
            "1|\"Cache\"",
            "0|\"Main\""
        ]
    );

    let sound = key_of(&tree, "Sound");
    let moved = run(&["--config", config, "move", "--key", &sound, "--direction", "up"]);
    assert!(moved.contains("INDEX:0"), "{}", moved);

    let cache = key_of(&tree, "Cache");
    let moved = run(&["--config", config, "move", "--key", &cache, "--direction", "out"]);
    assert!(moved.contains("PARENT:ROOT"), "{}", moved);

    let check = run(&["--config", config, "check"]);
    assert!(check.contains("ROUNDTRIP:OK"), "{}", check);

    let tree = run(&["--config", config, "tree"]);
    assert_eq!(
        node_lines(&tree),
        [
            "0|\"Modules\"",
            "1|\"Sound\"",
            "1|\"Vocab\"",
            "0|\"Cache\"",
            "0|\"Main\""
        ]
    );

    let show = run(&["--config", config, "show", "--key", &sound]);
    assert!(show.contains("TEXT_JSON:\"module Sound\\nend\\n\""), "{}", show);
}

#[test]
fn errors_use_the_line_protocol() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_ace_project(dir.path());
    let file = dir.path().join("Data").join("Scripts.rvdata2");
    let file = file.to_str().expect("utf8 path");

    let stdout = run(&["show", "--file", file, "--key", "1"]);
    assert!(stdout.contains("RESULT:ERROR"), "{}", stdout);
    assert!(stdout.contains("ERROR_CODE:KEY_NOT_FOUND"), "{}", stdout);
    assert!(stdout.contains("ERROR_MSG_JSON:"), "{}", stdout);

    let corrupt = dir.path().join("Broken.rxdata");
    fs::write(&corrupt, b"\x04\x08[\x06i").expect("write");
    let stdout = run(&["tree", "--file", corrupt.to_str().expect("utf8 path")]);
    assert!(stdout.contains("ERROR_CODE:CORRUPT_DATA"), "{}", stdout);
}
