//! End-to-end tests that run the `lumen` binary.

use std::path::Path;
use std::process::{Command, Output};

use lumen_ir::{BodyBuilder, Function, JumpKind, ModuleInfo, Program, TypeDb};

fn lumen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lumen"))
        .args(args)
        .output()
        .unwrap()
}

fn write_program(path: &Path) {
    let mut program = Program::new(ModuleInfo::default());
    program.name = Some("blur".to_string());
    let main = program.declare_function(Function::declare("main", Vec::new(), None));
    let mut b = BodyBuilder::new(&mut program, main);
    let block = b.block();
    b.load_const(block, 32, &[42]);
    b.jump(block, JumpKind::Return);
    b.finish().unwrap();
    let bytes = lumen_serialize::serialize(&program, &TypeDb::new()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

#[test]
fn inspect_prints_the_program() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("blur.bin");
    write_program(&file);

    let out = lumen(&["inspect", file.to_str().unwrap()]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("\"blur\""), "{stdout}");
    assert!(stdout.contains("main"), "{stdout}");
}

#[test]
fn inspect_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("blur.bin");
    write_program(&file);

    let out = lumen(&["--quiet", "inspect", "--summary", file.to_str().unwrap()]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("functions: 1"), "{stdout}");
    assert!(stdout.contains("instructions: 2"), "{stdout}");
    assert!(out.stderr.is_empty());
}

#[test]
fn verify_accepts_a_valid_buffer() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("blur.bin");
    write_program(&file);

    let out = lumen(&["verify", file.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Verified"));
}

#[test]
fn verify_rejects_a_truncated_buffer() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("blur.bin");
    write_program(&file);
    let bytes = std::fs::read(&file).unwrap();
    std::fs::write(&file, &bytes[..bytes.len() / 2]).unwrap();

    let out = lumen(&["verify", file.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("truncated"));
}

#[test]
fn cache_stats_on_an_empty_project() {
    let tmp = tempfile::tempdir().unwrap();
    let out = lumen(&["--config", tmp.path().to_str().unwrap(), "cache", "stats"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("entries: 0"));
}

#[test]
fn bad_config_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("lumen.toml");
    std::fs::write(&config, "[cache]\ndir = \"\"\n").unwrap();
    let out = lumen(&["--config", config.to_str().unwrap(), "cache", "gc"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("error:"));
}
