use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const BROKEN_FRAGMENT: &str = "#version 450\nvoid main() {\n";

fn aurora(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aurora"))
        .env("AURORA_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run aurora")
}

#[test]
fn check_accepts_bundled_shaders() {
    let root = TempDir::new().unwrap();
    let output = aurora(root.path(), &["check"]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(bundled)"));
    assert!(stdout.contains("position"));
    assert!(stdout.contains("iTime"));
    assert!(stdout.contains("iResolution"));
}

#[test]
fn check_reports_compiler_diagnostic() {
    let root = TempDir::new().unwrap();
    let fragment = root.path().join("broken.frag");
    fs::write(&fragment, BROKEN_FRAGMENT).unwrap();

    let output = aurora(
        root.path(),
        &["check", "--fragment", fragment.to_str().unwrap()],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to compile fragment shader"), "{stderr}");
}

#[test]
fn check_rejects_mistyped_resolution_uniform() {
    let root = TempDir::new().unwrap();
    let fragment = root.path().join("vec3.frag");
    fs::write(
        &fragment,
        "#version 450
layout(location = 0) out vec4 fragColor;
layout(std140, set = 0, binding = 0) uniform Params { float iTime; vec3 iResolution; };
void main() { fragColor = vec4(gl_FragCoord.xy / iResolution.xy, iTime, 1.0); }
",
    )
    .unwrap();

    let output = aurora(
        root.path(),
        &["check", "--fragment", fragment.to_str().unwrap()],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("uniform 'iResolution'"), "{stderr}");
}

#[test]
fn check_uses_shader_from_config_file() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("broken.frag"), BROKEN_FRAGMENT).unwrap();
    fs::write(
        root.path().join("aurora.toml"),
        "version = 1\n[shader]\nfragment = \"broken.frag\"\n",
    )
    .unwrap();

    let output = aurora(root.path(), &["check"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("fragment shader"), "{stderr}");
}

#[test]
fn invalid_config_is_rejected() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("aurora.toml"), "version = 2\n").unwrap();

    let output = aurora(root.path(), &["check"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported config version 2"), "{stderr}");
}

#[test]
fn where_prints_config_location() {
    let root = TempDir::new().unwrap();
    let output = aurora(root.path(), &["where"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("AURORA_CONFIG_DIR"));
    assert!(stdout.contains(&root.path().join("aurora.toml").display().to_string()));
    assert!(stdout.contains("missing"));
}
