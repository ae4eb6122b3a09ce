//! End-to-end tests that run the coderzz binary.
//!
//! Gated behind the `integration` feature flag. Run with:
//!
//! ```sh
//! cargo test -p coderzz-cli --features integration
//! ```

#![cfg(feature = "integration")]

use std::process::Command;

use tempfile::TempDir;

/// Run coderzz with an isolated config (simulated provider, greedy policy).
fn coderzz(args: &[&str]) -> std::process::Output {
    let config_home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    std::fs::write(
        project.path().join("config.toml"),
        "[generation]\nprovider = \"simulated\"\n\n[policy]\nepsilon = 0.0\n",
    )
    .unwrap();

    Command::new(env!("CARGO_BIN_EXE_coderzz"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home.path())
        .env("CODERZZ_PROJECT_CONFIG_DIR", project.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run coderzz")
}

#[test]
fn coderzz_help_lists_commands() {
    let output = coderzz(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["ask", "chat", "serve", "models", "config"] {
        assert!(stdout.contains(command), "missing {command}");
    }
}

#[test]
fn coderzz_ask_streams_simulated_answer() {
    let output = coderzz(&["ask", "--language", "python", "sort", "a", "list"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("# Generated code for: "));
    assert!(stdout.contains("Generate Python code for: sort a list"));
}

#[test]
fn coderzz_ask_with_forced_template() {
    let output = coderzz(&["ask", "--action", "Optimized code", "reverse a string"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Write optimized"));
}

#[test]
fn coderzz_ask_without_question_fails() {
    let output = coderzz(&["ask"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No question"));
}

#[test]
fn coderzz_config_show_reflects_project_layer() {
    let output = coderzz(&["config", "show"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("provider = \"simulated\""));
    assert!(stdout.contains("epsilon = 0.0"));
}

#[test]
fn coderzz_models_lists_simulated_model() {
    let output = coderzz(&["models"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("simulated"));
}
