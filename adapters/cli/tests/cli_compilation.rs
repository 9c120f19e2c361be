use std::process::Command;

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "underpromotion"])
        .status()
        .expect("failed to invoke cargo check for underpromotion CLI binary");

    assert!(status.success(), "cargo check --bin underpromotion should succeed");
}

#[test]
fn sample_scenario_replays_from_the_command_line() {
    let scenario = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/gate_and_pit.toml");
    let output = Command::new(env!("CARGO_BIN_EXE_underpromotion"))
        .args(["--scenario", scenario, "--log-level", "off"])
        .output()
        .expect("failed to run the underpromotion binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("player: (2, 0)"), "unexpected output: {stdout}");
    assert!(stdout.contains("deaths: [Pit]"), "unexpected output: {stdout}");
}
