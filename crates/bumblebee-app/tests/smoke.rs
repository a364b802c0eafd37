use std::process::Command;

fn run_app(args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_bumblebee-app");
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "off")
        .env_remove("BUMBLEBEE_CONFIG")
        .env_remove("BUMBLEBEE_SEED")
        .output()
        .expect("failed to run bumblebee-app binary")
}

const SMALL_RUN: [&str; 10] = [
    "--seed",
    "7",
    "--width",
    "10",
    "--height",
    "10",
    "--daily-steps",
    "30",
    "--days",
    "3",
];

#[test]
fn text_run_prints_one_row_per_day() {
    let output = run_app(&SMALL_RUN);
    assert!(output.status.success(), "headless run failed");
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 4, "unexpected output:\n{stdout}");
    assert!(lines[0].contains("fertilized"));
    assert!(lines[3].trim_start().starts_with('3'));
}

#[test]
fn json_run_emits_parseable_summaries() {
    let mut args = SMALL_RUN.to_vec();
    args.extend(["--format", "json"]);
    let output = run_app(&args);
    assert!(output.status.success(), "headless run failed");
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let days: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(days.len(), 3);
    assert_eq!(days[2]["day"], 3);
    assert_eq!(days[0]["hives"].as_array().map(Vec::len), Some(3));
}

#[test]
fn invalid_configuration_fails_cleanly() {
    let output = run_app(&["--width", "0"]);
    assert!(!output.status.success());
}
