use std::io::Write;
use std::process::{Command, Stdio};

fn se() -> Command {
    Command::new(env!("CARGO_BIN_EXE_se"))
}

fn stdout_of(args: &[&str]) -> String {
    let out = se().args(args).output().expect("failed to run se");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

// --- Evaluation ---

#[test]
fn inline_arithmetic() {
    assert_eq!(stdout_of(&["1 + 2 * 3"]), "7");
    assert_eq!(stdout_of(&["(1 + 2) * 3"]), "9");
}

#[test]
fn last_statement_is_printed() {
    assert_eq!(stdout_of(&["a = 5; a + 1"]), "6");
}

#[test]
fn sources_share_one_context() {
    assert_eq!(stdout_of(&["a = {1, 2, 3}", "sum(*a) * 2"]), "12");
}

#[test]
fn arrays_print_in_braces() {
    assert_eq!(stdout_of(&["{1, {0x2, 3.5}}"]), "{1, {0x2, 3.5}}");
}

#[test]
fn script_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "x = 3;").unwrap();
    writeln!(file, "y = x * x;").unwrap();
    writeln!(file, "y - 1").unwrap();
    let path = file.path().to_str().unwrap();
    assert_eq!(stdout_of(&["-f", path]), "8");
}

#[test]
fn missing_file_fails() {
    let out = se().args(["-f", "/nonexistent/script.se"]).output().expect("failed to run se");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("error reading"));
}

#[test]
fn script_from_stdin() {
    let mut child = se()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to run se");
    child.stdin.take().unwrap().write_all(b"b = 2; b << 3").unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "16");
}

// --- Errors ---

#[test]
fn runtime_error_exits_one_with_diagnostic() {
    let out = se().args(["{1, 2, 3}[5]"]).output().expect("failed to run se");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error[SE-I004]"), "stderr: {stderr}");
    assert!(stderr.contains("--> 1:12"), "stderr: {stderr}");
}

#[test]
fn json_errors() {
    let out = se().args(["f(1, 2, 3)", "--json"]).output().expect("failed to run se");
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_str(String::from_utf8_lossy(&out.stderr).trim()).unwrap();
    assert_eq!(v["code"], "SE-T001");
    assert_eq!(v["span"]["start"], 9);
}

#[test]
fn reader_errors_report_position() {
    let out = se().args(["a = 1 $ 2", "--json"]).output().expect("failed to run se");
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_str(String::from_utf8_lossy(&out.stderr).trim()).unwrap();
    assert_eq!(v["code"], "SE-S013");
    assert_eq!(v["position"]["row"], 1);
    assert_eq!(v["position"]["col"], 7);
}

// --- Emit ---

#[test]
fn emit_rpn() {
    let out = stdout_of(&["1 + 2 * 3; f(a, *b)", "--emit", "rpn"]);
    let lines: Vec<serde_json::Value> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["rpn"], "1 2 3 * +");
    assert_eq!(lines[1]["rpn"], "f call( a b *x , )call");
}

#[test]
fn emit_stream_capacities() {
    let out = stdout_of(&["{1, 2}[0]", "--emit", "stream"]);
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(v["max_element_frame"].as_u64().unwrap() >= 2);
    assert!(v["units"].as_array().unwrap().len() > 5);
}

#[test]
fn emit_tokens_skips_whitespace() {
    let out = stdout_of(&["a  +  1", "--emit", "tokens"]);
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v.as_array().unwrap().len(), 3);
}

#[test]
fn emit_does_not_execute() {
    // runtime errors are not reached when only compiling
    assert!(!stdout_of(&["1 / 0", "--emit", "stream"]).is_empty());
}

// --- Explain ---

#[test]
fn explain_known_code() {
    let out = stdout_of(&["--explain", "SE-R006"]);
    assert!(out.starts_with("## SE-R006"));
}

#[test]
fn explain_unknown_code() {
    let out = se().args(["--explain", "SE-Z999"]).output().expect("failed to run se");
    assert_eq!(out.status.code(), Some(1));
}
