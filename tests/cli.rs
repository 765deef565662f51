use assert_cmd::Command;
use chrono::{Duration, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(deprecated)]
fn progress_cmd(history: &Path) -> Command {
    let mut cmd = Command::cargo_bin("speech-progress").unwrap();
    cmd.env_remove("SPEECH_PROGRESS_TOKEN");
    cmd.arg("--history-file").arg(history);
    cmd
}

fn days_ago(days: i64) -> String {
    (Utc::now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn write_history(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("history.json");
    std::fs::write(&path, body).unwrap();
    path
}

fn sample_history(dir: &TempDir) -> PathBuf {
    let body = format!(
        r#"{{
  "user": "sam",
  "speeches": [
    {{
      "id": 1,
      "transcript": "Hello, world",
      "created_at": "{yesterday}",
      "feedback": {{
        "delivery": "{{\"summary\": \"Rushed\", \"score\": 60}}",
        "scores": {{ "overall": 70, "delivery": 10 }},
        "suggestions": ["Add pauses before each point"]
      }}
    }},
    {{
      "id": 2,
      "transcript": "Second run",
      "created_at": "{today}",
      "feedback": {{
        "opening": "not json {{broken",
        "overall": {{ "summary": "Better", "score": 80 }},
        "scores": {{ "delivery": 75 }}
      }}
    }}
  ]
}}"#,
        yesterday = days_ago(1),
        today = days_ago(0)
    );
    write_history(dir, &body)
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn summary_prints_averages_streak_and_hint() {
    let dir = TempDir::new().unwrap();
    let history = sample_history(&dir);

    let stdout = stdout_of(progress_cmd(&history).arg("summary"));
    assert!(stdout.contains("Sessions: 2 total, 2 in last 30 days"), "{stdout}");
    assert!(stdout.contains("- Overall: 75.0"), "{stdout}");
    assert!(stdout.contains("- Delivery: 67.5"), "{stdout}");
    assert!(stdout.contains("- Opening: —"), "{stdout}");
    assert!(stdout.contains("Streak: 2 day(s)"), "{stdout}");
    assert!(stdout.contains("Best session: #2"), "{stdout}");
    assert!(stdout.contains("Hint (pauses)"), "{stdout}");
}

#[test]
fn summary_json_exposes_snapshot() {
    let dir = TempDir::new().unwrap();
    let history = sample_history(&dir);

    let stdout = stdout_of(progress_cmd(&history).args(["summary", "--json", "--hide", "grammar"]));
    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(snapshot["record_count"], 2);
    assert_eq!(snapshot["averages"]["overall"], 75.0);
    assert!(snapshot["averages"]["grammar"].is_null());
    assert_eq!(snapshot["series"].as_array().unwrap().len(), 4);
    assert_eq!(snapshot["chart"]["kind"], "plot");
}

#[test]
fn export_quotes_transcripts_with_commas() {
    let dir = TempDir::new().unwrap();
    let history = sample_history(&dir);
    let out = dir.path().join("scores.csv");

    progress_cmd(&history)
        .args(["export", "--out"])
        .arg(&out)
        .assert()
        .success();

    let csv = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "id,date,opening,content,delivery,grammar,overall,transcript");
    assert!(lines[1].starts_with("1,"));
    assert!(lines[1].ends_with(",,60,,70,\"Hello, world\""), "{}", lines[1]);
    assert!(lines[2].ends_with(",,75,,80,Second run"), "{}", lines[2]);
}

#[test]
fn filtered_export_drops_sessions_outside_range() {
    let dir = TempDir::new().unwrap();
    let body = format!(
        r#"[{{"id": 1, "created_at": "{old}"}}, {{"id": 2, "created_at": "{recent}"}}]"#,
        old = days_ago(40),
        recent = days_ago(2)
    );
    let history = write_history(&dir, &body);
    let out = dir.path().join("filtered.csv");

    progress_cmd(&history)
        .args(["export", "--scope", "filtered", "--range", "7", "--out"])
        .arg(&out)
        .assert()
        .success();

    let csv = std::fs::read_to_string(&out).unwrap();
    let ids: Vec<&str> = csv
        .lines()
        .skip(1)
        .filter_map(|line| line.split(',').next())
        .collect();
    assert_eq!(ids, vec!["2"]);
}

#[test]
fn chart_writes_svg_and_empty_state() {
    let dir = TempDir::new().unwrap();
    let history = sample_history(&dir);
    let out = dir.path().join("chart.svg");

    let stdout = stdout_of(progress_cmd(&history).args(["chart", "--smooth", "--out"]).arg(&out));
    assert!(stdout.contains("Chart written"));
    let svg = std::fs::read_to_string(&out).unwrap();
    assert!(svg.contains("<polyline"));

    let stale = write_history(
        &dir,
        &format!(r#"[{{"id": 1, "created_at": "{}", "feedback": {{"scores": {{"overall": 50}}}}}}]"#, days_ago(60)),
    );
    let stdout = stdout_of(progress_cmd(&stale).args(["chart", "--range", "7", "--out"]).arg(&out));
    assert!(stdout.contains("No sessions in this range"));
    let svg = std::fs::read_to_string(&out).unwrap();
    assert!(svg.contains("No sessions in this range yet."));
}

#[test]
fn hover_on_rendered_point_selects_it() {
    let dir = TempDir::new().unwrap();
    let body = format!(
        r#"[{{"id": 4, "created_at": "{}", "feedback": {{"overall": {{"score": 80}}}}}}]"#,
        days_ago(1)
    );
    let history = write_history(&dir, &body);

    // A lone timestamp sits on the left padding edge; 80 maps to y = 88.
    let stdout = stdout_of(progress_cmd(&history).args(["hover", "--x", "40", "--y", "88"]));
    assert!(stdout.starts_with("Overall ·"), "{stdout}");
    assert!(stdout.contains("(session #4, 0.0px away)"), "{stdout}");
}

#[test]
fn report_is_written() {
    let dir = TempDir::new().unwrap();
    let history = sample_history(&dir);
    let out = dir.path().join("report.md");

    progress_cmd(&history)
        .args(["report", "--range", "all", "--out"])
        .arg(&out)
        .assert()
        .success();

    let report = std::fs::read_to_string(&out).unwrap();
    assert!(report.starts_with("# Speaking Progress Report"));
    assert!(report.contains("| Overall | 75.0 |"));
    assert!(report.contains("- **Opening**: not json {broken"));
}

#[test]
fn empty_history_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let history = write_history(&dir, r#"{"user": "sam", "speeches": []}"#);

    let stdout = stdout_of(progress_cmd(&history).arg("summary"));
    assert!(stdout.contains("No sessions recorded yet."));
}

#[test]
#[allow(deprecated)]
fn api_mode_requires_a_token() {
    let output = Command::cargo_bin("speech-progress")
        .unwrap()
        .env_remove("SPEECH_PROGRESS_TOKEN")
        .arg("summary")
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).unwrap();
    assert!(stderr.contains("SPEECH_PROGRESS_TOKEN"), "{stderr}");
}
