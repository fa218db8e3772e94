use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::io::Write;

fn weigh() -> Command {
    Command::cargo_bin("weigh").expect("binary built")
}

#[rstest]
#[case("legacy", "ww00020.12kg", "20.12")]
#[case("legacy", "ww 005.5 kg", "5.5")]
#[case("stgs", "ST,GS,+000005 kg", "5")]
#[case("stgs", "ST,GS,-000012.5kg", "12.5")]
fn decode_prints_the_weight(#[case] protocol: &str, #[case] frame: &str, #[case] expected: &str) {
    weigh()
        .args(["decode", "--protocol", protocol, frame])
        .assert()
        .success()
        .stdout(format!("{expected}\n"));
}

#[test]
fn decode_rejects_an_unrecognized_frame() {
    weigh()
        .args(["decode", "garbage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("frame"));
}

#[test]
fn ports_runs_without_hardware() {
    weigh().arg("ports").assert().success();
}

#[test]
fn watch_requires_an_operator() {
    weigh()
        .args(["watch", "--simulate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--operator"));
}

#[test]
fn simulated_watch_streams_weights_and_exits_on_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("journal.jsonl");

    weigh()
        .args([
            "watch",
            "--operator",
            "petrov",
            "--simulate",
            "--duration-ms",
            "1500",
            "--journal",
        ])
        .arg(&journal)
        .assert()
        .success()
        .stdout(predicate::str::contains("Simulated: "))
        .stdout(predicate::str::contains("kg"));
}

#[test]
fn roster_miss_exits_with_the_config_code() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("roster.csv");
    let mut f = std::fs::File::create(&roster).unwrap();
    writeln!(f, "operator,name,port,baud,protocol").unwrap();
    writeln!(f, "petrov,Main gate,/dev/ttyUSB0,9600,1").unwrap();

    weigh()
        .args(["watch", "--operator", "petrov", "--link-name", "Warehouse", "--roster"])
        .arg(&roster)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Warehouse"));
}

#[test]
fn roster_with_bad_headers_is_rejected_with_a_hint() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("roster.csv");
    let mut f = std::fs::File::create(&roster).unwrap();
    writeln!(f, "user,name,port,baud,protocol").unwrap();

    weigh()
        .args(["watch", "--operator", "petrov", "--link-name", "A", "--roster"])
        .arg(&roster)
        .assert()
        .failure()
        .stderr(predicate::str::contains("operator,name,port,baud,protocol"));
}

#[test]
fn json_mode_emits_structured_errors() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("roster.csv");
    let mut f = std::fs::File::create(&roster).unwrap();
    writeln!(f, "operator,name,port,baud,protocol").unwrap();

    let out = weigh()
        .args([
            "--json",
            "watch",
            "--operator",
            "petrov",
            "--link-name",
            "A",
            "--roster",
        ])
        .arg(&roster)
        .assert()
        .failure()
        .code(2)
        .get_output()
        .clone();

    let stderr = String::from_utf8(out.stderr).unwrap();
    let v: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert_eq!(v["error"], "config_not_found");
    assert_eq!(v["ok"], false);
}
