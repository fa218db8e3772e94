use assert_cmd::Command;

/// End-to-end: a full simulated load cycle must land in the journal as
/// valid JSON lines with the complete record shape.
#[test]
fn simulated_cycle_writes_a_wellformed_journal() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("journal.jsonl");

    // Simulated cycle: ~1 s empty, ~0.5 s ramp, ~4.5 s hold. With a 1 s
    // settle window the capture lands ~2.5 s in; 6 s leaves slack for a
    // loaded CI machine.
    Command::cargo_bin("weigh")
        .unwrap()
        .args([
            "watch",
            "--operator",
            "petrov",
            "--simulate",
            "--simulate-kg",
            "12.5",
            "--settle-secs",
            "1",
            "--duration-ms",
            "6000",
            "--journal",
        ])
        .arg(&journal)
        .assert()
        .success();

    let body = std::fs::read_to_string(&journal).expect("journal written");
    let lines: Vec<&str> = body.lines().collect();
    assert!(
        !lines.is_empty(),
        "at least one weighing should be captured in 6 s"
    );

    for line in &lines {
        let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON line");
        for key in [
            "datetime",
            "recorded_at",
            "weight_kg",
            "operator",
            "mode",
            "cargo_name",
            "sender",
            "recipient",
            "comment",
            "scale_name",
        ] {
            assert!(v.get(key).is_some(), "missing key {key} in {line}");
        }
        assert_eq!(v["operator"], "petrov");
        assert_eq!(v["mode"], "Automatic");
        assert_eq!(v["scale_name"], "Simulated");
        assert_eq!(v["cargo_name"], "-");
        let kg = v["weight_kg"].as_f64().unwrap();
        assert!((kg - 12.5).abs() < 1e-9, "plateau weight captured, got {kg}");

        // dd.mm.yyyy hh:mm
        let stamp = v["datetime"].as_str().unwrap();
        assert_eq!(stamp.len(), 16);
        assert_eq!(stamp.as_bytes()[2], b'.');
        assert_eq!(stamp.as_bytes()[5], b'.');
        assert_eq!(stamp.as_bytes()[10], b' ');
        assert_eq!(stamp.as_bytes()[13], b':');
    }

    // The anti-duplicate rule holds end to end: one cycle, one record.
    assert_eq!(lines.len(), 1, "exactly one record per load cycle");
}
