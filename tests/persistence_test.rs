use assert_cmd::cargo_bin;
use std::ffi::OsString;
use std::process::Command;
use tempfile::tempdir;

fn run(storage: &[OsString], args: &[&str]) -> String {
    let output = Command::new(cargo_bin!("plati-parking"))
        .args(storage)
        .args(args)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "{:?} failed", args);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_state_survives(storage: &[OsString]) {
    // 1. First run: save state
    run(storage, &["register", "bg 123-ab"]);
    run(storage, &["add", "--city", "Beograd", "--zone", "Zona 1", "--sms", "9111"]);

    // 2. Second run: read it back
    let shown = run(storage, &["show"]);
    assert!(shown.contains("Registration: BG123AB"));
    assert!(shown.contains("\tBeograd\tZona 1\t9111"));
}

#[test]
fn test_file_storage_persistence_recovery() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path();
    assert_state_survives(&["--data-dir".into(), data_dir.into()]);

    let raw = std::fs::read_to_string(data_dir.join("settings.json")).unwrap();
    let settings: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(settings["vehicle_registration"], "BG123AB");
    let configs: serde_json::Value =
        serde_json::from_str(settings["parking_configs"].as_str().unwrap()).unwrap();
    assert_eq!(configs[0]["cityName"], "Beograd");
    assert_eq!(configs[0]["smsNumber"], "9111");
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    assert_state_survives(&["--db-path".into(), db_path.into()]);
}
