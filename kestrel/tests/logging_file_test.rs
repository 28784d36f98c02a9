// Runs in its own test binary: the global subscriber can only be installed once per process.

use kestrel::logging::{self, LogConfig};
use serde_json::Value;

#[test]
fn test_file_output_follows_format_settings() {
    let path = std::env::temp_dir().join(format!("kestrel-json-{}.log", std::process::id()));
    let path = path.to_str().unwrap().to_string();
    let config = LogConfig {
        json_format: true,
        show_time: false,
        ..Default::default()
    };

    logging::init_with_file(config, &path).unwrap();
    tracing::info!(runtime_id = "r1", "file sink check");

    let contents = std::fs::read_to_string(&path).unwrap();
    let line = contents
        .lines()
        .find(|line| line.contains("file sink check"))
        .expect("event written to the log file");
    let record: Value = serde_json::from_str(line).expect("file output is JSON");

    assert_eq!(record["message"], "file sink check");
    assert_eq!(record["runtime_id"], "r1");
    assert_eq!(record["level"], "INFO");
    assert!(record.get("timestamp").is_none(), "timestamp written despite show_time = false");

    std::fs::remove_file(&path).unwrap();
}
