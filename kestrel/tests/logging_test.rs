use kestrel::logging::{self, LogConfig};

#[test]
fn test_repeated_init_is_harmless() {
    logging::init_test();
    logging::init_default();
    logging::init(LogConfig::default());
    tracing::info!("still logging");
}

#[test]
fn test_init_with_unwritable_file_fails() {
    let result = logging::init_with_file(LogConfig::default(), "/nonexistent-dir/kestrel/run.log");
    assert!(result.is_err());
}

#[test]
fn test_file_writer_appends() {
    use std::io::Write;

    let path = std::env::temp_dir().join(format!("kestrel-log-{}.log", std::process::id()));
    let path = path.to_str().unwrap().to_string();

    let mut writer = logging::file_writer(&path).unwrap();
    writer.write_all(b"first\n").unwrap();
    drop(writer);
    let mut writer = logging::file_writer(&path).unwrap();
    writer.write_all(b"second\n").unwrap();
    drop(writer);

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    std::fs::remove_file(&path).unwrap();
}
