use std::io::Write;

use idcache::{Config, ErrorKind, MembershipMode, SysDb};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write config");
    file
}

#[tokio::test]
async fn load_and_open() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file = write_config(&format!(
        r#"
        db_path = "{}"
        db_file = "ids.json"

        [[domains]]
        name = "LOCAL"
        min_id = 1000

        [[domains]]
        name = "PROXY"
        membership = "legacy"
        enumerate = false
        "#,
        dir.path().join("store").display()
    ));

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.domains.len(), 2);
    assert_eq!(config.domains[1].membership, MembershipMode::Legacy);

    let db = SysDb::open(&config).await.unwrap();
    assert_eq!(db.domains().len(), 2);
    assert!(!db.domain("PROXY").unwrap().enumerates());
    assert_eq!(db.domain("LOCAL").unwrap().id_range(), (Some(1000), None));
    db.shutdown().await;
    assert!(dir.path().join("store").join("ids.json").exists());
}

#[test]
fn load_reports_problems() {
    let err = Config::load("/nonexistent/idcache.toml").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let file = write_config("db_path = ");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        idcache::Error::Config(idcache::config::ConfigError::Parse { .. })
    ));

    let file = write_config("db_path = \"/tmp\"\n");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        idcache::Error::Config(idcache::config::ConfigError::NoDomains)
    ));
}
