use std::{env, fs};

use userserv_server::StorageBackend;
use userserv_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("userserv.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
body_limit_bytes = 4096

[storage]
backend = "memory"

[storage.postgres]
host = "db"
database = "users"
password = "secret"

[redis]
enabled = false

[cache]
ttl_secs = 120

[auth]
public_key = "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA"

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.server.body_limit_bytes, 4096);
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    assert_eq!(
        cfg.storage.postgres.connection_url(),
        "postgres://postgres:secret@db:5432/users"
    );
    assert_eq!(cfg.cache.ttl_secs, 120);
    assert_eq!(cfg.auth.identity_claim, "userId");
    assert_eq!(cfg.logging.level, "debug");

    // 2) Env override should win over file
    unsafe {
        env::set_var("USERSERV__CACHE__TTL_SECS", "30");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.cache.ttl_secs, 30);
    unsafe {
        env::remove_var("USERSERV__CACHE__TTL_SECS");
    }

    // 3) Missing public key is rejected
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[storage]
backend = "memory"
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("auth.public_key"));

    // 4) Zero TTL is rejected
    let zero_ttl = dir.path().join("zero_ttl.toml");
    fs::write(
        &zero_ttl,
        format!("{toml_content}\n").replace("ttl_secs = 120", "ttl_secs = 0"),
    )
    .expect("write zero ttl toml");
    let err = load_config(zero_ttl.to_str()).expect_err("expected validation error");
    assert!(err.contains("ttl_secs"));
}
