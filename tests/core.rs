//! Configuration, runtime and CLI integration tests.

mod common;

use common::*;
use std::path::Path;
use tessera::cli::commands::{load_config, show_config, validate_config};
use tessera::config::{Config, ConfigOverrides};
use tessera::runtime::{ComponentHealth, Runtime};

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_shipped_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/tessera.toml");
    let config = Config::from_file(&path).unwrap();
    let names: Vec<_> = config.region_specs().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["regionA", "redis"]);
}

#[test]
fn test_invalid_configs_rejected() {
    for content in [
        "[[regions]]\nname = \"queries\"\n",
        "[[regions]]\nname = \"a\"\n[[regions]]\nname = \"a\"\n",
        "[[regions]]\nname = \"a/b\"\n",
        "[listeners.redis]\nbind = \"not an address\"\n",
        "[telemetry]\nlog_level = \"loud\"\n",
        "[server]\nlock_sweep_threshold = 0\n",
    ] {
        let file = config_file(content);
        assert!(
            Config::from_file(file.path()).is_err(),
            "accepted invalid config: {content}"
        );
        assert!(validate_config(file.path()).is_err());
    }
}

#[test]
fn test_overrides_add_redis_listener() {
    let mut config = Config::from_toml("").unwrap();
    config.apply_overrides(&ConfigOverrides {
        log_level: Some("debug".to_string()),
        redis_bind: Some("127.0.0.1:0".to_string()),
    });
    config.validate().unwrap();
    assert_eq!(config.telemetry.log_level, "debug");
    let redis = config.listeners.redis.as_ref().unwrap();
    assert_eq!(redis.bind, "127.0.0.1:0");
    assert_eq!(redis.region, "redis");
}

#[test]
fn test_load_and_show_config() {
    let file = config_file("[[regions]]\nname = \"orders\"\n");
    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.regions[0].name, "orders");

    let json = show_config(file.path(), "json").unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["regions"][0]["type"], "REPLICATE");
    assert_eq!(parsed["server"]["lock_timeout_ms"], 5000);

    assert!(load_config(Some(Path::new("/nonexistent/tessera.toml"))).is_err());
}

// ============================================================================
// Runtime
// ============================================================================

#[tokio::test]
async fn test_runtime_serves_both_adapters() {
    let config = Config::from_toml(
        r#"
        [[regions]]
        name = "regionA"

        [listeners.redis]
        bind = "127.0.0.1:0"
        "#,
    )
    .unwrap();
    let mut runtime = Runtime::new(config).unwrap();
    runtime.start().await.unwrap();
    assert!(runtime.is_ready());
    assert_eq!(runtime.health().listeners, ComponentHealth::Healthy);

    let addr = runtime.redis_addr().unwrap();
    let mut client = RespClient::connect(addr).await;
    assert_eq!(client.call(&["SET", "k", "hello"]).await, Reply::Status("OK".into()));

    // Both adapters see the same engine and memory accountant.
    let rest = runtime.rest().unwrap();
    let resp = rest
        .handle(tessera::adapters::rest::RestRequest::get(""))
        .await;
    let body = resp.body_json().unwrap();
    let names: Vec<&str> = body["regions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["redis", "regionA"]);
    assert!(runtime.engine().catalog().accountant().used_memory() > 0);

    runtime.shutdown();
    runtime.wait_for_shutdown().await;
    runtime.stop().await.unwrap();
    assert!(!runtime.is_running());
    assert!(client.is_closed().await);
}

#[tokio::test]
async fn test_runtime_reports_bind_failure() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = occupied.local_addr().unwrap();
    let config = Config::from_toml(&format!("[listeners.redis]\nbind = \"{addr}\"\n")).unwrap();

    let mut runtime = Runtime::new(config).unwrap();
    assert!(runtime.start().await.is_err());
    assert_eq!(runtime.health().listeners, ComponentHealth::Failed);
    assert!(!runtime.is_alive());
}
