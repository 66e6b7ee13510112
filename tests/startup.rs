//! Full plugin lifecycle: open, register, serve, unregister.

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use reproxy_geo_plugin::config::PluginConfig;
use reproxy_geo_plugin::lifecycle::{serve, Shutdown, StartupError};
use reproxy_geo_plugin::plugin::RpcReply;
use serde_json::json;

fn config(database: &str, listen: &str, endpoint: &str) -> PluginConfig {
    let mut config = PluginConfig::default();
    config.database.path = database.to_string();
    config.listener.address = listen.to_string();
    config.host.endpoint = endpoint.to_string();
    config.host.plugin_name = "geo".to_string();
    config
}

#[tokio::test]
async fn test_serve_registers_answers_and_unregisters() {
    let db = common::fixture_database();
    let host = common::start_mock_host(StatusCode::OK).await;
    let listen = format!("127.0.0.1:{}", common::free_port());
    let mut config = config(db.path().to_str().unwrap(), &listen, &host.endpoint());
    config.headers.fields = "CC,CITY,ZIP".to_string();
    config.headers.ip_source = "X-Forwarded-For".to_string();

    let shutdown = Shutdown::new();
    let task = tokio::spawn(serve(config, shutdown.clone()));

    let client = reqwest::Client::new();
    let mut reply = None;
    for _ in 0..50 {
        let sent = client
            .post(format!("http://{listen}/"))
            .json(&json!({
                "method": "geo.HeaderThing",
                "params": [{
                    "RemoteAddr": "192.0.2.1:1000",
                    "Header": {"X-Forwarded-For": ["10.20.30.40"]}
                }],
                "id": 5
            }))
            .send()
            .await;
        if let Ok(response) = sent {
            reply = Some(response.json::<RpcReply>().await.unwrap());
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let result = reply.expect("plugin never answered").result.unwrap();
    assert_eq!(result.headers_in.get("X-Geo-Country-Code"), Some("JP"));
    assert_eq!(result.headers_in.get("X-Geo-City"), Some("Shinjuku"));
    assert_eq!(result.headers_in.get("X-Geo-Zipcode"), Some("160-0022"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let calls = host.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, Method::POST);
    assert_eq!(calls[0].1.name, "geo");
    assert_eq!(calls[0].1.address, listen);
    assert_eq!(calls[1].0, Method::DELETE);
}

#[tokio::test]
async fn test_serve_without_registration() {
    let db = common::fixture_database();
    let mut config = config(db.path().to_str().unwrap(), ":0", "http://127.0.0.1:1/");
    config.host.register = false;

    let shutdown = Shutdown::new();
    shutdown.trigger();
    serve(config, shutdown).await.unwrap();
}

#[tokio::test]
async fn test_serve_missing_database() {
    let config = config("/nonexistent/geo.mmdb", "127.0.0.1:0", "http://127.0.0.1:1/");

    let err = serve(config, Shutdown::new()).await.unwrap_err();
    assert!(matches!(err, StartupError::Store(_)));
}

#[tokio::test]
async fn test_serve_rejects_unknown_field() {
    let db = common::fixture_database();
    let mut config = config(db.path().to_str().unwrap(), "127.0.0.1:0", "http://127.0.0.1:1/");
    config.headers.fields = "CF,XX".to_string();

    let err = serve(config, Shutdown::new()).await.unwrap_err();
    assert!(matches!(err, StartupError::Fields(_)));
}

#[tokio::test]
async fn test_serve_fails_when_host_never_accepts() {
    let db = common::fixture_database();
    let host = common::start_mock_host(StatusCode::INTERNAL_SERVER_ERROR).await;
    let listen = format!("127.0.0.1:{}", common::free_port());
    let config = config(db.path().to_str().unwrap(), &listen, &host.endpoint());

    let err = tokio::time::timeout(Duration::from_secs(30), serve(config, Shutdown::new()))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, StartupError::Registration(_)));
    assert_eq!(host.calls().len(), 10);
}
