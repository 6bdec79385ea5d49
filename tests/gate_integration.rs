//! End-to-end tests: a live gate in front of a mock upstream.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;

mod common;

fn addrs(gate_port: u16, upstream_port: u16) -> (SocketAddr, SocketAddr) {
    (
        SocketAddr::from(([127, 0, 0, 1], gate_port)),
        SocketAddr::from(([127, 0, 0, 1], upstream_port)),
    )
}

#[tokio::test]
async fn test_console_entry_and_assets_pass() {
    let (gate, upstream) = addrs(28301, 28302);
    common::start_mock_upstream(upstream).await;
    let (shutdown, _updates) = common::start_gate(common::base_config(gate, upstream)).await;
    let client = common::client();

    for path in ["/nacos/index.html", "/nacos/INDEX.HTML", "/nacos/js/app.js", "/nacos/console-ui/x.css"] {
        let res = client.get(format!("http://{gate}{path}")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{path}");
        assert_eq!(res.text().await.unwrap(), format!("upstream:GET {path}"));
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_encoded_traversal_is_not_allowlisted() {
    let (gate, upstream) = addrs(28311, 28312);
    common::start_mock_upstream(upstream).await;
    let (shutdown, _updates) = common::start_gate(common::base_config(gate, upstream)).await;

    let res = common::client()
        .get(format!("http://{gate}/nacos/js/..%2fv1/cs/secret"))
        .send()
        .await
        .unwrap();

    // Decodes to a dot segment, so it matches neither the assets nor a route.
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), "invalid encoded sequence in request path");

    shutdown.trigger();
}

#[tokio::test]
async fn test_signed_server_request() {
    let (gate, upstream) = addrs(28321, 28322);
    common::start_mock_upstream(upstream).await;
    let (shutdown, _updates) = common::start_gate(common::base_config(gate, upstream)).await;
    let client = common::client();
    let url = format!("http://{gate}/nacos/v1/cs/configs/listener?tenant=public&group=DEFAULT_GROUP");

    let res = client
        .get(&url)
        .header("spas-signature", "wCN+C86OBf7CtAxktQIpwtB7HuU=")
        .header("spas-accesskey", "X-Gate-Peer")
        .header("timestamp", "1700000000000")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // A different timestamp breaks the signature; the request falls through to routing.
    let res = client
        .get(&url)
        .header("spas-signature", "wCN+C86OBf7CtAxktQIpwtB7HuU=")
        .header("spas-accesskey", "X-Gate-Peer")
        .header("timestamp", "1700000000001")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

#[tokio::test]
async fn test_signed_form_request() {
    let (gate, upstream) = addrs(28401, 28402);
    common::start_mock_upstream(upstream).await;
    let (shutdown, _updates) = common::start_gate(common::base_config(gate, upstream)).await;
    let client = common::client();
    let url = format!("http://{gate}/nacos/v1/cs/configs");
    let form = [("tenant", "public"), ("group", "DEFAULT_GROUP"), ("dataId", "app.yaml")];

    let res = client
        .post(&url)
        .form(&form)
        .header("spas-signature", "wCN+C86OBf7CtAxktQIpwtB7HuU=")
        .header("spas-accesskey", "X-Gate-Peer")
        .header("timestamp", "1700000000000")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "upstream:POST /nacos/v1/cs/configs");

    // The body supplies tenant and group; another timestamp no longer matches.
    let res = client
        .post(&url)
        .form(&form)
        .header("spas-signature", "wCN+C86OBf7CtAxktQIpwtB7HuU=")
        .header("spas-accesskey", "X-Gate-Peer")
        .header("timestamp", "1700000000001")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

#[tokio::test]
async fn test_oversized_form_body() {
    let (gate, upstream) = addrs(28411, 28412);
    common::start_mock_upstream(upstream).await;
    let mut config = common::base_config(gate, upstream);
    config.security.max_form_bytes = 64;
    let (shutdown, _updates) = common::start_gate(config).await;

    let res = common::client()
        .post(format!("http://{gate}/nacos/v1/cs/configs"))
        .form(&[("content", "x".repeat(256))])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(res.text().await.unwrap(), "Request body too large");

    shutdown.trigger();
}

#[tokio::test]
async fn test_server_identity_header() {
    let (gate, upstream) = addrs(28331, 28332);
    common::start_mock_upstream(upstream).await;
    let (shutdown, _updates) = common::start_gate(common::base_config(gate, upstream)).await;
    let client = common::client();

    let res = client
        .post(format!("http://{gate}/nacos/v1/ns/instance"))
        .header("x-gate-peer", "server-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "upstream:POST /nacos/v1/ns/instance");

    let res = client
        .post(format!("http://{gate}/nacos/v1/ns/instance"))
        .header("x-gate-peer", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

#[tokio::test]
async fn test_permission_checks() {
    let (gate, upstream) = addrs(28341, 28342);
    common::start_mock_upstream(upstream).await;
    let (shutdown, _updates) = common::start_gate(common::base_config(gate, upstream)).await;
    let client = common::client();
    let base = format!("http://{gate}/nacos/v1/cs/configs");

    let res = client
        .get(format!("{base}?tenant=dev&group=G&dataId=app&accessToken=tok-alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{base}?tenant=dev&group=G&dataId=app"))
        .bearer_auth("tok-alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{base}?tenant=prod&group=G&dataId=app&accessToken=tok-alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.text().await.unwrap(), "authorization failed!");

    let res = client.get(format!("{base}?tenant=dev")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.text().await.unwrap(), "user not found!");

    let res = client
        .get(format!("{base}?tenant=dev"))
        .basic_auth("alice", Some("x"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Writes are not registered for this path.
    let res = client.post(&base).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

#[tokio::test]
async fn test_blank_resource_is_rejected() {
    let (gate, upstream) = addrs(28351, 28352);
    common::start_mock_upstream(upstream).await;
    let (shutdown, _updates) = common::start_gate(common::base_config(gate, upstream)).await;

    let res = common::client()
        .get(format!("http://{gate}/nacos/v1/ops/log?accessToken=tok-alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.text().await.unwrap(), "resource name invalid!");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unsecured_route_and_request_id() {
    let (gate, upstream) = addrs(28361, 28362);
    common::start_mock_upstream(upstream).await;
    let (shutdown, _updates) = common::start_gate(common::base_config(gate, upstream)).await;
    let client = common::client();

    let res = client
        .get(format!("http://{gate}/nacos/v1/console/health/liveness"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let res = client
        .get(format!("http://{gate}/nacos/v1/nope"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()["x-request-id"], "req-42");

    shutdown.trigger();
}

#[tokio::test]
async fn test_origin_guard() {
    let (gate, upstream) = addrs(28371, 28372);
    common::start_mock_upstream(upstream).await;
    let mut config = common::base_config(gate, upstream);
    config.security.reject_cross_origin = true;
    let (shutdown, _updates) = common::start_gate(config).await;
    let client = common::client();
    let url = format!("http://{gate}/nacos/index.html");

    let res = client.get(&url).header("origin", "http://evil.example").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.text().await.unwrap(), "Cross-origin request blocked");

    let res = client.get(&url).header("origin", "http://%65vil.example").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.text().await.unwrap(), "Invalid origin");

    let res = client.get(&url).header("origin", format!("http://{gate}")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_auth_config_hot_update() {
    let (gate, upstream) = addrs(28381, 28382);
    common::start_mock_upstream(upstream).await;
    let config = common::base_config(gate, upstream);
    let (shutdown, updates) = common::start_gate(config.clone()).await;
    let client = common::client();
    let url = format!("http://{gate}/nacos/v1/cs/configs?tenant=dev&accessToken=tok-bob");

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let mut updated = config.clone();
    updated.auth.users[0].token = "tok-bob".into();
    updates.send(updated).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let mut disabled = config;
    disabled.auth.enabled = false;
    updates.send(disabled).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client.get(format!("http://{gate}/nacos/v1/anything")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_unreachable() {
    let (gate, upstream) = addrs(28391, 28392);
    let (shutdown, _updates) = common::start_gate(common::base_config(gate, upstream)).await;

    let res = common::client()
        .get(format!("http://{gate}/nacos/index.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.text().await.unwrap(), "Upstream request failed");

    shutdown.trigger();
}
