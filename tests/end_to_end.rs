// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests: a real rendergate server between a mocked rendering
//! service and a mocked origin application.

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{BROWSER, GOOGLEBOT, TestConfigProvider, client, start_proxy};

async fn origin_serving(body: &'static str, calls: u64) -> MockServer {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string(body),
        )
        .expect(calls)
        .mount(&origin)
        .await;
    origin
}

#[tokio::test]
async fn test_crawler_receives_rendered_page() {
    let render = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("url", "http://example.com/articles"))
        .and(query_param("bot", GOOGLEBOT))
        .and(header("accept", "*/*"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .insert_header("set-cookie", "render=1")
                .insert_header("x-rendered", "yes")
                .set_body_string("<html>OK</html>"),
        )
        .expect(1)
        .mount(&render)
        .await;
    let origin = origin_serving("app shell", 0).await;

    let proxy = start_proxy(TestConfigProvider::new(&render.uri(), &origin.uri())).await;
    let response = client()
        .get(proxy.url("/articles?foo=bar"))
        .header("user-agent", GOOGLEBOT)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/html");
    assert_eq!(response.headers()["x-rendered"], "yes");
    assert!(response.headers().get("set-cookie").is_none());
    assert_eq!(response.text().await.unwrap(), "<html>OK</html>");
}

#[tokio::test]
async fn test_static_asset_goes_to_origin() {
    let render = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("rendered"))
        .expect(0)
        .mount(&render)
        .await;
    let origin = origin_serving("console.log(1)", 1).await;

    let proxy = start_proxy(TestConfigProvider::new(&render.uri(), &origin.uri())).await;
    let response = client()
        .get(proxy.url("/app.js"))
        .header("user-agent", GOOGLEBOT)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "console.log(1)");
}

#[tokio::test]
async fn test_browser_goes_to_origin() {
    let render = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&render)
        .await;
    let origin = origin_serving("app shell", 1).await;

    let proxy = start_proxy(TestConfigProvider::new(&render.uri(), &origin.uri())).await;
    let response = client()
        .get(proxy.url("/articles"))
        .header("user-agent", BROWSER)
        .send()
        .await
        .unwrap();

    assert_eq!(response.text().await.unwrap(), "app shell");
}

#[tokio::test]
async fn test_escaped_fragment_is_rendered_for_any_agent() {
    let render = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("url", "http://example.com/about"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>about</html>"))
        .expect(1)
        .mount(&render)
        .await;
    let origin = origin_serving("app shell", 0).await;

    let proxy = start_proxy(TestConfigProvider::new(&render.uri(), &origin.uri())).await;
    let response = client()
        .get(proxy.url("/?_escaped_fragment_=/about"))
        .header("user-agent", BROWSER)
        .send()
        .await
        .unwrap();

    assert_eq!(response.text().await.unwrap(), "<html>about</html>");
}

#[tokio::test]
async fn test_unreachable_render_service_falls_back_to_origin() {
    let origin = origin_serving("app shell", 1).await;

    let proxy = start_proxy(TestConfigProvider::new("http://127.0.0.1:1", &origin.uri())).await;
    let response = client()
        .get(proxy.url("/articles"))
        .header("user-agent", GOOGLEBOT)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "app shell");
}

#[tokio::test]
async fn test_slow_render_service_falls_back_to_origin() {
    let render = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&render)
        .await;
    let origin = origin_serving("app shell", 1).await;

    let provider = TestConfigProvider::new(&render.uri(), &origin.uri()).with("render.timeout", json!(200));
    let proxy = start_proxy(provider).await;

    let started = std::time::Instant::now();
    let response = client()
        .get(proxy.url("/articles"))
        .header("user-agent", GOOGLEBOT)
        .send()
        .await
        .unwrap();

    assert_eq!(response.text().await.unwrap(), "app shell");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_render_status_is_forwarded() {
    let render = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>missing</html>"))
        .expect(1)
        .mount(&render)
        .await;
    let origin = origin_serving("app shell", 0).await;

    let proxy = start_proxy(TestConfigProvider::new(&render.uri(), &origin.uri())).await;
    let response = client()
        .get(proxy.url("/gone"))
        .header("user-agent", GOOGLEBOT)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    assert_eq!(response.text().await.unwrap(), "<html>missing</html>");
}

#[tokio::test]
async fn test_head_request_is_rendered_without_body() {
    let render = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(1)
        .mount(&render)
        .await;
    let origin = origin_serving("app shell", 0).await;

    let proxy = start_proxy(TestConfigProvider::new(&render.uri(), &origin.uri())).await;
    let response = client()
        .head(proxy.url("/articles"))
        .header("user-agent", GOOGLEBOT)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/html");
}

#[tokio::test]
async fn test_denied_paths_go_to_origin_even_when_allowed() {
    let render = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("rendered"))
        .expect(1)
        .mount(&render)
        .await;
    let origin = origin_serving("app shell", 1).await;

    let provider = TestConfigProvider::new(&render.uri(), &origin.uri())
        .with("render.only", json!([{"pattern": "^/user"}]))
        .with("render.ignore", json!(["/user/settings"]));
    let proxy = start_proxy(provider).await;
    let client = client();

    let allowed = client
        .get(proxy.url("/user/profile"))
        .header("user-agent", GOOGLEBOT)
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.text().await.unwrap(), "rendered");

    let denied = client
        .get(proxy.url("/user/settings"))
        .header("user-agent", GOOGLEBOT)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.text().await.unwrap(), "app shell");
}

#[tokio::test]
async fn test_auth_and_request_options_reach_render_service() {
    let render = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(header("x-render-wait", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_string("rendered"))
        .expect(1)
        .mount(&render)
        .await;
    let origin = origin_serving("app shell", 0).await;

    let provider = TestConfigProvider::new(&render.uri(), &origin.uri())
        .with("render.auth", json!("user:pass"))
        .with("render.request_options", json!({"headers": {"X-Render-Wait": "500"}}));
    let proxy = start_proxy(provider).await;

    let response = client()
        .get(proxy.url("/"))
        .header("user-agent", GOOGLEBOT)
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "rendered");
}

#[tokio::test]
async fn test_crawler_post_is_forwarded_with_body() {
    let render = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&render)
        .await;
    let origin = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_string("q=rust"))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&origin)
        .await;

    let proxy = start_proxy(TestConfigProvider::new(&render.uri(), &origin.uri())).await;
    let response = client()
        .post(proxy.url("/search"))
        .header("user-agent", GOOGLEBOT)
        .body("q=rust")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    assert_eq!(response.text().await.unwrap(), "created");
}

#[tokio::test]
async fn test_unreachable_origin_yields_bad_gateway() {
    let render = MockServer::start().await;
    let proxy = start_proxy(TestConfigProvider::new(&render.uri(), "http://127.0.0.1:1")).await;

    let response = client()
        .get(proxy.url("/articles"))
        .header("user-agent", BROWSER)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
}
