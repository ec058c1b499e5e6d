use std::time::Duration;
use stock_sentinel::classify;
use stock_sentinel::config::AppConfig;
use stock_sentinel::models::StatusVerdict;
use stock_sentinel::plugins::fetchers::HttpFetcher;
use stock_sentinel::plugins::traits::ContentFetcher;
use stock_sentinel::utils::error::FetchError;
use stock_sentinel::worker::poll_once;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) Chrome/120.0.0.0 Safari/537.36";

fn http_fetcher() -> HttpFetcher {
    let mut config = AppConfig::default().fetcher;
    config.user_agent = TEST_USER_AGENT.to_string();
    HttpFetcher::new(&config).unwrap()
}

async fn serve(route: &str, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("user-agent", TEST_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_fetch_sends_browser_user_agent() -> anyhow::Result<()> {
    let server = serve("/jacket", "<html><body><button>Add to Cart</button></body></html>").await;

    let content = http_fetcher()
        .fetch(&format!("{}/jacket", server.uri()), Duration::from_secs(5))
        .await?;
    assert!(content.contains_text("add to cart"));
    assert_eq!(classify(&content), StatusVerdict::InStock);
    Ok(())
}

#[tokio::test]
async fn test_dark_inline_basket_is_in_stock() -> anyhow::Result<()> {
    let server = serve(
        "/boots",
        r#"<html><body>
            <button style="background-color: rgb(10, 10, 10)">Add to Basket</button>
            <a href="/wishlist">Add to Wishlist</a>
        </body></html>"#,
    )
    .await;

    let content = http_fetcher()
        .fetch(&format!("{}/boots", server.uri()), Duration::from_secs(5))
        .await?;
    assert_eq!(content.elements().len(), 2);
    assert_eq!(classify(&content), StatusVerdict::InStock);
    Ok(())
}

#[tokio::test]
async fn test_disabled_basket_falls_back_to_wishlist() -> anyhow::Result<()> {
    let server = serve(
        "/boots",
        r#"<html><body>
            <button disabled style="background: #000">Add to Basket</button>
            <a href="/wishlist">Add to Wishlist</a>
        </body></html>"#,
    )
    .await;

    let verdict = poll_once(
        &http_fetcher(),
        &format!("{}/boots", server.uri()),
        Duration::from_secs(5),
    )
    .await;
    assert_eq!(verdict, StatusVerdict::OutOfStock);
    Ok(())
}

#[tokio::test]
async fn test_server_error_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = http_fetcher()
        .fetch(&format!("{}/anything", server.uri()), Duration::from_secs(5))
        .await;
    assert_eq!(
        result.unwrap_err(),
        FetchError::TransportError("HTTP 500 Internal Server Error".to_string())
    );
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("add to cart")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let url = format!("{}/slow", server.uri());
    let result = http_fetcher().fetch(&url, Duration::from_millis(200)).await;
    assert_eq!(result.unwrap_err(), FetchError::Timeout);

    let verdict = poll_once(&http_fetcher(), &url, Duration::from_millis(200)).await;
    assert_eq!(verdict, StatusVerdict::Error("Page load timeout".to_string()));
}
