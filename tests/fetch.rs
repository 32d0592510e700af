use price_tracker::{FetchError, PageFetcher, Url};
use reqwest::StatusCode;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(site: &str) -> PageFetcher {
    PageFetcher::new(Url::parse(site).unwrap(), None).unwrap()
}

#[tokio::test]
async fn returns_body_on_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/laptop-c-98"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>laptops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(&server.uri());
    let url = fetcher.category_url("laptop-c-98").unwrap();
    let body = fetcher.fetch(&url).await.unwrap();

    assert_eq!(body, "<html>laptops</html>");
}

#[tokio::test]
async fn non_ok_status_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server.uri());
    for (slug, expected) in [("gone", StatusCode::NOT_FOUND), ("empty", StatusCode::NO_CONTENT)] {
        let url = fetcher.category_url(slug).unwrap();
        match fetcher.fetch(&url).await {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, expected),
            other => panic!("expected status error for {slug}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() {
    let fetcher = fetcher("http://127.0.0.1:1");
    let url = fetcher.category_url("anything").unwrap();

    assert!(matches!(
        fetcher.fetch(&url).await,
        Err(FetchError::Transport { .. })
    ));
}
