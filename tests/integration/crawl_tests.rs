//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for both the news site and the
//! extraction API, and run the full crawl cycle end-to-end against them.

use news_ripple::config::{load_config, validate, ExtractionConfig, FetcherConfig, UserAgentConfig};
use news_ripple::crawler::{run_crawl, Crawler, HttpFetcher, LlmExtractor, PageSource};
use news_ripple::storage::{JsonFileStore, RecordStore};
use news_ripple::{fingerprint, ConfigError, DomainGuard, RippleError, UrlOutcome};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Wiremock serves on 127.0.0.1
fn site_guard() -> DomainGuard {
    DomainGuard::new("127.0.0.1", false).unwrap()
}

fn extraction_config(base_url: &str) -> ExtractionConfig {
    ExtractionConfig {
        base_url: base_url.to_string(),
        model: "test-model".to_string(),
        api_key_env: "NEWS_RIPPLE_UNUSED".to_string(),
        max_tokens: 1000,
        temperature: 0.0,
        top_p: 1.0,
        frequency_penalty: 0.0,
        instruction: "Extract the news data from the markdown content".to_string(),
        timeout_secs: 10,
    }
}

fn config_toml(site: &str, llm: &str, data_root: &Path, api_key_env: &str) -> String {
    format!(
        r#"
[crawler]
seed-url = "{site}/NewsDetail.aspx?newsID=1"
request-delay-ms = 0

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[extraction]
base-url = "{llm}/v1"
model = "test-model"
api-key-env = "{api_key_env}"

[output]
data-root = "{root}"
"#,
        site = site,
        llm = llm,
        api_key_env = api_key_env,
        root = data_root.display()
    )
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(
            format!(
                "<html><head><title>{}</title></head><body>{}</body></html>",
                title, body
            ),
            "text/html; charset=utf-8",
        )
}

fn completion(record: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": record.to_string()},
            "finish_reason": "stop"
        }]
    }))
}

async fn mount_article(server: &MockServer, id: &str, title: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path("/NewsDetail.aspx"))
        .and(query_param("newsID", id))
        .respond_with(html_page(title, body))
        .mount(server)
        .await;
}

/// Site with the seed (id=1) linking to id=2 and to an article on another host
async fn mount_example_site(site: &MockServer) {
    mount_article(
        site,
        "1",
        "Story one MARKER-ONE",
        r#"<p>First story.</p>
           <a href="/NewsDetail.aspx?newsID=2">Second story</a>
           <a href="http://other.example/NewsDetail.aspx?newsID=3">Elsewhere</a>
           <a href="/About.aspx">About</a>"#,
    )
    .await;
    mount_article(site, "2", "Story two MARKER-TWO", "<p>Second story.</p>").await;
}

async fn mount_extraction(llm: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("MARKER-ONE"))
        .respond_with(completion(json!({
            "title": "Story one",
            "content": "First story.",
            "url": "",
            "date": "2024-01-01"
        })))
        .mount(llm)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("MARKER-TWO"))
        .respond_with(completion(json!([{
            "title": "Story two",
            "content": "Second story.",
            "url": "",
            "date": null
        }])))
        .mount(llm)
        .await;
}

fn build_crawler(site: &MockServer, llm: &MockServer, data_root: &Path) -> Crawler {
    let toml = config_toml(&site.uri(), &llm.uri(), data_root, "NEWS_RIPPLE_UNUSED");
    let config: news_ripple::Config = toml::from_str(&toml).expect("config should parse");
    let plan = validate(&config).expect("config should validate");
    let store = JsonFileStore::open(data_root, plan.guard.domain()).unwrap();
    let fetcher = HttpFetcher::new(&user_agent(), &FetcherConfig::default(), &plan.guard).unwrap();
    let extractor =
        LlmExtractor::new(&extraction_config(&format!("{}/v1", llm.uri())), API_KEY.to_string())
            .unwrap();
    Crawler::new(plan, store, fetcher, extractor)
}

fn article_url(site: &MockServer, id: u32) -> String {
    format!("{}/NewsDetail.aspx?newsID={}", site.uri(), id)
}

fn request_count(requests: &Option<Vec<wiremock::Request>>, request_path: &str) -> usize {
    requests
        .as_ref()
        .map(|reqs| reqs.iter().filter(|r| r.url.path() == request_path).count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_example_scenario_end_to_end() {
    let site = MockServer::start().await;
    let llm = MockServer::start().await;
    mount_example_site(&site).await;
    mount_extraction(&llm).await;

    let dir = TempDir::new().unwrap();
    let mut crawler = build_crawler(&site, &llm, dir.path());
    let stats = crawler.run().await;

    assert_eq!(stats.persisted(), 2);
    assert_eq!(stats.failures(), 0);

    let store = JsonFileStore::open(dir.path(), "127.0.0.1").unwrap();
    let keys = store.keys().unwrap();
    assert_eq!(keys.len(), 2, "only id=1 and id=2 should be stored");

    let first = store.read(&fingerprint(&article_url(&site, 1)).unwrap()).unwrap();
    assert_eq!(first.title, "Story one");
    assert_eq!(first.date.as_deref(), Some("2024-01-01"));
    assert_eq!(first.url, article_url(&site, 1));

    let second = store.read(&fingerprint(&article_url(&site, 2)).unwrap()).unwrap();
    assert_eq!(second.title, "Story two");
    assert_eq!(second.date, None);
}

#[tokio::test]
async fn test_second_run_makes_no_requests() {
    let site = MockServer::start().await;
    let llm = MockServer::start().await;
    mount_example_site(&site).await;
    mount_extraction(&llm).await;

    let dir = TempDir::new().unwrap();
    build_crawler(&site, &llm, dir.path()).run().await;

    let site_before = site.received_requests().await;
    let llm_before = llm.received_requests().await.map(|r| r.len()).unwrap_or(0);
    assert_eq!(request_count(&site_before, "/NewsDetail.aspx"), 2);
    assert_eq!(llm_before, 2);

    let stats = build_crawler(&site, &llm, dir.path()).run().await;
    assert_eq!(stats.cache_hits(), 2);
    assert_eq!(stats.persisted(), 0);

    let site_after = site.received_requests().await;
    let llm_after = llm.received_requests().await.map(|r| r.len()).unwrap_or(0);
    assert_eq!(request_count(&site_after, "/NewsDetail.aspx"), 2);
    assert_eq!(llm_after, 2);
}

#[tokio::test]
async fn test_robots_disallow_blocks_fetch() {
    let site = MockServer::start().await;
    let llm = MockServer::start().await;
    mount_example_site(&site).await;
    mount_extraction(&llm).await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .mount(&site)
        .await;

    let dir = TempDir::new().unwrap();
    let stats = build_crawler(&site, &llm, dir.path()).run().await;

    assert_eq!(stats.count(UrlOutcome::FetchFailed), 1);
    assert_eq!(stats.persisted(), 0);

    let requests = site.received_requests().await;
    assert_eq!(request_count(&requests, "/NewsDetail.aspx"), 0);
    assert_eq!(request_count(&requests, "/robots.txt"), 1);
}

#[tokio::test]
async fn test_fetcher_classifies_responses() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/blank"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .mount(&site)
        .await;

    let fetcher =
        HttpFetcher::new(&user_agent(), &FetcherConfig::default(), &site_guard()).unwrap();
    let base = url::Url::parse(&site.uri()).unwrap();

    let err = fetcher.fetch(&base.join("/missing").unwrap()).await.unwrap_err();
    assert!(matches!(err, news_ripple::crawler::FetchError::Http { status: 404 }));

    let err = fetcher.fetch(&base.join("/report.pdf").unwrap()).await.unwrap_err();
    assert!(matches!(
        err,
        news_ripple::crawler::FetchError::ContentMismatch { .. }
    ));

    let err = fetcher.fetch(&base.join("/blank").unwrap()).await.unwrap_err();
    assert!(matches!(err, news_ripple::crawler::FetchError::EmptyBody));
}

#[tokio::test]
async fn test_fetcher_stops_at_off_domain_redirect() {
    let site = MockServer::start().await;
    mount_example_site(&site).await;
    let port = url::Url::parse(&site.uri()).unwrap().port().unwrap();
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "location",
            format!("http://localhost:{}/NewsDetail.aspx?newsID=1", port).as_str(),
        ))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/hop"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", article_url(&site, 1).as_str()),
        )
        .mount(&site)
        .await;

    let fetcher =
        HttpFetcher::new(&user_agent(), &FetcherConfig::default(), &site_guard()).unwrap();
    let base = url::Url::parse(&site.uri()).unwrap();

    let err = fetcher.fetch(&base.join("/moved").unwrap()).await.unwrap_err();
    match err {
        news_ripple::crawler::FetchError::RedirectOutOfDomain { location } => {
            assert!(location.starts_with("http://localhost:"));
        }
        other => panic!("expected RedirectOutOfDomain, got {:?}", other),
    }

    // Same-host redirects are still followed
    let page = fetcher.fetch(&base.join("/hop").unwrap()).await.unwrap();
    assert_eq!(page.title.as_deref(), Some("Story one MARKER-ONE"));

    let requests = site.received_requests().await;
    assert_eq!(request_count(&requests, "/NewsDetail.aspx"), 1);
}

#[tokio::test]
async fn test_fetcher_renders_markdown() {
    let site = MockServer::start().await;
    mount_example_site(&site).await;

    let fetcher =
        HttpFetcher::new(&user_agent(), &FetcherConfig::default(), &site_guard()).unwrap();
    let url = url::Url::parse(&article_url(&site, 1)).unwrap();
    let page = fetcher.fetch(&url).await.unwrap();

    assert_eq!(page.title.as_deref(), Some("Story one MARKER-ONE"));
    assert!(page.markdown.starts_with("# Story one MARKER-ONE"));
    assert!(page
        .markdown
        .contains(&format!("[Second story]({})", article_url(&site, 2))));
}

#[tokio::test]
async fn test_provider_error_leaves_no_record() {
    let site = MockServer::start().await;
    let llm = MockServer::start().await;
    mount_example_site(&site).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&llm)
        .await;

    let dir = TempDir::new().unwrap();
    let stats = build_crawler(&site, &llm, dir.path()).run().await;

    // Both pages fetched (links still followed), neither stored
    assert_eq!(stats.count(UrlOutcome::ExtractionFailed), 2);
    let store = JsonFileStore::open(dir.path(), "127.0.0.1").unwrap();
    assert!(store.keys().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_crawl_from_config_file() {
    let site = MockServer::start().await;
    let llm = MockServer::start().await;
    mount_example_site(&site).await;
    mount_extraction(&llm).await;

    std::env::set_var("NEWS_RIPPLE_TEST_KEY_FILE_RUN", API_KEY);

    let dir = TempDir::new().unwrap();
    let data_root = dir.path().join("data");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        config_toml(&site.uri(), &llm.uri(), &data_root, "NEWS_RIPPLE_TEST_KEY_FILE_RUN"),
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let stats = run_crawl(&config).await.unwrap();

    assert_eq!(stats.persisted(), 2);
    assert!(data_root.join("127.0.0.1").is_dir());
}

#[tokio::test]
async fn test_missing_api_key_is_fatal() {
    let site = MockServer::start().await;
    let llm = MockServer::start().await;
    mount_example_site(&site).await;

    std::env::remove_var("NEWS_RIPPLE_TEST_KEY_NEVER_SET");

    let dir = TempDir::new().unwrap();
    let toml = config_toml(
        &site.uri(),
        &llm.uri(),
        &dir.path().join("data"),
        "NEWS_RIPPLE_TEST_KEY_NEVER_SET",
    );
    let config: news_ripple::Config = toml::from_str(&toml).unwrap();

    let err = run_crawl(&config).await.unwrap_err();
    assert!(matches!(
        err,
        RippleError::Config(ConfigError::MissingCredential(_))
    ));
    assert_eq!(err.kind(), "config");

    let requests = site.received_requests().await.map(|r| r.len()).unwrap_or(0);
    assert_eq!(requests, 0);
}
