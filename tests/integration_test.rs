use mockito::{Matcher, Server};
use search_ai::{
    EnrichOptions, Filters, Mode, ResultRecord, RetryPolicy, SearchConfig, SearchError, Searcher,
};
use std::time::Duration;

fn result_page(links: &[(&str, &str)]) -> String {
    let blocks: String = links
        .iter()
        .map(|(title, link)| {
            format!(
                r#"<div class="ezO2md">
                    <a href="/url?q={link}&amp;sa=U"><span class="CVA68e">{title}</span></a>
                    <span class="FrIlee">About {title}</span>
                </div>"#
            )
        })
        .collect();
    format!("<html><body>{blocks}</body></html>")
}

fn config(server: &Server) -> SearchConfig {
    SearchConfig {
        base_url: format!("{}/search", server.url()),
        pace: Duration::ZERO,
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        },
        ..SearchConfig::default()
    }
}

#[tokio::test]
async fn test_full_search_workflow() {
    let mut server = Server::new_async().await;
    let article = format!("{}/article", server.url());

    let search_mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "rust programming site:example.com".into()),
            Matcher::UrlEncoded("num".into(), "3".into()),
            Matcher::UrlEncoded("start".into(), "0".into()),
            Matcher::UrlEncoded("safe".into(), "true".into()),
            Matcher::UrlEncoded("hl".into(), "en".into()),
        ]))
        .match_header("cookie", "CONSENT=PENDING+987; SOCS=CAESHAgBEhIaAB")
        .match_header("user-agent", Matcher::Regex("^Lynx/".to_string()))
        .with_status(200)
        .with_body(result_page(&[
            ("Rust article", &article),
            ("Rust manual", "https://example.com/manual.pdf"),
        ]))
        .create_async()
        .await;

    let page_mock = server
        .mock("GET", "/article")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(
            r#"<html>
                <head>
                    <title>Learning Rust</title>
                    <meta name="author" content="Ferris">
                    <meta name="twitter:site" content="@rustlang">
                </head>
                <body><h2>Ownership</h2><p>Every value has an owner.</p><script>track()</script></body>
            </html>"#,
        )
        .create_async()
        .await;

    let searcher = Searcher::new(config(&server)).unwrap();
    let filters = Filters::builder().sites("example.com").build().unwrap();
    let request = searcher.request("rust programming").filters(filters).length(2);

    let results = searcher.search(&request).await.unwrap();
    search_mock.assert_async().await;
    assert_eq!(results.len(), 2);

    let records = results.to_structured(&EnrichOptions::default()).await.unwrap();
    page_mock.assert_async().await;

    match &records[0] {
        ResultRecord::Enriched(enriched) => {
            assert_eq!(enriched.title, "Learning Rust");
            assert_eq!(enriched.link, article);
            assert_eq!(enriched.description.as_deref(), Some("About Rust article"));
            assert_eq!(enriched.author.as_deref(), Some("Ferris"));
            assert_eq!(enriched.twitter.as_deref(), Some("@rustlang"));
            assert_eq!(enriched.page_preview, "## Ownership\n\nEvery value has an owner.");
        }
        other => panic!("expected an enriched record, got {other:?}"),
    }
    // PDF links are never rendered.
    assert!(matches!(&records[1], ResultRecord::Basic(raw) if raw.title == "Rust manual"));
}

#[tokio::test]
async fn test_transient_status_is_retried() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(503)
        .expect(2)
        .create_async()
        .await;
    let succeeding = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(result_page(&[("Tokio", "https://tokio.rs/")]))
        .create_async()
        .await;

    let searcher = Searcher::new(config(&server)).unwrap();
    let request = searcher.request("tokio").length(1);

    let results = searcher.search(&request).await.unwrap();

    failing.assert_async().await;
    succeeding.assert_async().await;
    assert_eq!(results.get(0).map(|r| r.link.as_str()), Some("https://tokio.rs/"));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(403)
        .expect(1)
        .create_async()
        .await;

    let searcher = Searcher::new(config(&server)).unwrap();
    let err = searcher
        .search(&searcher.request("blocked"))
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, SearchError::Status { status: 403, .. }));
}

#[tokio::test]
async fn test_unique_results_across_pages() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("start".into(), "0".into()))
        .with_status(200)
        .with_body(result_page(&[
            ("A", "https://a.example.org/"),
            ("A again", "https://a.example.org/"),
        ]))
        .create_async()
        .await;
    server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("start".into(), "2".into()))
        .with_status(200)
        .with_body(result_page(&[
            ("A", "https://a.example.org/"),
            ("B", "https://b.example.org/"),
        ]))
        .create_async()
        .await;

    let searcher = Searcher::new(config(&server)).unwrap();
    let request = searcher.request("letters").length(2).unique(true);

    let results = searcher.search(&request).await.unwrap();
    let links: Vec<&str> = results.iter().map(|r| r.link.as_str()).collect();

    assert_eq!(links, ["https://a.example.org/", "https://b.example.org/"]);
}

#[tokio::test]
async fn test_news_mode_and_exhaustion() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("tbm".into(), "nws".into()),
            Matcher::UrlEncoded("gl".into(), "us".into()),
        ]))
        .with_status(200)
        .with_body("<html><body><p>Your search did not match any documents.</p></body></html>")
        .create_async()
        .await;

    let searcher = Searcher::new(config(&server)).unwrap();
    let request = searcher
        .request("obscure topic")
        .mode(Mode::News)
        .region("us")
        .length(3);

    let err = searcher.search(&request).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(
        err,
        SearchError::Exhausted {
            requested: 3,
            collected: 0
        }
    ));
}
