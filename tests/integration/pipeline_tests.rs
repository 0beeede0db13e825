//! Integration tests for the publishing pipeline
//!
//! Feeds and linked pages are served by wiremock; posts go to a recording
//! publisher so every tick can be inspected end-to-end.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use skyposter::config::StartArgs;
use skyposter::pipeline::{Pipeline, PipelineSettings, Scheduler};
use skyposter::preview::{HtmlPreviewScraper, JpegTranscoder};
use skyposter::publisher::{PostData, PostHandle, PublishError, Publisher};
use skyposter::storage::{open_storage, SharedStorage};
use skyposter::FeedPoller;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Publisher that records posts and rejects a configurable set of links
#[derive(Default)]
struct RecordingPublisher {
    posts: Mutex<Vec<PostData>>,
    rejected: Mutex<Vec<String>>,
}

impl RecordingPublisher {
    fn reject(&self, url: &str) {
        self.rejected.lock().unwrap().push(url.to_string());
    }

    fn accept_all(&self) {
        self.rejected.lock().unwrap().clear();
    }

    fn posts(&self) -> Vec<PostData> {
        self.posts.lock().unwrap().clone()
    }

    fn urls(&self) -> Vec<String> {
        self.posts()
            .into_iter()
            .filter_map(|p| p.embed.map(|e| e.uri))
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn post(&self, post: PostData) -> Result<PostHandle, PublishError> {
        let uri = post.embed.as_ref().map(|e| e.uri.clone()).unwrap_or_default();
        if self.rejected.lock().unwrap().contains(&uri) {
            return Err(PublishError::Publish(format!("rejected {}", uri)));
        }

        let mut posts = self.posts.lock().unwrap();
        posts.push(post);
        Ok(PostHandle {
            uri: format!("at://did:plc:test/app.bsky.feed.post/{}", posts.len()),
            cid: "bafytest".to_string(),
        })
    }
}

fn rss(items: &[(String, DateTime<Utc>)]) -> String {
    let items: String = items
        .iter()
        .map(|(link, published)| {
            format!(
                "<item><title>Article {link}</title><link>{link}</link><description>&lt;p&gt;Summary&lt;/p&gt;</description><pubDate>{}</pubDate></item>",
                published.to_rfc2822()
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Blog</title><link>https://example.com/</link><description>Blog</description>{}</channel></rss>"#,
        items
    )
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Serves a feed at `route` plus an article page with an og:image per link
async fn serve_feed(server: &MockServer, route: &str, slugs: &[&str]) {
    let now = Utc::now();
    let items: Vec<_> = slugs
        .iter()
        .enumerate()
        .map(|(i, slug)| {
            (
                format!("{}/articles/{}", server.uri(), slug),
                now - Duration::minutes(5 + i as i64),
            )
        })
        .collect();

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&items)))
        .mount(server)
        .await;
}

async fn serve_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cover.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png(1200, 600)),
        )
        .mount(server)
        .await;

    for slug in ["a", "b", "c", "shared"] {
        Mock::given(method("GET"))
            .and(path(format!("/articles/{}", slug)))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<html><head>
                    <title>Page {slug}</title>
                    <meta property="og:description" content="Page description {slug}">
                    <meta property="og:image" content="/cover.png">
                </head><body></body></html>"#
            )))
            .mount(server)
            .await;
    }
}

fn pipeline(db_path: &Path, publisher: Arc<RecordingPublisher>) -> Pipeline {
    let client = skyposter::feed::build_http_client().unwrap();
    Pipeline::new(
        client.clone(),
        SharedStorage::new(open_storage(db_path).unwrap()),
        Arc::new(HtmlPreviewScraper::new(client)),
        Arc::new(JpegTranscoder::new()),
        publisher,
        PipelineSettings {
            languages: vec!["en".to_string()],
            thumbnail_max_width: 800,
            retention: 100,
        },
    )
}

fn poller(idx: usize, server: &MockServer, route: &str) -> FeedPoller {
    let url = Url::parse(&format!("{}{}", server.uri(), route)).unwrap();
    FeedPoller::new(idx, url, Duration::hours(3))
}

#[tokio::test]
async fn test_entry_published_with_thumbnail_and_never_again_after_restart() {
    let server = MockServer::start().await;
    serve_feed(&server, "/feed.xml", &["a"]).await;
    serve_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("posts.sqlite3");
    let publisher = Arc::new(RecordingPublisher::default());

    let report = pipeline(&db_path, publisher.clone())
        .run_tick(&mut poller(0, &server, "/feed.xml"))
        .await
        .unwrap();
    assert_eq!(report.published, 1);

    let post = &publisher.posts()[0];
    let link = format!("{}/articles/a", server.uri());
    assert_eq!(post.text, format!("Article {} - {}", link, link));
    assert_eq!(post.languages, vec!["en".to_string()]);

    let embed = post.embed.as_ref().unwrap();
    assert_eq!(embed.description, "Summary");
    let thumb = embed.thumbnail.as_ref().expect("thumbnail attached");
    assert_eq!(image::guess_format(thumb).unwrap(), image::ImageFormat::Jpeg);
    let decoded = image::load_from_memory(thumb).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (800, 400));

    // A fresh process with a fresh window must not post it again
    let report = pipeline(&db_path, publisher.clone())
        .run_tick(&mut poller(0, &server, "/feed.xml"))
        .await
        .unwrap();
    assert_eq!(report.candidates, 0);
    assert_eq!(publisher.posts().len(), 1);
}

#[tokio::test]
async fn test_failed_entry_is_not_recorded_and_retried_later() {
    let server = MockServer::start().await;
    serve_feed(&server, "/feed.xml", &["a", "b"]).await;
    serve_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("posts.sqlite3");
    let publisher = Arc::new(RecordingPublisher::default());
    let failing = format!("{}/articles/a", server.uri());
    publisher.reject(&failing);

    let report = pipeline(&db_path, publisher.clone())
        .run_tick(&mut poller(0, &server, "/feed.xml"))
        .await
        .unwrap();
    assert_eq!((report.published, report.failed), (1, 1));

    let store = SharedStorage::new(open_storage(&db_path).unwrap());
    assert!(!store.has(&failing).unwrap());
    assert_eq!(store.count().unwrap(), 1);

    // After a restart the window covers the failed entry again
    publisher.accept_all();
    let report = pipeline(&db_path, publisher.clone())
        .run_tick(&mut poller(0, &server, "/feed.xml"))
        .await
        .unwrap();

    assert_eq!(report.published, 1);
    assert_eq!(publisher.urls().last(), Some(&failing));
    assert!(store.has(&failing).unwrap());
}

#[tokio::test]
async fn test_duplicate_link_in_one_feed_posted_once() {
    let server = MockServer::start().await;
    serve_feed(&server, "/feed.xml", &["c", "c"]).await;
    serve_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let publisher = Arc::new(RecordingPublisher::default());

    let report = pipeline(&dir.path().join("posts.sqlite3"), publisher.clone())
        .run_tick(&mut poller(0, &server, "/feed.xml"))
        .await
        .unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.published, 1);
    assert_eq!(publisher.posts().len(), 1);
}

#[tokio::test]
async fn test_link_shared_by_two_feeds_posted_once() {
    let server = MockServer::start().await;
    serve_feed(&server, "/one.xml", &["shared", "a"]).await;
    serve_feed(&server, "/two.xml", &["shared", "b"]).await;
    serve_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let publisher = Arc::new(RecordingPublisher::default());
    let pipeline = pipeline(&dir.path().join("posts.sqlite3"), publisher.clone());

    pipeline
        .run_tick(&mut poller(0, &server, "/one.xml"))
        .await
        .unwrap();
    pipeline
        .run_tick(&mut poller(1, &server, "/two.xml"))
        .await
        .unwrap();

    let shared = format!("{}/articles/shared", server.uri());
    let urls = publisher.urls();
    assert_eq!(urls.iter().filter(|u| **u == shared).count(), 1);
    assert_eq!(urls.len(), 3);
}

#[tokio::test]
async fn test_scheduler_built_from_configuration() {
    let server = MockServer::start().await;
    serve_feed(&server, "/one.xml", &["a"]).await;
    serve_feed(&server, "/two.xml", &["b"]).await;
    serve_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let feeds = format!("{0}/one.xml,{0}/two.xml", server.uri());
    let database_path = dir.path().join("posts.sqlite3").display().to_string();
    let config = StartArgs::try_parse_from([
        "start",
        "--app-identifier",
        "bot.example.com",
        "--app-password",
        "app-password",
        "--rss-feed-urls",
        &feeds,
        "--database-path",
        &database_path,
    ])
    .unwrap()
    .into_config()
    .unwrap();

    let publisher = Arc::new(RecordingPublisher::default());
    let pipeline = Arc::new(pipeline(&config.storage.database_path, publisher.clone()));
    let scheduler = Scheduler::from_config(pipeline, &config.feeds);
    assert_eq!(scheduler.feed_count(), 2);

    let (tx, rx) = tokio::sync::watch::channel(false);
    let running = tokio::spawn(scheduler.run(rx));

    for _ in 0..100 {
        if publisher.posts().len() >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    tx.send(true).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(10), running)
        .await
        .unwrap()
        .unwrap();

    let mut urls = publisher.urls();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            format!("{}/articles/a", server.uri()),
            format!("{}/articles/b", server.uri()),
        ]
    );
}
