//! Announcements from store mutation to SSE frame, and their effect on shutdown.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::watch,
    time::timeout,
};
use tower::ServiceExt;

use clicker_back::{
    dao::score_store::{MemoryScoreStore, ScoreStore},
    routes,
    services::{
        announcement_sinks::build_sinks,
        announcer::{Announcer, AnnouncerConfig},
        notifier::{self, OverflowPolicy},
    },
    state::{AppState, SseHub, shutdown_requested},
};

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Read SSE frames until one complete event (blank-line terminated) has arrived.
async fn next_sse_event(body: &mut Body) -> String {
    let mut text = String::new();
    while !text.contains("\n\n") {
        let frame = body
            .frame()
            .await
            .expect("stream ended before an event")
            .unwrap();
        if let Ok(data) = frame.into_data() {
            text.push_str(&String::from_utf8_lossy(&data));
        }
    }
    text
}

#[tokio::test]
async fn created_team_is_announced_on_the_sse_stream() {
    let (notifier, receivers) = notifier::channel(16, OverflowPolicy::DropNewest);
    let store: Arc<dyn ScoreStore> = Arc::new(MemoryScoreStore::with_events(notifier.into_sink()));
    let hub = SseHub::new(16);
    let config = AnnouncerConfig {
        template: "<b>{message}</b>".into(),
        log: false,
        ..AnnouncerConfig::default()
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    let announcer =
        Announcer::new(&config, receivers, build_sinks(&config, &hub)).spawn(stop_rx.clone());
    let app: Router = routes::router(AppState::new(store, hub, stop_rx));

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/v1/announcements"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body();

    let created = app
        .clone()
        .oneshot(request(Method::POST, "/v1/team/%3Cfox%3E"))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let event = timeout(Duration::from_secs(5), next_sse_event(&mut body))
        .await
        .expect("announcement should reach the subscriber");
    assert!(event.contains("event: announcement\n"), "{event}");
    assert!(
        event.contains("data: &lt;b&gt;A challenger appears! (&lt;fox&gt;)&lt;/b&gt;\n"),
        "{event}"
    );

    stop_tx.send(true).unwrap();
    timeout(Duration::from_secs(5), announcer)
        .await
        .expect("announcer should stop")
        .unwrap();
}

#[tokio::test]
async fn graceful_shutdown_completes_with_an_open_sse_client() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (stop_tx, stop_rx) = watch::channel(false);
    let app = routes::router(AppState::new(
        Arc::new(MemoryScoreStore::new()),
        SseHub::new(4),
        stop_rx.clone(),
    ));

    let mut signal = stop_rx;
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown_requested(&mut signal).await })
            .await
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /v1/announcements HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut buf = [0u8; 1024];
    let read = client.read(&mut buf).await.unwrap();
    assert!(String::from_utf8_lossy(&buf[..read]).starts_with("HTTP/1.1 200 OK"));

    stop_tx.send(true).unwrap();
    timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop while an SSE client is connected")
        .unwrap()
        .unwrap();
}
