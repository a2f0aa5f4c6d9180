//! Concurrent load through the gateway.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_spread_evenly() {
    let mut counters = Vec::new();
    let mut urls = Vec::new();
    for _ in 0..4 {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        urls.push(
            common::start_programmable_backend(move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (200, "ok".into())
                }
            })
            .await,
        );
        counters.push(hits);
    }

    let gateway = common::start_gateway(common::single_service_config("project", "/api/projects", &urls)).await;
    let client = common::client();

    let requests = (0..200).map(|i| {
        let client = client.clone();
        let url = gateway.url(&format!("/api/projects/{}", i));
        async move { client.get(url).send().await.map(|r| r.status().as_u16()) }
    });
    let statuses = join_all(requests).await;

    assert!(statuses.iter().all(|s| matches!(s, Ok(200))), "{:?}", statuses);
    for hits in &counters {
        assert_eq!(hits.load(Ordering::SeqCst), 50);
    }

    gateway.shutdown.trigger();
}
