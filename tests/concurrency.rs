//! Concurrent writers and readers against one storage directory.

use std::sync::Arc;

use tab_reader::ingest::ingest_payload;
use tab_reader::models::{IngestPayload, TabRecord};
use tab_reader::retrieve::{list_tabs, load_latest};
use tab_reader::store::{FsStore, TabStore};
use tempfile::TempDir;

fn batch(tag: &str, n: usize) -> Vec<TabRecord> {
    (0..n)
        .map(|i| TabRecord::new(format!("https://{}.dev/{}", tag, i), format!("{} {}", tag, i)))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingestions_never_mix() {
    let tmp = TempDir::new().unwrap();
    let store: Arc<dyn TabStore> = Arc::new(FsStore::open(tmp.path()).unwrap());
    let a = batch("alpha", 3);
    let b = batch("beta", 4);

    // Same receipt time for both, so they race for the same file name.
    let now = chrono::Local::now();
    let (ra, rb) = tokio::join!(
        {
            let store = store.clone();
            let a = a.clone();
            tokio::spawn(async move {
                ingest_payload(store.as_ref(), IngestPayload::Batch(a), now).await
            })
        },
        {
            let store = store.clone();
            let b = b.clone();
            tokio::spawn(async move {
                ingest_payload(store.as_ref(), IngestPayload::Batch(b), now).await
            })
        }
    );
    let ack_a = ra.unwrap().unwrap();
    let ack_b = rb.unwrap().unwrap();

    assert_ne!(ack_a.filename, ack_b.filename);
    assert_eq!(store.list_artifacts().await.unwrap().len(), 2);

    let tabs = list_tabs(store.as_ref()).await;
    assert!(tabs == a || tabs == b, "mixed result: {:?}", tabs);

    let snapshot = load_latest(store.as_ref()).await.unwrap();
    let expected = if snapshot.filename == ack_a.filename { &a } else { &b };
    assert_eq!(&snapshot.tabs, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_during_writes_see_whole_captures() {
    let tmp = TempDir::new().unwrap();
    let store: Arc<dyn TabStore> = Arc::new(FsStore::open(tmp.path()).unwrap());
    let batches: Vec<Vec<TabRecord>> = (0..20).map(|i| batch(&format!("w{}", i), 2)).collect();

    let writer = {
        let store = store.clone();
        let batches = batches.clone();
        tokio::spawn(async move {
            for b in batches {
                ingest_payload(store.as_ref(), IngestPayload::Batch(b), chrono::Local::now())
                    .await
                    .unwrap();
            }
        })
    };

    let reader = {
        let store = store.clone();
        let batches = batches.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                let tabs = list_tabs(store.as_ref()).await;
                assert!(
                    tabs.is_empty() || batches.contains(&tabs),
                    "reader saw a partial capture: {:?}",
                    tabs
                );
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();

    assert_eq!(store.list_artifacts().await.unwrap().len(), 20);
    assert_eq!(list_tabs(store.as_ref()).await, batches[19]);
}
