use super::*;
use crate::sink::JsonSink;
use crate::table::{CsvTable, StreamTable};
use crate::testing::{numbered, SharedBuf};
use crate::transformer::Transformer;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[test]
fn test_config_creation() {
    let config = Config::new(5);
    assert_eq!(config.worker_num, 5);

    let config = ConfigBuilder::default().worker_num(2usize).build().unwrap();
    assert_eq!(config.worker_num, 2);

    let config = Config::default();
    assert!(config.worker_num >= 4);
}

#[test]
fn test_manager_creation() {
    let manager = PipelineManager::new(&Config::new(2));

    assert_eq!(manager.len(), 0);
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_run_all_success() {
    let mut manager = PipelineManager::new(&Config::new(2));
    let outputs: Vec<SharedBuf> = (0..3).map(|_| SharedBuf::default()).collect();

    for (i, out) in outputs.iter().enumerate() {
        let out = out.clone();
        manager.add_pipeline(format!("pipeline_{i}"), async move {
            Transformer::new(StreamTable::from_rows(numbered(3)))
                .sink(JsonSink::new(out))
                .await
        });
    }
    assert_eq!(manager.len(), 3);

    manager.run_all(&CancellationToken::new()).await.unwrap();

    for out in &outputs {
        assert_eq!(out.contents().lines().count(), 3);
    }
}

#[tokio::test]
async fn test_failure_does_not_abort_siblings() {
    let mut manager = PipelineManager::new(&Config::new(2));
    let good_out = SharedBuf::default();

    // header has two fields, the data line three
    manager.add_pipeline("broken", async {
        let input = Cursor::new(b"a,b\n1,2,3\n".to_vec());
        Transformer::new(CsvTable::new(input))
            .sink(JsonSink::new(SharedBuf::default()))
            .await
    });
    let out = good_out.clone();
    manager.add_pipeline("healthy", async move {
        Transformer::new(StreamTable::from_rows(numbered(20)))
            .sink(JsonSink::new(out))
            .await
    });

    let err = manager.run_all(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.pipeline(), "broken");
    assert!(matches!(
        err,
        ManagerError::PipelineFailed {
            source: Error::FieldCount { .. },
            ..
        }
    ));
    assert_eq!(good_out.contents().lines().count(), 20);
}

#[tokio::test]
async fn test_worker_num_bounds_concurrency() {
    let mut manager = PipelineManager::new(&Config::new(1));
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for i in 0..4 {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        manager.add_pipeline(format!("p{i}"), async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            Ok::<(), Error>(())
        });
    }

    manager.run_all(&CancellationToken::new()).await.unwrap();
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_abandons_running_pipelines() {
    let mut manager = PipelineManager::new(&Config::new(2));
    manager.add_pipeline("stuck", futures::future::pending::<Result<(), Error>>());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = manager.run_all(&cancel).await.unwrap_err();
    assert!(matches!(err, ManagerError::Cancelled(name) if name == "stuck"));
}

#[tokio::test]
async fn test_panicking_pipeline_is_reported() {
    let mut manager = PipelineManager::new(&Config::new(1));
    manager.add_pipeline(
        "explodes",
        futures::future::lazy(|_| -> Result<(), Error> { panic!("pipeline blew up") }),
    );
    manager.add_pipeline("fine", async { Ok::<(), Error>(()) });

    let err = manager.run_all(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ManagerError::Panicked(name) if name == "explodes"));
}
