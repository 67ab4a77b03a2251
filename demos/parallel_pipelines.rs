//! Runs one pipeline per resource concurrently, each writing its own CSV.
//!
//! The source here is a stand-in for a paginated API: it emits nested JSON
//! records page by page. Everything it needs is passed in explicitly, which
//! is also how a real HTTP-backed table would receive its client.
//!
//! Run with: cargo run --example parallel_pipelines

use std::time::Duration;

use rowflow::manager::{Config, PipelineManager};
use rowflow::row::{flatten, stringify_arrays, Row};
use rowflow::sink::CsvSink;
use rowflow::table::{Producer, StreamTable};
use rowflow::{Error, Transformer};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Fake paginated resource.
struct PagedResource {
    name: &'static str,
    pages: usize,
    page_size: usize,
    /// Fail on this page, to show error reporting.
    broken_page: Option<usize>,
}

impl PagedResource {
    fn table(self) -> StreamTable {
        StreamTable::spawn(move |producer| self.produce(producer))
    }

    async fn produce(self, producer: Producer) -> Result<(), Error> {
        for page in 0..self.pages {
            if self.broken_page == Some(page) {
                return Err(Error::from(std::io::Error::other(format!(
                    "{}: page {page} returned 503",
                    self.name
                ))));
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            for i in 0..self.page_size {
                let id = page * self.page_size + i;
                let record = json!({
                    "id": format!("{}-{id}", self.name),
                    "data": {
                        "name": {"first": "Ada", "last": format!("#{id}")},
                        "grades": [id % 12, (id + 1) % 12],
                    }
                });
                let row: Row = serde_json::from_value(record)?;
                if !producer.send(row).await {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logs
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let resources = vec![
        PagedResource {
            name: "schools",
            pages: 2,
            page_size: 5,
            broken_page: None,
        },
        PagedResource {
            name: "sections",
            pages: 4,
            page_size: 10,
            broken_page: None,
        },
        PagedResource {
            name: "students",
            pages: 8,
            page_size: 25,
            broken_page: Some(6),
        },
        PagedResource {
            name: "teachers",
            pages: 3,
            page_size: 10,
            broken_page: None,
        },
    ];

    let mut manager = PipelineManager::new(&Config::default());
    for resource in resources {
        let output = std::env::temp_dir().join(format!("{}.csv", resource.name));
        println!("{} -> {}", resource.name, output.display());
        let sink = CsvSink::create(&output)?;
        manager.add_pipeline(resource.name, async move {
            Transformer::new(resource.table())
                .map(flatten)
                .map(stringify_arrays)
                .sink(sink)
                .await
        });
    }

    if let Err(err) = manager.run_all(&CancellationToken::new()).await {
        eprintln!("got error: {err}");
        std::process::exit(1);
    }
    Ok(())
}
