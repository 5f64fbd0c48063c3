use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{info, warn};

use crate::browser::BrowserLauncher;
use crate::collector::{Collection, ReferenceCollector, StopReason};
use crate::config::ResolvedConfig;
use crate::domain::Query;
use crate::error::HarvestError;
use crate::fetch::ImageFetcher;
use crate::ledger::ProvenanceLedger;
use crate::store::ImageStore;
use crate::worker::TranscodeWorker;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub images_per_category: usize,
    pub ledger_path: Utf8PathBuf,
    pub delay_between: Duration,
}

impl RunOptions {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            images_per_category: usize::try_from(config.images_per_category)
                .unwrap_or(usize::MAX),
            ledger_path: config.ledger_path.clone(),
            delay_between: config.fetch.delay_between,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    pub started_at: String,
    pub finished_at: String,
    pub ledger_path: String,
    pub ledger_rows: usize,
    pub queries: Vec<QueryReport>,
}

impl HarvestReport {
    pub fn downloaded(&self) -> usize {
        self.queries.iter().map(|query| query.downloaded).sum()
    }

    pub fn failed(&self) -> usize {
        self.queries.iter().map(|query| query.failed).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub subject: String,
    pub category: String,
    pub search_term: String,
    pub folder: String,
    pub requested: usize,
    pub collected: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub stop: Option<StopReason>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Runs every query through collection and download, one at a time.
pub struct Harvester<L: BrowserLauncher, F: ImageFetcher> {
    store: ImageStore,
    collector: ReferenceCollector<L>,
    worker: TranscodeWorker<F>,
    options: RunOptions,
}

impl<L: BrowserLauncher, F: ImageFetcher> Harvester<L, F> {
    pub fn new(
        store: ImageStore,
        collector: ReferenceCollector<L>,
        worker: TranscodeWorker<F>,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            collector,
            worker,
            options,
        }
    }

    pub fn from_config(config: &ResolvedConfig, launcher: L, fetcher: F) -> Self {
        Self::new(
            ImageStore::new(config.output_root.clone()),
            ReferenceCollector::new(launcher, config.search.clone()),
            TranscodeWorker::new(fetcher),
            RunOptions::from_config(config),
        )
    }

    pub fn collector(&self) -> &ReferenceCollector<L> {
        &self.collector
    }

    pub fn worker(&self) -> &TranscodeWorker<F> {
        &self.worker
    }

    pub fn run(
        &self,
        queries: &[Query],
        sink: &dyn ProgressSink,
    ) -> Result<HarvestReport, HarvestError> {
        let started_at = iso_timestamp();
        let mut ledger = ProvenanceLedger::create(&self.options.ledger_path)?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Prepare; {} queries, ledger {}",
                queries.len(),
                ledger.path()
            ),
            elapsed: None,
        });

        if !queries.is_empty() {
            self.store.ensure_root()?;
        }

        let mut reports = Vec::with_capacity(queries.len());
        for (position, query) in queries.iter().enumerate() {
            let report = self.run_query(query, position + 1, queries.len(), &mut ledger, sink)?;
            reports.push(report);
        }

        let ledger_rows = ledger.rows();
        let ledger_path = ledger.finalize()?;
        let report = HarvestReport {
            started_at,
            finished_at: iso_timestamp(),
            ledger_path: ledger_path.to_string(),
            ledger_rows,
            queries: reports,
        };
        info!(
            "harvest finished: {} downloaded, {} failed",
            report.downloaded(),
            report.failed()
        );
        Ok(report)
    }

    fn run_query(
        &self,
        query: &Query,
        position: usize,
        total_queries: usize,
        ledger: &mut ProvenanceLedger,
        sink: &dyn ProgressSink,
    ) -> Result<QueryReport, HarvestError> {
        let label = self.collector.query_label(query);
        let folder = self.store.category_dir(query);
        let target = self.options.images_per_category;
        sink.event(ProgressEvent {
            message: format!("phase=Collect; query {position}/{total_queries}: {query}"),
            elapsed: None,
        });

        let start = Instant::now();
        let mut report = QueryReport {
            subject: query.subject().to_string(),
            category: query.category().to_string(),
            search_term: label.clone(),
            folder: folder.to_string(),
            requested: target,
            collected: 0,
            downloaded: 0,
            failed: 0,
            stop: None,
            error: None,
        };

        let Collection {
            references, stop, ..
        } = match self.collector.collect(query, target) {
            Ok(collection) => collection,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!("collection failed for \"{label}\": {err}");
                report.error = Some(err.to_string());
                return Ok(report);
            }
        };
        report.collected = references.len();
        report.stop = Some(stop);
        sink.event(ProgressEvent {
            message: format!(
                "phase=Download; {} of {target} references for {query}",
                references.len()
            ),
            elapsed: Some(start.elapsed()),
        });

        let total = references.len();
        for (offset, reference) in references.iter().enumerate() {
            if offset > 0 && !self.options.delay_between.is_zero() {
                thread::sleep(self.options.delay_between);
            }
            let index = offset + 1;
            if self.worker.process(&folder, index, reference, &label, ledger)? {
                report.downloaded += 1;
            } else {
                report.failed += 1;
            }
            sink.event(ProgressEvent {
                message: format!("download {index}/{total} -> {folder}"),
                elapsed: Some(start.elapsed()),
            });
        }

        Ok(report)
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
