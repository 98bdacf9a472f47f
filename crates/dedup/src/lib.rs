//! Deduplication Engine: four ordered phases, first match wins.

mod fingerprint;
mod normalize;

pub use fingerprint::title_fp;
pub use normalize::normalize_url;

use graph_store::GraphStore;
use models::{Alias, AliasResolution, AliasType, ExecutionStatus, Lid, TaskId};
use std::sync::Arc;
use std::time::Duration;
use task_engine::TaskStore;

/// Default staleness window for phase 3's in-flight-task lookup.
pub const DEFAULT_STALENESS_WINDOW: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
pub enum DedupOutcome {
    /// A matching, non-failed `Literature` record already exists.
    Existing(Lid),
    /// A non-terminal task with an equal normalized source is already running.
    InProgress(TaskId),
    /// No match in any phase; the caller should proceed to create a new record.
    New,
}

/// The subset of a candidate document's identity that dedup can probe against,
/// filled in incrementally as URL mapping and the metadata/reference fetchers
/// produce results.
#[derive(Debug, Clone, Default)]
pub struct DedupCandidate {
    pub submitted_source: String,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub pmid: Option<String>,
    pub source_urls: Vec<String>,
    pub title: Option<String>,
    pub author_surnames: Vec<String>,
    pub year: Option<i32>,
    pub pdf_bytes: Option<bytes::Bytes>,
}

#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    #[error(transparent)]
    Graph(#[from] graph_store::GraphStoreError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct DedupEngine {
    graph: Arc<GraphStore>,
    tasks: Arc<dyn TaskStore>,
    staleness_window: chrono::Duration,
}

impl DedupEngine {
    pub fn new(graph: Arc<GraphStore>, tasks: Arc<dyn TaskStore>) -> Self {
        DedupEngine {
            graph,
            tasks,
            staleness_window: chrono::Duration::from_std(DEFAULT_STALENESS_WINDOW).unwrap(),
        }
    }

    /// Phase 1: explicit identifiers.
    pub async fn by_identifier(&self, candidate: &DedupCandidate) -> Result<DedupOutcome, DedupError> {
        for (alias_type, value) in [
            (AliasType::Doi, candidate.doi.as_deref()),
            (AliasType::Arxiv, candidate.arxiv_id.as_deref()),
            (AliasType::Pmid, candidate.pmid.as_deref()),
        ] {
            let Some(value) = value else { continue };
            if let Some(outcome) = self.probe_alias(alias_type, value).await? {
                return Ok(outcome);
            }
        }
        Ok(DedupOutcome::New)
    }

    /// Phase 2: normalized source URLs.
    pub async fn by_source_url(&self, candidate: &DedupCandidate) -> Result<DedupOutcome, DedupError> {
        for url in &candidate.source_urls {
            let normalized = normalize_url(url);
            if let Some(outcome) = self.probe_alias(AliasType::Url, &normalized).await? {
                return Ok(outcome);
            }
        }
        Ok(DedupOutcome::New)
    }

    /// Phase 3: in-flight tasks whose normalized `submitted_source` matches
    /// this candidate's, within the staleness window.
    pub async fn by_in_flight_task(
        &self,
        candidate: &DedupCandidate,
        self_task_id: TaskId,
    ) -> Result<DedupOutcome, DedupError> {
        let normalized_source = normalize_url(&candidate.submitted_source);
        let since = chrono::Utc::now() - self.staleness_window;
        let active = self.tasks.list_active_since(since).await?;

        for task in active {
            if task.task_id == self_task_id {
                continue;
            }
            if normalize_url(&task.submitted_source) == normalized_source {
                return Ok(DedupOutcome::InProgress(task.task_id));
            }
        }
        Ok(DedupOutcome::New)
    }

    /// Phase 4: content/title fingerprint.
    pub async fn by_fingerprint(&self, candidate: &DedupCandidate) -> Result<DedupOutcome, DedupError> {
        if let Some(pdf_bytes) = &candidate.pdf_bytes {
            let pdf_md5 = format!("{:x}", md5::compute(pdf_bytes.as_ref()));
            if let Some(outcome) = self.probe_alias(AliasType::PdfUrl, &pdf_md5).await? {
                return Ok(outcome);
            }
        }

        if let Some(title) = &candidate.title {
            let fp = title_fp(title, &candidate.author_surnames, candidate.year);
            if let Some(outcome) = self.probe_alias(AliasType::TitleFp, &fp).await? {
                return Ok(outcome);
            }
        }

        Ok(DedupOutcome::New)
    }

    /// Runs phases 1-3 (everything available before content/metadata land),
    /// the shape the task executor's pre-fetch dedup check uses.
    pub async fn resolve_pre_fetch(
        &self,
        candidate: &DedupCandidate,
        self_task_id: TaskId,
    ) -> Result<DedupOutcome, DedupError> {
        for outcome in [
            self.by_identifier(candidate).await?,
            self.by_source_url(candidate).await?,
        ] {
            if !matches!(outcome, DedupOutcome::New) {
                return Ok(outcome);
            }
        }
        self.by_in_flight_task(candidate, self_task_id).await
    }

    /// Runs phase 4 only, the shape the task executor's post-metadata dedup
    /// check uses once the metadata and reference fetchers (and optionally
    /// content fetch) have produced a title/fingerprint.
    pub async fn resolve_post_metadata(&self, candidate: &DedupCandidate) -> Result<DedupOutcome, DedupError> {
        self.by_fingerprint(candidate).await
    }

    /// Registers a newly created `Literature`'s aliases so future dedup
    /// lookups (phases 1/2/4) find it; each alias is its own upsert against
    /// the `Alias` index, so a partial failure here just leaves some
    /// identifiers unindexed rather than corrupting the record.
    pub async fn register_aliases(&self, lid: &Lid, candidate: &DedupCandidate) -> Result<(), DedupError> {
        let mut aliases = Vec::new();
        if let Some(doi) = &candidate.doi {
            aliases.push(Alias::new(AliasType::Doi, doi.clone()));
        }
        if let Some(arxiv_id) = &candidate.arxiv_id {
            aliases.push(Alias::new(AliasType::Arxiv, arxiv_id.clone()));
        }
        if let Some(pmid) = &candidate.pmid {
            aliases.push(Alias::new(AliasType::Pmid, pmid.clone()));
        }
        for url in &candidate.source_urls {
            aliases.push(Alias::new(AliasType::Url, normalize_url(url)));
        }
        if let Some(title) = &candidate.title {
            let fp = title_fp(title, &candidate.author_surnames, candidate.year);
            aliases.push(Alias::new(AliasType::TitleFp, fp));
        }
        if let Some(pdf_bytes) = &candidate.pdf_bytes {
            let pdf_md5 = format!("{:x}", md5::compute(pdf_bytes.as_ref()));
            aliases.push(Alias::new(AliasType::PdfUrl, pdf_md5));
        }

        for alias in aliases {
            self.graph.add_alias(lid, &alias).await?;
        }
        Ok(())
    }

    /// Resolves one alias, applying the failed-document cleanup rule: if the
    /// only match is a `Literature` whose originating task failed, the stale
    /// node is deleted and the probe reports no match so the caller proceeds
    /// to create a fresh record.
    async fn probe_alias(&self, alias_type: AliasType, value: &str) -> Result<Option<DedupOutcome>, DedupError> {
        match self.graph.resolve_alias(alias_type, value).await? {
            AliasResolution::Literature(lid) => {
                if self.literature_is_failed(&lid).await? {
                    // Only eligible for removal if nothing else already cites
                    // it; otherwise
                    // keep it and let this submission proceed as a retry of
                    // the same record.
                    if self.graph.has_incoming_cites(&lid).await? {
                        tracing::info!(%lid, "failed document has incoming citations, keeping and treating submission as retry");
                        Ok(Some(DedupOutcome::Existing(lid)))
                    } else {
                        tracing::info!(%lid, "dropping alias match to failed document, scheduling removal");
                        self.graph.delete_literature(&lid).await?;
                        Ok(None)
                    }
                } else {
                    Ok(Some(DedupOutcome::Existing(lid)))
                }
            }
            AliasResolution::Unresolved(_) | AliasResolution::None => Ok(None),
        }
    }

    async fn literature_is_failed(&self, lid: &Lid) -> Result<bool, DedupError> {
        let Some(task_id) = self.graph.literature_task_id(lid).await? else {
            return Ok(false);
        };
        let Ok(task_id) = task_id.parse::<TaskId>() else {
            return Ok(false);
        };
        let Some(task) = self.tasks.get(task_id).await? else {
            return Ok(false);
        };
        Ok(task.execution_status == ExecutionStatus::Failed)
    }
}
