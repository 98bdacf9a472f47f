//! The concrete ingestion `Executor`: wires URL mapping through the citation
//! linker into the single plan the Task Coordinator runs per task.
//!
//! Unlike a typical multi-tick `task_engine::Executor`, this domain has no
//! step that genuinely benefits from yielding mid-pipeline: every plan step
//! either completes fast or is itself an awaited network call with its own
//! timeout. So `step` runs the whole plan to a terminal outcome in one call,
//! using `PollOutcome::Sleep` only for the in-flight-task backoff case.

mod classify;

use classify::SourceKind;
use dedup::{DedupCandidate, DedupOutcome};
use graph_store::{GraphStore, UpsertCandidate};
use models::{
    Author, ComponentName, ComponentState, ErrorInfo, ErrorKind, ExecutionStatus, ResultType,
};
use std::sync::Arc;
use std::time::Duration;
use task_engine::{Executor, PollOutcome, TaskContext};

/// The in-flight-task backoff duration before a dedup "in progress" hit is
/// re-checked: phase 3 is advisory, not a lock, so we just wait and re-probe.
const IN_FLIGHT_RETRY_DELAY: Duration = Duration::from_secs(15);

pub struct IngestExecutor {
    url_mapping: url_mapping::MappingRegistry,
    metadata: metadata_fetch::MetadataFetcher,
    content: content_fetch::ContentFetcher,
    references: references_fetch::ReferencesFetcher,
    dedup: dedup::DedupEngine,
    linker: citation_linker::CitationLinker,
    graph: Arc<GraphStore>,
}

pub struct IngestExecutorConfig {
    pub crossref_mailto: Option<String>,
    pub semantic_scholar_api_key: Option<String>,
    pub pdf_parser_endpoint: url::Url,
    pub unpaywall_email: String,
    pub metadata_confidence_threshold: f32,
}

impl IngestExecutor {
    pub fn new(
        broker: Arc<broker::RequestBroker>,
        graph: Arc<GraphStore>,
        tasks: Arc<dyn task_engine::TaskStore>,
        config: IngestExecutorConfig,
    ) -> Self {
        let mapping_ctx = Arc::new(url_mapping::MappingContext::new(
            broker.clone(),
            config.semantic_scholar_api_key.clone(),
        ));
        IngestExecutor {
            url_mapping: url_mapping::MappingRegistry::with_defaults(mapping_ctx),
            metadata: metadata_fetch::MetadataFetcher::new(
                broker.clone(),
                config.crossref_mailto.clone(),
                config.semantic_scholar_api_key.clone(),
                config.pdf_parser_endpoint.clone(),
                config.metadata_confidence_threshold,
            ),
            content: content_fetch::ContentFetcher::new(
                broker.clone(),
                config.unpaywall_email.clone(),
                content_fetch::ContentFetchConfig::default(),
            ),
            references: references_fetch::ReferencesFetcher::new(
                broker.clone(),
                config.crossref_mailto.clone(),
                config.pdf_parser_endpoint.clone(),
            ),
            dedup: dedup::DedupEngine::new(graph.clone(), tasks),
            linker: citation_linker::CitationLinker::new(graph.clone()),
            graph,
        }
    }
}

#[async_trait::async_trait]
impl Executor for IngestExecutor {
    async fn step(&self, ctx: &mut TaskContext<'_>) -> anyhow::Result<PollOutcome> {
        ctx.task.execution_status = ExecutionStatus::Processing;

        // Plan step 1: URL Mapping.
        let mut doi: Option<String> = None;
        let mut arxiv_id: Option<String> = None;
        let mut source_page_url: Option<String> = None;
        let mut pdf_url: Option<String> = None;

        match classify::classify(&ctx.task.submitted_source) {
            SourceKind::Doi(value) => doi = Some(value),
            SourceKind::ArxivId(value) => arxiv_id = Some(value),
            SourceKind::Url(url) => {
                if ctx.is_cancel_requested().await {
                    return Ok(cancel(ctx.task));
                }
                if let Ok(Some(mapping)) = self.url_mapping.resolve(&url).await {
                    doi = mapping.doi;
                    arxiv_id = mapping.arxiv_id;
                    source_page_url = mapping.source_page_url;
                    pdf_url = mapping.pdf_url;
                }
                if source_page_url.is_none() && pdf_url.is_none() {
                    source_page_url = Some(url.to_string());
                }
            }
        }

        // Plan step 2: pre-metadata dedup (phases 1-3).
        let mut candidate = DedupCandidate {
            submitted_source: ctx.task.submitted_source.clone(),
            doi: doi.clone(),
            arxiv_id: arxiv_id.clone(),
            source_urls: source_page_url.clone().into_iter().collect(),
            ..Default::default()
        };

        match self.dedup.resolve_pre_fetch(&candidate, ctx.task.task_id).await {
            Ok(DedupOutcome::Existing(lid)) => return Ok(complete_as_duplicate(ctx.task, lid)),
            Ok(DedupOutcome::InProgress(_other)) => {
                ctx.task.components.metadata.advance(ComponentState::Waiting, "awaiting in-flight duplicate task", 0);
                return Ok(PollOutcome::Sleep(IN_FLIGHT_RETRY_DELAY));
            }
            Ok(DedupOutcome::New) => {}
            Err(err) => return Ok(fail(ctx.task, ErrorKind::Internal, err.to_string())),
        }

        if ctx.is_cancel_requested().await {
            return Ok(cancel(ctx.task));
        }

        // Plan step 3: metadata and content in parallel.
        ctx.task.components.metadata.advance(ComponentState::Processing, "fetching metadata", 10);
        ctx.task.components.content.advance(ComponentState::Processing, "fetching content", 10);

        let (metadata_result, content_result) = tokio::join!(
            self.metadata.fetch(metadata_fetch::MetadataFetchInput {
                doi: doi.as_deref(),
                arxiv_id: arxiv_id.as_deref(),
                pmid: None,
                pdf_bytes: None,
                landing_page_url: source_page_url.as_deref(),
                user_title: None,
                user_authors: &[],
            }),
            self.content.fetch(content_fetch::ContentFetchInput {
                user_pdf_url: None,
                object_store_url: None,
                mapping_pdf_url: pdf_url.as_deref(),
                landing_page_url: source_page_url.as_deref(),
                doi: doi.as_deref(),
            })
        );

        let pdf_bytes = content_result.as_ref().ok().map(|c| c.bytes.clone());
        match &content_result {
            Ok(content) => {
                ctx.task.components.content.advance(ComponentState::Success, "content fetched", 100);
                ctx.task.components.content.source = Some(format!("{:?}", content.source));
            }
            Err(err) => {
                ctx.task.components.content.fail(
                    ErrorInfo { kind: ErrorKind::NotFound, message: err.to_string(), details: None },
                    Some("provide PDF".to_string()),
                );
            }
        }

        if metadata_result.metadata.title.is_empty() {
            ctx.task.components.metadata.fail(
                ErrorInfo {
                    kind: ErrorKind::NotFound,
                    message: "no metadata source produced a title".to_string(),
                    details: None,
                },
                metadata_result.next_action.clone(),
            );
            return Ok(fail(ctx.task, ErrorKind::NotFound, "could not resolve metadata for submission"));
        }
        ctx.task.components.metadata.advance(ComponentState::Success, "metadata resolved", 100);

        if ctx.is_cancel_requested().await {
            return Ok(cancel(ctx.task));
        }

        // Plan step 4: post-metadata dedup (phase 4).
        let surnames: Vec<String> = metadata_result.metadata.authors.iter().map(Author::surname).collect();
        candidate.title = Some(metadata_result.metadata.title.clone());
        candidate.author_surnames = surnames.clone();
        candidate.year = metadata_result.metadata.year;
        candidate.pdf_bytes = pdf_bytes.clone();

        match self.dedup.resolve_post_metadata(&candidate).await {
            Ok(DedupOutcome::Existing(lid)) => {
                if let Err(err) = self.dedup.register_aliases(&lid, &candidate).await {
                    tracing::warn!(%lid, ?err, "failed to merge aliases into existing literature");
                }
                return Ok(complete_as_duplicate(ctx.task, lid));
            }
            Ok(DedupOutcome::InProgress(_)) | Ok(DedupOutcome::New) => {}
            Err(err) => return Ok(fail(ctx.task, ErrorKind::Internal, err.to_string())),
        }

        // Create the Literature record.
        let upsert = UpsertCandidate {
            title: metadata_result.metadata.title.clone(),
            author_surnames: surnames.clone(),
            authors: metadata_result.metadata.authors.iter().map(|a| a.name.clone()).collect(),
            year: metadata_result.metadata.year.unwrap_or(0),
            journal: metadata_result.metadata.journal.clone(),
            r#abstract: metadata_result.metadata.r#abstract.clone(),
            doi: doi.clone(),
            arxiv_id: arxiv_id.clone(),
            pmid: None,
            pdf_url: content_result.as_ref().ok().map(|c| c.fetched_url.clone()),
            source_page_url: source_page_url.clone(),
            task_id: Some(ctx.task.task_id.to_string()),
        };

        let lid = match self.graph.upsert_literature(upsert).await {
            Ok((lid, _created)) => lid,
            Err(err) => return Ok(fail(ctx.task, ErrorKind::Internal, err.to_string())),
        };

        if let Err(err) = self.dedup.register_aliases(&lid, &candidate).await {
            tracing::warn!(%lid, ?err, "failed to register aliases for new literature");
        }

        if ctx.is_cancel_requested().await {
            return Ok(cancel(ctx.task));
        }

        // Plan step 5: references (may require content bytes).
        ctx.task.components.references.advance(ComponentState::Processing, "fetching references", 10);
        let refs_result = self
            .references
            .fetch(references_fetch::ReferencesFetchInput {
                doi: doi.as_deref(),
                pdf_bytes,
                landing_page_url: source_page_url.as_deref(),
            })
            .await;
        match refs_result.source {
            Some(source) => {
                ctx.task.components.references.advance(ComponentState::Success, "references fetched", 100);
                ctx.task.components.references.source = Some(source.to_string());
            }
            None => ctx.task.components.references.fail(
                ErrorInfo {
                    kind: ErrorKind::NotFound,
                    message: "no reference source produced entries".to_string(),
                    details: None,
                },
                Some("references unavailable".to_string()),
            ),
        }
        let references = refs_result.references;

        // Plan step 6: citation linker.
        if let Err(err) = self.linker.link_references(&lid, &references).await {
            tracing::warn!(%lid, ?err, "citation linking failed for some references");
        }
        if let Err(err) = self
            .linker
            .promote_matching_unresolved(&lid, &metadata_result.metadata.title, &surnames, metadata_result.metadata.year)
            .await
        {
            tracing::warn!(%lid, ?err, "unresolved promotion sweep failed");
        }

        // Plan step 7: finalize.
        ctx.task.execution_status = ExecutionStatus::Completed;
        ctx.task.result_type = Some(ResultType::Created);
        ctx.task.literature_id = Some(lid);
        Ok(PollOutcome::Done)
    }
}

fn complete_as_duplicate(task: &mut models::Task, lid: models::Lid) -> PollOutcome {
    task.execution_status = ExecutionStatus::Completed;
    task.result_type = Some(ResultType::Duplicate);
    task.literature_id = Some(lid);
    for name in ComponentName::ALL {
        task.components.get_mut(name).advance(ComponentState::Success, "resolved to existing record", 100);
    }
    PollOutcome::Done
}

fn fail(task: &mut models::Task, kind: ErrorKind, message: impl Into<String>) -> PollOutcome {
    task.execution_status = ExecutionStatus::Failed;
    task.error_info = Some(ErrorInfo { kind, message: message.into(), details: None });
    PollOutcome::Done
}

fn cancel(task: &mut models::Task) -> PollOutcome {
    task.execution_status = ExecutionStatus::Cancelled;
    PollOutcome::Done
}
