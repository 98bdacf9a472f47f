//! Citation Linker: resolves each normalized reference of a
//! just-ingested `Literature` to an existing node (or a fresh `Unresolved`
//! placeholder), links a `CITES` edge either way, and sweeps existing
//! `Unresolved` nodes for promotion against the new record.

mod scoring;

use graph_store::{CiteTarget, GraphStore};
use models::{AliasResolution, AliasType, Lid, NormalizedReference};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CitationLinkerError {
    #[error(transparent)]
    Graph(#[from] graph_store::GraphStoreError),
}

/// How the candidate target for a `CITES` edge was resolved, surfaced for
/// logging/metrics; the edge itself is created identically either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMethod {
    Identifier,
    TitleMatch,
    Unresolved,
}

#[derive(Debug, Clone)]
pub struct LinkResult {
    pub method: LinkMethod,
    pub target: CiteTargetRef,
}

#[derive(Debug, Clone)]
pub enum CiteTargetRef {
    Literature(Lid),
    Unresolved(models::UnresolvedId),
}

const TITLE_SEARCH_LIMIT: u32 = 20;

pub struct CitationLinker {
    graph: Arc<GraphStore>,
}

impl CitationLinker {
    pub fn new(graph: Arc<GraphStore>) -> Self {
        CitationLinker { graph }
    }

    /// Resolves and links every reference of `src` (a)-(c).
    pub async fn link_references(
        &self,
        src: &Lid,
        references: &[NormalizedReference],
    ) -> Result<Vec<LinkResult>, CitationLinkerError> {
        let mut results = Vec::with_capacity(references.len());
        for reference in references {
            let result = self.link_one(src, reference).await?;
            results.push(result);
        }
        Ok(results)
    }

    async fn link_one(
        &self,
        src: &Lid,
        reference: &NormalizedReference,
    ) -> Result<LinkResult, CitationLinkerError> {
        let parsed = reference.parsed.as_ref();

        if let Some(doi) = parsed.and_then(|p| p.doi.as_deref()) {
            if let Some(target) = self.resolve_alias(AliasType::Doi, doi).await? {
                self.link(src, &target, 1.0, "doi").await?;
                return Ok(LinkResult { method: LinkMethod::Identifier, target });
            }
        }
        if let Some(arxiv_id) = parsed.and_then(|p| p.arxiv_id.as_deref()) {
            if let Some(target) = self.resolve_alias(AliasType::Arxiv, arxiv_id).await? {
                self.link(src, &target, 1.0, "arxiv").await?;
                return Ok(LinkResult { method: LinkMethod::Identifier, target });
            }
        }

        if let Some(title) = parsed.and_then(|p| p.title.as_deref()) {
            if let Some((lid, confidence)) = self.match_by_title(title, parsed).await? {
                let target = CiteTargetRef::Literature(lid);
                self.link(src, &target, confidence, "title_match").await?;
                return Ok(LinkResult { method: LinkMethod::TitleMatch, target });
            }
        }

        let unresolved_id = self
            .graph
            .create_unresolved(parsed.cloned(), &reference.raw_text)
            .await?;
        let target = CiteTargetRef::Unresolved(unresolved_id);
        self.link(src, &target, 0.0, "unresolved").await?;
        Ok(LinkResult { method: LinkMethod::Unresolved, target })
    }

    /// Ranks fulltext title-search candidates with the full composite score:
    /// cheap token-overlap first, only the top candidate pays for the
    /// Jaro-Winkler author pass.
    async fn match_by_title(
        &self,
        title: &str,
        parsed: Option<&models::ParsedReference>,
    ) -> Result<Option<(Lid, f32)>, CitationLinkerError> {
        let candidates = self.graph.search_by_title(title, TITLE_SEARCH_LIMIT).await?;

        let mut best: Option<(Lid, f32)> = None;
        for (lid, cand_title, cand_authors, cand_year) in candidates {
            if scoring::gate_score(title, &cand_title) < scoring::GATE_THRESHOLD {
                continue;
            }

            let ref_year = parsed.and_then(|p| p.year);
            if let (Some(ref_year), Some(cand_year)) = (ref_year, cand_year) {
                if (ref_year - cand_year).abs() > 1 {
                    continue;
                }
            }

            let ref_authors = parsed.map(|p| p.authors.clone()).unwrap_or_default();
            if !ref_authors.is_empty() {
                let rate = scoring::author_match_rate(&ref_authors, &cand_authors);
                if rate < scoring::AUTHOR_MATCH_RATE {
                    continue;
                }
            }

            let score = scoring::title_score(title, &cand_title);
            if score < scoring::ACCEPT_THRESHOLD {
                continue;
            }

            if best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                best = Some((lid, score));
            }
        }

        Ok(best)
    }

    async fn resolve_alias(&self, alias_type: AliasType, value: &str) -> Result<Option<CiteTargetRef>, CitationLinkerError> {
        match self.graph.resolve_alias(alias_type, value).await? {
            AliasResolution::Literature(lid) => Ok(Some(CiteTargetRef::Literature(lid))),
            AliasResolution::Unresolved(id) => Ok(Some(CiteTargetRef::Unresolved(id))),
            AliasResolution::None => Ok(None),
        }
    }

    async fn link(&self, src: &Lid, target: &CiteTargetRef, confidence: f32, source: &str) -> Result<(), CitationLinkerError> {
        let cite_target = match target {
            CiteTargetRef::Literature(lid) => CiteTarget::Literature(lid.clone()),
            CiteTargetRef::Unresolved(id) => CiteTarget::Unresolved(*id),
        };
        self.graph.link_cites(src, cite_target, confidence, source).await?;
        Ok(())
    }

    /// Sweeps `Unresolved` nodes matching the year of a newly-created
    /// `Literature` and promotes any whose title/author score clears the
    /// full acceptance threshold, preserving incident `CITES` edges.
    pub async fn promote_matching_unresolved(
        &self,
        new_lid: &Lid,
        title: &str,
        surnames: &[String],
        year: Option<i32>,
    ) -> Result<usize, CitationLinkerError> {
        let Some(year) = year else { return Ok(0) };
        let candidates = self.graph.unresolved_by_year(year).await?;

        let mut promoted = 0;
        for (id, parsed, _raw_text) in candidates {
            let Some(cand_title) = &parsed.title else { continue };
            if scoring::gate_score(title, cand_title) < scoring::GATE_THRESHOLD {
                continue;
            }
            if !parsed.authors.is_empty() {
                let rate = scoring::author_match_rate(&parsed.authors, surnames);
                if rate < scoring::AUTHOR_MATCH_RATE {
                    continue;
                }
            }
            if scoring::title_score(title, cand_title) < scoring::ACCEPT_THRESHOLD {
                continue;
            }

            self.graph.promote_unresolved(id, new_lid).await?;
            promoted += 1;
        }

        Ok(promoted)
    }
}
