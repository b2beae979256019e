//! Stage handlers
//!
//! One `StageHandlers` value per run holds the configuration and
//! collaborators; `execute` is the single dispatch point from stage to
//! handler. Handlers never panic across the node boundary: generator
//! problems degrade to deterministic fallbacks, provider problems arrive
//! as misses, and only genuine internal faults surface as `StageError`.

use crate::collaborators::Collaborators;
use crate::compose::compose_document;
use crate::config::{CitationAuditMode, PipelineConfig};
use crate::parse::{parse_json, Parsed};
use crate::stage::Stage;
use crate::state::{ChapterPlan, EvidenceStats, RetrievalStats, RunState, StageUpdate};
use citeline_domain::{DraftNode, EvidenceItem, SourceRecord};
use citeline_resolver::Resolver;
use citeline_verifier::{ConsensusVerifier, StatusChecker};
use futures::future::join_all;
use futures::StreamExt;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

static PREPRINT_CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)S-ARXIV-([0-9][0-9.]*(?:v\d+)?)").unwrap());

/// Unexpected internal fault inside a stage handler.
///
/// Caught at the node boundary by the engine; the run is marked failed
/// and partial state is retained.
#[derive(Error, Debug)]
pub enum StageError {
    /// Handler invariant violated
    #[error("{0}")]
    Internal(String),
}

/// Per-run handler set: configuration and collaborators as fields,
/// constructed once, dispatched by stage.
pub struct StageHandlers {
    config: Arc<PipelineConfig>,
    collaborators: Collaborators,
    resolver: Resolver,
    verifier: ConsensusVerifier,
    status_checker: StatusChecker,
}

impl StageHandlers {
    /// Wire handlers for one run.
    pub fn new(config: Arc<PipelineConfig>, collaborators: Collaborators) -> Self {
        let resolver = Resolver::new(collaborators.providers.clone());
        let verifier =
            ConsensusVerifier::new(collaborators.providers.clone(), config.max_concurrency);
        let status_checker =
            StatusChecker::new(collaborators.providers.clone(), config.integrity_mode);
        Self { config, collaborators, resolver, verifier, status_checker }
    }

    /// Execute one stage against the current state.
    pub async fn execute(&self, stage: Stage, state: &RunState) -> Result<StageUpdate, StageError> {
        match stage {
            Stage::Outline => self.outline(state).await,
            Stage::Plan => self.plan(state).await,
            Stage::Retrieve => self.retrieve(state).await,
            Stage::GateSources => Ok(self.gate_sources(state)),
            Stage::Resolve => self.resolve(state).await,
            Stage::GateConsensus => self.gate_consensus(state).await,
            Stage::StatusCheck => self.status_check(state).await,
            Stage::ExtractEvidence => self.extract_evidence(state).await,
            Stage::GateEvidence => Ok(self.gate_evidence(state)),
            Stage::Draft => self.draft(state).await,
            Stage::GateCitations => self.gate_citations(state).await,
            Stage::NormalizeCitations => Ok(self.normalize_citations(state)),
            Stage::Compose => self.compose(state).await,
            Stage::GateQuality => self.gate_quality(state).await,
            Stage::Refine => self.refine(state).await,
        }
    }

    /// Run the generator and drain its delta stream.
    ///
    /// `None` means no usable output (the generator is absent, failed,
    /// or produced nothing) and the caller takes its fallback path.
    async fn generate_text(&self, stage: Stage, prompt: &str) -> Option<String> {
        let generator = self.collaborators.generator.as_ref()?;
        let mut stream = match generator.generate(prompt).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(stage = stage.name(), error = %e, "generation failed, using fallback");
                return None;
            }
        };
        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            self.collaborators.events.emit(
                stage.name(),
                "generation delta",
                Some(json!({ "delta": delta })),
            );
            text.push_str(&delta);
        }
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    async fn outline(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        #[derive(Deserialize)]
        struct OutlinePayload {
            topic: Option<String>,
            outline: Option<Vec<String>>,
            scope: Option<String>,
            exclusions: Option<Vec<String>>,
        }

        let request = if state.inputs.raw_prompt.is_empty() {
            state.inputs.topic.clone()
        } else {
            state.inputs.raw_prompt.clone()
        };
        let mut inputs = state.inputs.clone();
        let mut errors = Vec::new();

        let prompt = format!(
            "You are an outline designer for a technical report. Given the request, \
             produce a concise topic and 5-7 chapter headings. Return a JSON object \
             only: {{\"topic\": \"...\", \"outline\": [\"...\"], \"scope\": \"...\", \
             \"exclusions\": [\"...\"]}}.\n\nRequest:\n{}",
            request
        );
        match self.generate_text(Stage::Outline, &prompt).await {
            Some(text) => match parse_json::<OutlinePayload>(&text) {
                Parsed::Structured(payload) => {
                    if let Some(topic) = payload.topic {
                        inputs.topic = topic;
                    }
                    inputs.outline = payload.outline.unwrap_or_default();
                    inputs.scope = payload.scope.or(inputs.scope);
                    inputs.exclusions = payload.exclusions.unwrap_or_default();
                }
                Parsed::Fallback(_) => {
                    inputs.outline = Vec::new();
                }
            },
            None => {
                if inputs.topic.is_empty() {
                    inputs.topic = request;
                }
                if inputs.outline.is_empty() {
                    inputs.outline = default_outline();
                }
            }
        }
        if inputs.outline.is_empty() {
            errors.push("Outline generation failed; no chapters returned.".to_string());
        }
        Ok(StageUpdate { inputs: Some(inputs), errors, ..StageUpdate::default() })
    }

    async fn plan(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        let chapters = state.inputs.outline.clone();
        let topic = state.inputs.topic.clone();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let tasks = chapters.iter().map(|chapter| {
            let semaphore = Arc::clone(&semaphore);
            let topic = topic.clone();
            async move {
                let _permit = semaphore.acquire().await;
                let prompt = format!(
                    "You are a research query planner. Generate 3-5 concise search \
                     queries for the chapter below. Return a JSON array of strings \
                     only.\n\nTopic: {}\nChapter: {}",
                    topic, chapter
                );
                let queries = match self.generate_text(Stage::Plan, &prompt).await {
                    Some(text) => match parse_json::<Vec<String>>(&text) {
                        Parsed::Structured(queries) if !queries.is_empty() => queries,
                        _ => fallback_queries(chapter, &topic),
                    },
                    None => fallback_queries(chapter, &topic),
                };
                ChapterPlan { chapter: chapter.clone(), queries }
            }
        });
        let plan = join_all(tasks).await;
        Ok(StageUpdate { plan: Some(plan), ..StageUpdate::default() })
    }

    async fn retrieve(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        let mut jobs: Vec<((usize, usize), String)> = Vec::new();
        for (chapter_index, plan) in state.plan.iter().enumerate() {
            for (query_index, query) in
                plan.queries.iter().take(self.config.max_queries_per_chapter).enumerate()
            {
                let truncated: String =
                    query.chars().take(self.config.max_query_length).collect();
                jobs.push(((chapter_index, query_index), truncated));
            }
        }
        let total_queries = jobs.len();

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let max_sources = self.config.max_sources;
        let tasks = jobs.into_iter().map(|(key, query)| {
            let semaphore = Arc::clone(&semaphore);
            let search = Arc::clone(&self.collaborators.search);
            async move {
                let _permit = semaphore.acquire().await;
                (key, search.search(&query, max_sources).await)
            }
        });
        let mut results = join_all(tasks).await;
        results.sort_by_key(|(key, _)| *key);

        let mut sources: Vec<SourceRecord> =
            results.into_iter().flat_map(|(_, chunk)| chunk).collect();
        sources.truncate(max_sources);
        let retrieval_stats =
            RetrievalStats { total_queries, retrieved_sources: sources.len() };
        debug!(retrieved = sources.len(), queries = total_queries, "retrieval complete");
        Ok(StageUpdate {
            sources: Some(sources),
            retrieval_stats: Some(retrieval_stats),
            ..StageUpdate::default()
        })
    }

    fn gate_sources(&self, state: &RunState) -> StageUpdate {
        let audit = citeline_gates::gate_sources(&state.sources);
        gate_update(Stage::GateSources, audit.passed, audit.issues)
    }

    async fn resolve(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        let (sources, stats) = self.resolver.resolve(state.sources.clone()).await;
        Ok(StageUpdate {
            sources: Some(sources),
            resolve_stats: Some(stats),
            ..StageUpdate::default()
        })
    }

    async fn gate_consensus(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        let outcome = self.verifier.verify(state.sources.clone()).await;
        let passed = outcome.audit.passed;
        let sources = if passed {
            outcome.accepted
        } else {
            // gate failed: keep the full scored partition in state
            let mut all = outcome.accepted;
            all.extend(outcome.pending);
            all.extend(outcome.rejected);
            all
        };
        let mut update = gate_update(Stage::GateConsensus, passed, outcome.audit.issues);
        update.sources = Some(sources);
        Ok(update)
    }

    async fn status_check(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        let outcome = self.status_checker.check(state.sources.clone()).await;
        Ok(StageUpdate {
            sources: Some(outcome.sources),
            warnings: outcome.warnings,
            errors: outcome.errors,
            ..StageUpdate::default()
        })
    }

    async fn extract_evidence(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        #[derive(Deserialize)]
        struct SnippetPayload {
            snippet: Option<String>,
            locator: Option<String>,
        }

        let chapters = state.inputs.outline.clone();
        let sources = state.sources.clone();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));

        let mut jobs: Vec<((usize, usize), String, SourceRecord)> = Vec::new();
        for (chapter_index, chapter) in chapters.iter().enumerate() {
            for (source_index, source) in sources.iter().enumerate() {
                jobs.push(((chapter_index, source_index), chapter.clone(), source.clone()));
            }
        }

        let tasks = jobs.into_iter().map(|(key, chapter, source)| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await;
                let fallback_snippet = source
                    .abstract_text
                    .clone()
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| {
                        format!("{} evidence drawn from {}", chapter, source.title)
                    });
                let mut snippet = fallback_snippet.clone();
                let mut locator = "abstract".to_string();
                if let Some(abstract_text) = source.abstract_text.as_deref() {
                    let prompt = format!(
                        "Summarize the abstract into one or two sentences of evidence. \
                         Return a JSON object with keys: snippet, locator.\n\n\
                         Chapter: {}\nSource title: {}\nAbstract: {}",
                        chapter, source.title, abstract_text
                    );
                    if let Some(text) = self.generate_text(Stage::ExtractEvidence, &prompt).await
                    {
                        match parse_json::<SnippetPayload>(&text) {
                            Parsed::Structured(payload) => {
                                if let Some(value) = payload.snippet {
                                    snippet = value;
                                }
                                if let Some(value) = payload.locator {
                                    locator = value;
                                }
                            }
                            Parsed::Fallback(raw) => snippet = raw,
                        }
                    }
                }
                let (chapter_index, source_index) = key;
                let item = EvidenceItem {
                    claim_id: format!("{}-C{:03}", chapter, source_index + 1),
                    source_id: source.cite_id().to_string(),
                    snippet,
                    locator: Some(locator),
                    relevance_score: 0.5,
                    chapter_id: Some(chapter),
                };
                ((chapter_index, source_index), item)
            }
        });
        let mut results = join_all(tasks).await;
        results.sort_by_key(|(key, _)| *key);
        let evidence: Vec<EvidenceItem> = results.into_iter().map(|(_, item)| item).collect();
        let evidence_stats = EvidenceStats { evidence_items: evidence.len() };
        Ok(StageUpdate {
            evidence: Some(evidence),
            evidence_stats: Some(evidence_stats),
            ..StageUpdate::default()
        })
    }

    fn gate_evidence(&self, state: &RunState) -> StageUpdate {
        let audit = citeline_gates::gate_evidence_coverage(&state.inputs.outline, &state.evidence);
        gate_update(Stage::GateEvidence, audit.passed, audit.issues)
    }

    async fn draft(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        let tasks = state.inputs.outline.iter().map(|chapter| {
            let items: Vec<&EvidenceItem> = state
                .evidence
                .iter()
                .filter(|item| item.chapter_id.as_deref() == Some(chapter.as_str()))
                .collect();
            let topic = state.inputs.topic.clone();
            let scope = state.inputs.scope.clone();
            async move {
                let claim_ids: Vec<String> =
                    items.iter().map(|item| item.claim_id.clone()).collect();
                let mut source_ids: Vec<String> = Vec::new();
                for item in &items {
                    if !source_ids.contains(&item.source_id) {
                        source_ids.push(item.source_id.clone());
                    }
                }
                let mut prompt = format!(
                    "Draft the chapter as a single technical paragraph. Use only the \
                     evidence snippets and cite sources as (canonical id). No informal \
                     tone.\n\nChapter: {}\nTopic: {}\nScope: {}\nEvidence:\n",
                    chapter,
                    topic,
                    scope.unwrap_or_default()
                );
                for item in &items {
                    prompt.push_str(&format!("- [{}] {}\n", item.source_id, item.snippet));
                }
                let text = match self.generate_text(Stage::Draft, &prompt).await {
                    Some(text) => text,
                    None => format!(
                        "{} draws on the corroborated evidence ({}).",
                        chapter,
                        source_ids.join(", ")
                    ),
                };
                DraftNode {
                    chapter_id: chapter.clone(),
                    paragraph_id: format!("{}-P001", chapter),
                    text,
                    claim_ids,
                    citation_source_ids: source_ids,
                }
            }
        });
        let drafts = join_all(tasks).await;
        Ok(StageUpdate { drafts: Some(drafts), ..StageUpdate::default() })
    }

    async fn gate_citations(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        let mut audit = citeline_gates::gate_citations(&state.sources, &state.drafts);
        let mut prompt = String::from(
            "You are a citation auditor. Review the drafts for citation problems \
             (unmatched ids, placeholder formats, bibliographic gaps). Return a JSON \
             array of short issue strings.\n\n",
        );
        for draft in &state.drafts {
            prompt.push_str(&format!("[{}] {}\n", draft.chapter_id, draft.text));
        }
        if let Some(text) = self.generate_text(Stage::GateCitations, &prompt).await {
            if let Parsed::Structured(extra) = parse_json::<Vec<String>>(&text) {
                if !extra.is_empty() {
                    audit.issues.extend(extra);
                    audit.passed = false;
                }
            }
        }

        if !audit.passed && self.config.citation_audit_mode == CitationAuditMode::Soft {
            return Ok(StageUpdate {
                gate: Some((Stage::GateCitations.name(), true)),
                warnings: audit.issues,
                last_issues: Some(Vec::new()),
                ..StageUpdate::default()
            });
        }
        Ok(gate_update(Stage::GateCitations, audit.passed, audit.issues))
    }

    fn normalize_citations(&self, state: &RunState) -> StageUpdate {
        let drafts = state
            .drafts
            .iter()
            .map(|draft| {
                let text =
                    PREPRINT_CITATION.replace_all(&draft.text, "preprint:$1").to_string();
                let citation_source_ids = draft
                    .citation_source_ids
                    .iter()
                    .map(|id| PREPRINT_CITATION.replace_all(id, "preprint:$1").to_string())
                    .collect();
                DraftNode { text, citation_source_ids, ..draft.clone() }
            })
            .collect();
        StageUpdate { drafts: Some(drafts), ..StageUpdate::default() }
    }

    async fn compose(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        let mut abstract_text = None;
        let mut keywords = None;
        if self.collaborators.generator.is_some() {
            let mut prompt = String::from(
                "Create a short abstract for the report from the draft sections. \
                 Return a single paragraph.\n\n",
            );
            for draft in &state.drafts {
                prompt.push_str(&format!("[{}] {}\n", draft.chapter_id, draft.text));
            }
            abstract_text = self.generate_text(Stage::Compose, &prompt).await;

            let mut keyword_prompt = String::from(
                "Generate 3-6 concise keywords for the report. Return a \
                 comma-separated list only.\n\n",
            );
            for draft in &state.drafts {
                keyword_prompt.push_str(&format!("[{}] {}\n", draft.chapter_id, draft.text));
            }
            keywords = self.generate_text(Stage::Compose, &keyword_prompt).await;
        }
        let composed = compose_document(state, abstract_text, keywords);
        Ok(StageUpdate { composed_text: Some(composed), ..StageUpdate::default() })
    }

    async fn gate_quality(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        let mut issues = Vec::new();
        if state.drafts.is_empty() {
            issues.push("Draft output is empty.".to_string());
        }
        for draft in &state.drafts {
            if draft.text.contains("I think") || draft.text.contains("in my opinion") {
                issues.push(format!("Informal tone found in {}.", draft.chapter_id));
            }
        }
        let mut prompt = format!(
            "You are a quality reviewer for a technical report. Check the drafts for \
             style violations and structural problems. Return a JSON array of \
             issues.\n\nTopic: {}\nScope: {}\nExclusions: {}\n\n",
            state.inputs.topic,
            state.inputs.scope.clone().unwrap_or_default(),
            state.inputs.exclusions.join(", ")
        );
        for draft in &state.drafts {
            prompt.push_str(&format!("[{}] {}\n", draft.chapter_id, draft.text));
        }
        if let Some(text) = self.generate_text(Stage::GateQuality, &prompt).await {
            if let Parsed::Structured(extra) = parse_json::<Vec<String>>(&text) {
                issues.extend(extra);
            }
        }
        let passed = issues.is_empty();
        Ok(gate_update(Stage::GateQuality, passed, issues))
    }

    async fn refine(&self, state: &RunState) -> Result<StageUpdate, StageError> {
        let prompt = format!(
            "You are refining search queries for a technical report after a failed \
             validation pass. Propose 2-3 improved queries per chapter. Return a JSON \
             object mapping chapter titles to query arrays.\n\nTopic: {}\nChapters: \
             {}\nIssues: {}",
            state.inputs.topic,
            state.inputs.outline.join("; "),
            state.last_issues.join("; ")
        );
        let refined: Option<BTreeMap<String, Vec<String>>> =
            match self.generate_text(Stage::Refine, &prompt).await {
                Some(text) => parse_json::<BTreeMap<String, Vec<String>>>(&text).structured(),
                None => None,
            };

        let mut plan = Vec::new();
        for chapter in &state.inputs.outline {
            let existing = state
                .plan
                .iter()
                .find(|entry| &entry.chapter == chapter)
                .map(|entry| entry.queries.clone())
                .unwrap_or_default();
            let queries = match &refined {
                Some(map) => map.get(chapter).cloned().unwrap_or(existing),
                None => {
                    let mut queries = existing;
                    queries.push(format!("{} technical report", chapter));
                    queries.push(format!("{} peer-reviewed evaluation", chapter));
                    queries
                }
            };
            plan.push(ChapterPlan { chapter: chapter.clone(), queries });
        }
        Ok(StageUpdate { plan: Some(plan), ..StageUpdate::default() })
    }
}

fn gate_update(stage: Stage, passed: bool, issues: Vec<String>) -> StageUpdate {
    if passed {
        StageUpdate {
            gate: Some((stage.name(), true)),
            last_issues: Some(Vec::new()),
            ..StageUpdate::default()
        }
    } else {
        StageUpdate {
            gate: Some((stage.name(), false)),
            errors: issues.clone(),
            last_issues: Some(issues),
            ..StageUpdate::default()
        }
    }
}

fn default_outline() -> Vec<String> {
    [
        "Background and Motivation",
        "Current Approaches",
        "Key Challenges",
        "Comparative Evaluation",
        "Open Problems",
        "Research Directions",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn fallback_queries(chapter: &str, topic: &str) -> Vec<String> {
    vec![
        format!("{} {}", chapter, topic),
        format!("{} survey", chapter),
        format!("{} state of the art", chapter),
    ]
}
