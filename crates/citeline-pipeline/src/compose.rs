//! Document composition
//!
//! Assembles the final markdown document from drafts, the query plan and
//! the resolved source pool: abstract and keywords (when a generator
//! produced them), chapter sections, scope and methodology appendices,
//! and a numbered reference list with `[preprint]` labels. Citation ids
//! in the body are replaced by reference indices.

use crate::state::RunState;
use citeline_domain::SourceRecord;
use std::collections::BTreeMap;

/// Compose the report document.
pub fn compose_document(
    state: &RunState,
    abstract_text: Option<String>,
    keywords: Option<String>,
) -> String {
    let mut sections: Vec<String> = Vec::new();
    if let Some(abstract_text) = abstract_text {
        sections.push(format!("## Abstract\n{}\n", abstract_text.trim()));
    }
    if let Some(keywords) = keywords {
        sections.push(format!("**Keywords**: {}\n", keywords.trim()));
    }
    for draft in &state.drafts {
        sections.push(format!("## {}\n{}\n", draft.chapter_id, draft.text));
    }

    if state.inputs.scope.is_some() || !state.inputs.exclusions.is_empty() {
        let mut scope_lines = vec!["## Scope".to_string()];
        if let Some(scope) = &state.inputs.scope {
            scope_lines.push(scope.clone());
        }
        if !state.inputs.exclusions.is_empty() {
            scope_lines.push(format!("Out of scope: {}", state.inputs.exclusions.join(", ")));
        }
        sections.push(scope_lines.join("\n") + "\n");
    }

    if !state.plan.is_empty() {
        let mut method_lines =
            vec!["## Methodology".to_string(), "Search queries and selection summary".to_string()];
        for entry in &state.plan {
            let shown: Vec<&str> =
                entry.queries.iter().take(3).map(String::as_str).collect();
            method_lines.push(format!("- {}: {}", entry.chapter, shown.join(", ")));
        }
        method_lines.push(format!("- Queries executed: {}", state.retrieval_stats.total_queries));
        method_lines
            .push(format!("- Sources retrieved: {}", state.retrieval_stats.retrieved_sources));
        method_lines
            .push(format!("- Evidence snippets: {}", state.evidence_stats.evidence_items));
        sections.push(method_lines.join("\n") + "\n");
    }

    let mut used_ids: Vec<String> = Vec::new();
    for draft in &state.drafts {
        for source_id in &draft.citation_source_ids {
            if !used_ids.contains(source_id) {
                used_ids.push(source_id.clone());
            }
        }
    }
    let source_map: BTreeMap<&str, &SourceRecord> =
        state.sources.iter().map(|source| (source.cite_id(), source)).collect();

    let mut text = sections.join("\n");
    for (position, source_id) in used_ids.iter().enumerate() {
        text = text.replace(source_id.as_str(), &format!("[{}]", position + 1));
    }
    text = text.replace("([", "[").replace("])", "]");

    if !used_ids.is_empty() {
        let mut references = vec!["## References".to_string()];
        for (position, source_id) in used_ids.iter().enumerate() {
            if let Some(source) = source_map.get(source_id.as_str()) {
                references.push(format_reference(position + 1, source));
            }
        }
        text.push('\n');
        text.push_str(&references.join("\n"));
        text.push('\n');
    }
    text
}

fn format_reference(index: usize, source: &SourceRecord) -> String {
    let metadata = source.canonical_metadata.clone().unwrap_or_default();
    let authors = if metadata.authors.is_empty() {
        source.authors.join(", ")
    } else {
        metadata.authors.join(", ")
    };
    let year = metadata
        .year
        .or(source.year)
        .map(|y| y.to_string())
        .unwrap_or_else(|| "n.d.".to_string());
    let title = metadata.title.clone().unwrap_or_else(|| source.title.clone());
    let venue = metadata.venue.clone().or_else(|| source.venue.clone()).unwrap_or_default();
    let link = metadata
        .doi
        .clone()
        .or_else(|| source.doi.clone())
        .or_else(|| metadata.url.clone())
        .or_else(|| source.url.clone())
        .unwrap_or_default();

    let mut parts = vec![format!("[{}] ", index)];
    if !authors.is_empty() {
        parts.push(format!("{}. ", authors));
    }
    parts.push(format!("({}). ", year));
    parts.push(format!("{}. ", title));
    if !venue.is_empty() {
        parts.push(format!("{}. ", venue));
    }
    if !link.is_empty() {
        parts.push(link);
    }
    let label = if source.preprint_only { "[preprint] " } else { "" };
    format!("{}{}", label, parts.concat()).trim_end().to_string()
}
