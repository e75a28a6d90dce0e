use super::models::{AssociatedTag, LogWithAssociations, TaggedLog};
use crate::outcome::{Degradation, Outcome};
use crate::server::metrics;
use crate::tags::{ResolvedTag, TagStore};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Attaches resolved tags to a page of logs.
///
/// Preset tags are taken from the names embedded in the association rows.
/// Custom tag ids are collected across the whole page and resolved with a
/// single lookup, skipped when the page references none. A failed lookup
/// leaves every custom tag out but keeps the preset ones; ids the lookup does
/// not return are dropped. Log order and per-log association order are kept.
pub async fn resolve_tags<L>(
    page: Vec<LogWithAssociations<L>>,
    owner_id: &str,
    tags: &dyn TagStore,
) -> Outcome<Vec<TaggedLog<L>>> {
    let custom_ids: BTreeSet<i64> = page
        .iter()
        .flat_map(|entry| entry.associations.iter())
        .filter_map(|association| match association {
            AssociatedTag::Custom(id) => Some(*id),
            AssociatedTag::Preset(_) => None,
        })
        .collect();

    let mut warnings = Vec::new();
    let custom_names: HashMap<i64, ResolvedTag> = if custom_ids.is_empty() {
        HashMap::new()
    } else {
        let ids: Vec<i64> = custom_ids.iter().copied().collect();
        metrics::record_custom_tag_lookup();
        match tags.lookup_custom_tags(owner_id, &ids).await {
            Ok(found) => found.into_iter().map(|tag| (tag.id, tag)).collect(),
            Err(err) => {
                warn!(
                    "Custom tag lookup for {} ids failed, showing preset tags only: {:#}",
                    ids.len(),
                    err
                );
                warnings.push(Degradation::CustomTagLookupFailed {
                    reason: format!("{:#}", err),
                });
                HashMap::new()
            }
        }
    };
    let lookup_failed = !warnings.is_empty();

    let mut unresolved = BTreeSet::new();
    let tagged = page
        .into_iter()
        .map(|entry| {
            let tags = entry
                .associations
                .into_iter()
                .filter_map(|association| match association {
                    AssociatedTag::Preset(tag) => Some(tag),
                    AssociatedTag::Custom(id) => {
                        let resolved = custom_names.get(&id).cloned();
                        if resolved.is_none() && !lookup_failed {
                            unresolved.insert(id);
                        }
                        resolved
                    }
                })
                .collect();
            TaggedLog {
                log: entry.log,
                tags,
            }
        })
        .collect();

    if !unresolved.is_empty() {
        debug!("Dropped custom tags that no longer resolve: {:?}", unresolved);
        warnings.push(Degradation::UnresolvedCustomTags {
            ids: unresolved.into_iter().collect(),
        });
    }
    Outcome::with_warnings(tagged, warnings)
}
