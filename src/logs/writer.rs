use super::family::LogFamily;
use super::models::LogPayload;
use super::LogStore;
use crate::error::ServiceError;
use crate::identity::Identity;
use crate::outcome::{Degradation, Outcome};
use crate::server::metrics;
use crate::tags::TagRef;
use tracing::{info, warn};

/// Creates one log row for `owner` and then attaches the payload's tags.
///
/// Only the row insert decides success. When the association insert fails
/// the row stays in place and the failure is reported as a warning; nothing
/// is retried or rolled back.
pub async fn write_log<F: LogFamily>(
    store: &dyn LogStore<F>,
    owner: &Identity,
    payload: LogPayload<F::NewLog>,
) -> Result<Outcome<F::Log>, ServiceError> {
    F::validate(&payload.log).map_err(ServiceError::InvalidInput)?;

    let log = store
        .insert_log(&owner.id, &payload.log)
        .await
        .map_err(|err| ServiceError::store_rejected(&err, &format!("Failed to log {}", F::NAME)))?;
    let log_id = F::log_id(&log);
    info!("User {} logged {} {}", owner.id, F::NAME, log_id);
    metrics::record_log_written(F::NAME);

    let tags = TagRef::from_lists(&payload.preset_tag_ids, &payload.custom_tag_ids);
    if tags.is_empty() {
        return Ok(Outcome::clean(log));
    }

    match store.insert_associations(&owner.id, log_id, &tags).await {
        Ok(()) => Ok(Outcome::clean(log)),
        Err(err) => {
            warn!(
                "Saved {} log {} but attaching {} tags failed: {:#}",
                F::NAME,
                log_id,
                tags.len(),
                err
            );
            Ok(Outcome::with_warnings(
                log,
                vec![Degradation::TagAttachmentFailed {
                    log_id,
                    reason: format!("{:#}", err),
                }],
            ))
        }
    }
}
