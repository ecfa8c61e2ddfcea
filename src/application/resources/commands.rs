use std::collections::{BTreeMap, HashSet};

use futures::future::join_all;
use metrics::counter;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::media::MediaUpload;
use crate::application::repos::{CreateResourceParams, RepoError, UpdateResourceParams};
use crate::domain::entities::{MediaRef, MediaValue, ResourceMedia, ResourceRecord};
use crate::domain::resources::ResourceKind;
use crate::domain::schema::{MediaCardinality, ResourceSchema};

use super::service::{METRIC_MEDIA_DELETE_FAILED, METRIC_MEDIA_UPLOAD_FAILED, ResourceService};
use super::types::{
    CreateResource, DeleteOutcome, OrphanedMedia, ResourceError, UpdateResource,
    parse_reorder_items,
};

impl ResourceService {
    /// Validates, uploads media, assigns an order when none was given, then persists.
    ///
    /// Uploaded objects are removed again when anything after the upload fails.
    pub async fn create(
        &self,
        kind: ResourceKind,
        command: CreateResource,
    ) -> Result<ResourceRecord, ResourceError> {
        let schema = kind.schema();
        let slots = upload_slots(&command.uploads);
        let draft = schema.validate_create(&command.fields, &slots)?;

        let uploaded = self.upload_all(kind, &command.uploads).await?;
        let uploaded_refs = external_refs(&uploaded);
        let mut media = ResourceMedia::new();
        for (slot, value) in assemble_uploads(schema, uploaded) {
            media.insert(slot, value);
        }

        // Held until the insert lands so concurrent creates see each other's order.
        let order_guard = match draft.order {
            Some(_) => None,
            None => Some(self.order_lock(kind).lock().await),
        };

        let order = match draft.order {
            Some(order) => order,
            None => match self.reader.max_order(kind).await {
                Ok(max) => max.map_or(1, |max| max.saturating_add(1)),
                Err(err) => {
                    drop(order_guard);
                    self.discard_media(kind, &uploaded_refs, "create").await;
                    return Err(err.into());
                }
            },
        };

        let params = CreateResourceParams {
            kind,
            fields: draft.fields,
            media,
            is_active: draft.is_active.unwrap_or(true),
            order,
        };

        let created = self.writer.create_resource(params).await;
        drop(order_guard);

        match created {
            Ok(record) => {
                self.invalidate(kind);
                info!(
                    target = "fortview::resources",
                    kind = %kind,
                    id = %record.id,
                    order = record.order,
                    media = uploaded_refs.len(),
                    "Resource created"
                );
                Ok(record)
            }
            Err(err) => {
                warn!(
                    target = "fortview::resources",
                    kind = %kind,
                    error = %err,
                    "Resource insert failed; discarding uploaded media"
                );
                self.discard_media(kind, &uploaded_refs, "create").await;
                Err(err.into())
            }
        }
    }

    /// Applies a partial update.
    ///
    /// New media is uploaded first. The media it replaces is deleted only after the
    /// update is stored, so a failed update leaves the old objects in place.
    pub async fn update(
        &self,
        kind: ResourceKind,
        id: Uuid,
        command: UpdateResource,
    ) -> Result<ResourceRecord, ResourceError> {
        let schema = kind.schema();
        let slots = upload_slots(&command.uploads);
        let patch = schema.validate_patch(&command.fields, &slots)?;

        let existing = self
            .reader
            .find_by_id(kind, id)
            .await
            .map_err(ResourceError::for_id(kind, id))?
            .ok_or(ResourceError::NotFound { kind, id })?;

        let uploaded = self.upload_all(kind, &command.uploads).await?;
        let uploaded_refs = external_refs(&uploaded);
        let plan = plan_media_update(schema, &existing.media, &patch.retained_media, uploaded);

        let params = UpdateResourceParams {
            kind,
            id,
            set: patch.set,
            clear: patch.clear,
            media: plan.write,
            is_active: patch.is_active,
            order: patch.order,
        };

        match self.writer.update_resource(params).await {
            Ok(record) => {
                self.discard_media(kind, &plan.superseded, "update").await;
                self.invalidate(kind);
                info!(
                    target = "fortview::resources",
                    kind = %kind,
                    id = %id,
                    replaced_media = plan.superseded.len(),
                    "Resource updated"
                );
                Ok(record)
            }
            Err(err) => {
                self.discard_media(kind, &uploaded_refs, "update").await;
                Err(ResourceError::for_id(kind, id)(err))
            }
        }
    }

    /// Deletes every media object of the resource, then the resource itself.
    ///
    /// Media that could not be deleted does not block the delete; it is reported
    /// back in [`DeleteOutcome::orphaned`].
    pub async fn delete(&self, kind: ResourceKind, id: Uuid) -> Result<DeleteOutcome, ResourceError> {
        let existing = self
            .reader
            .find_by_id(kind, id)
            .await
            .map_err(ResourceError::for_id(kind, id))?
            .ok_or(ResourceError::NotFound { kind, id })?;

        let refs: Vec<String> = existing
            .media
            .refs()
            .into_iter()
            .map(|media| media.external_ref.clone())
            .collect();
        let results = join_all(refs.iter().map(|external_ref| self.media.delete(external_ref))).await;

        let mut orphaned = Vec::new();
        for (external_ref, result) in refs.into_iter().zip(results) {
            if let Err(error) = result {
                counter!(METRIC_MEDIA_DELETE_FAILED).increment(1);
                warn!(
                    target = "fortview::resources",
                    kind = %kind,
                    id = %id,
                    external_ref = %external_ref,
                    error = %error,
                    "Media delete failed; deleting resource anyway"
                );
                orphaned.push(OrphanedMedia {
                    external_ref,
                    error,
                });
            }
        }

        self.writer
            .delete_resource(kind, id)
            .await
            .map_err(ResourceError::for_id(kind, id))?;
        self.invalidate(kind);
        info!(
            target = "fortview::resources",
            kind = %kind,
            id = %id,
            orphaned = orphaned.len(),
            "Resource deleted"
        );

        Ok(DeleteOutcome {
            record: existing,
            orphaned,
        })
    }

    /// Writes each `(id, order)` pair independently and returns the whole kind in
    /// its new display order. Ids that do not resolve are skipped.
    pub async fn reorder(
        &self,
        kind: ResourceKind,
        items: &Value,
    ) -> Result<Vec<ResourceRecord>, ResourceError> {
        let items = parse_reorder_items(items)?;

        let results = join_all(
            items
                .iter()
                .map(|item| self.writer.set_order(kind, item.id, item.order)),
        )
        .await;

        let mut applied = 0usize;
        let mut failure: Option<RepoError> = None;
        for (item, result) in items.iter().zip(results) {
            match result {
                Ok(()) => applied += 1,
                Err(RepoError::NotFound) => debug!(
                    target = "fortview::resources",
                    kind = %kind,
                    id = %item.id,
                    "Skipping reorder of unknown resource"
                ),
                Err(err) => {
                    warn!(
                        target = "fortview::resources",
                        kind = %kind,
                        id = %item.id,
                        error = %err,
                        "Reorder item failed"
                    );
                    failure.get_or_insert(err);
                }
            }
        }

        if applied > 0 {
            self.invalidate(kind);
        }
        if let Some(err) = failure {
            return Err(err.into());
        }

        info!(
            target = "fortview::resources",
            kind = %kind,
            requested = items.len(),
            applied,
            "Resources reordered"
        );
        Ok(self.reader.list_all(kind).await?)
    }

    pub async fn toggle_active(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<ResourceRecord, ResourceError> {
        let record = self
            .writer
            .toggle_active(kind, id)
            .await
            .map_err(ResourceError::for_id(kind, id))?;
        self.invalidate(kind);
        info!(
            target = "fortview::resources",
            kind = %kind,
            id = %id,
            is_active = record.is_active,
            "Resource active flag toggled"
        );
        Ok(record)
    }

    /// Uploads every file concurrently. If any upload fails, the ones that
    /// succeeded are deleted again before the error is returned.
    async fn upload_all(
        &self,
        kind: ResourceKind,
        uploads: &[MediaUpload],
    ) -> Result<Vec<(String, MediaRef)>, ResourceError> {
        if uploads.is_empty() {
            return Ok(Vec::new());
        }

        let folder = self.folder(kind);
        let results = join_all(uploads.iter().map(|upload| self.media.upload(upload, &folder))).await;

        let mut stored = Vec::with_capacity(uploads.len());
        let mut failure = None;
        for (upload, result) in uploads.iter().zip(results) {
            match result {
                Ok(media) => stored.push((upload.slot.clone(), media)),
                Err(err) => {
                    counter!(METRIC_MEDIA_UPLOAD_FAILED).increment(1);
                    warn!(
                        target = "fortview::resources",
                        kind = %kind,
                        slot = %upload.slot,
                        file_name = %upload.file_name,
                        error = %err,
                        "Media upload failed"
                    );
                    failure.get_or_insert(err);
                }
            }
        }

        match failure {
            None => Ok(stored),
            Some(err) => {
                self.discard_media(kind, &external_refs(&stored), "upload").await;
                Err(ResourceError::MediaUpload(err))
            }
        }
    }
}

fn upload_slots(uploads: &[MediaUpload]) -> Vec<&str> {
    uploads.iter().map(|upload| upload.slot.as_str()).collect()
}

fn external_refs(uploaded: &[(String, MediaRef)]) -> Vec<String> {
    uploaded
        .iter()
        .map(|(_, media)| media.external_ref.clone())
        .collect()
}

/// Groups freshly uploaded media by slot, in upload order.
fn assemble_uploads(
    schema: &ResourceSchema,
    uploaded: Vec<(String, MediaRef)>,
) -> BTreeMap<String, MediaValue> {
    let mut by_slot: BTreeMap<String, Vec<MediaRef>> = BTreeMap::new();
    for (slot, media) in uploaded {
        by_slot.entry(slot).or_default().push(media);
    }

    by_slot
        .into_iter()
        .filter_map(|(slot, mut refs)| {
            let cardinality = schema.media_slot(&slot)?.cardinality;
            let value = match cardinality {
                MediaCardinality::Single => MediaValue::One(refs.pop()?),
                MediaCardinality::Many => MediaValue::Many(refs),
            };
            Some((slot, value))
        })
        .collect()
}

#[derive(Debug, Default)]
struct MediaPlan {
    /// Slots to overwrite.
    write: ResourceMedia,
    /// External refs that are no longer referenced once `write` is stored.
    superseded: Vec<String>,
}

fn plan_media_update(
    schema: &ResourceSchema,
    current: &ResourceMedia,
    retained: &BTreeMap<String, Vec<String>>,
    uploaded: Vec<(String, MediaRef)>,
) -> MediaPlan {
    let mut fresh = assemble_uploads(schema, uploaded);
    let mut plan = MediaPlan::default();

    for slot in schema.media {
        let old: Vec<&MediaRef> = current.get(slot.name).map(MediaValue::refs).unwrap_or_default();
        let new = fresh.remove(slot.name);

        match slot.cardinality {
            MediaCardinality::Single => {
                if let Some(value) = new {
                    plan.superseded
                        .extend(old.iter().map(|media| media.external_ref.clone()));
                    plan.write.insert(slot.name, value);
                }
            }
            MediaCardinality::Many => {
                let added = match new {
                    Some(MediaValue::Many(items)) => items,
                    Some(MediaValue::One(item)) => vec![item],
                    None => Vec::new(),
                };

                let keep: Option<HashSet<&str>> = retained
                    .get(slot.name)
                    .map(|refs| refs.iter().map(String::as_str).collect());

                let kept: Vec<MediaRef> = match (&keep, added.is_empty()) {
                    (None, true) => continue,
                    (None, false) => Vec::new(),
                    (Some(keep), _) => old
                        .iter()
                        .filter(|media| keep.contains(media.external_ref.as_str()))
                        .map(|media| (*media).clone())
                        .collect(),
                };

                plan.superseded.extend(
                    old.iter()
                        .filter(|media| !kept.iter().any(|k| k.external_ref == media.external_ref))
                        .map(|media| media.external_ref.clone()),
                );

                let mut items = kept;
                items.extend(added);
                plan.write.insert(slot.name, MediaValue::Many(items));
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(tag: &str) -> MediaRef {
        MediaRef {
            url: format!("https://cdn.test/{tag}"),
            external_ref: tag.to_string(),
        }
    }

    fn venue_media(tags: &[&str]) -> ResourceMedia {
        let mut slots = ResourceMedia::new();
        slots.insert(
            "images",
            MediaValue::Many(tags.iter().map(|tag| media(tag)).collect()),
        );
        slots
    }

    #[test]
    fn single_slot_replacement_supersedes_old_ref() {
        let schema = ResourceKind::Carousel.schema();
        let mut current = ResourceMedia::new();
        current.insert("desktop_image", MediaValue::One(media("d1")));
        current.insert("mobile_image", MediaValue::One(media("m1")));

        let plan = plan_media_update(
            schema,
            &current,
            &BTreeMap::new(),
            vec![("mobile_image".to_string(), media("m2"))],
        );

        assert_eq!(plan.superseded, vec!["m1".to_string()]);
        assert_eq!(plan.write.get("mobile_image"), Some(&MediaValue::One(media("m2"))));
        assert!(plan.write.get("desktop_image").is_none());
    }

    #[test]
    fn many_slot_keeps_retained_and_appends_uploads() {
        let schema = ResourceKind::BanquetVenue.schema();
        let current = venue_media(&["a", "b", "c"]);
        let retained = BTreeMap::from([(
            "images".to_string(),
            vec!["c".to_string(), "a".to_string(), "unknown".to_string()],
        )]);

        let plan = plan_media_update(
            schema,
            &current,
            &retained,
            vec![("images".to_string(), media("d"))],
        );

        assert_eq!(plan.superseded, vec!["b".to_string()]);
        assert_eq!(
            plan.write.get("images"),
            Some(&MediaValue::Many(vec![media("a"), media("c"), media("d")]))
        );
    }

    #[test]
    fn many_slot_uploads_without_retained_list_replace_everything() {
        let schema = ResourceKind::BanquetVenue.schema();
        let plan = plan_media_update(
            schema,
            &venue_media(&["a", "b"]),
            &BTreeMap::new(),
            vec![("images".to_string(), media("z"))],
        );
        assert_eq!(plan.superseded, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(plan.write.get("images"), Some(&MediaValue::Many(vec![media("z")])));
    }

    #[test]
    fn untouched_many_slot_is_left_alone() {
        let schema = ResourceKind::BanquetVenue.schema();
        let plan = plan_media_update(schema, &venue_media(&["a"]), &BTreeMap::new(), Vec::new());
        assert!(plan.write.is_empty());
        assert!(plan.superseded.is_empty());
    }
}
