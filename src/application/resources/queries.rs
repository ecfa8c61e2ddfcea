use serde_json::Value;
use uuid::Uuid;

use crate::application::pagination::{PageRequest, Paginated};
use crate::application::repos::ResourceQueryFilter;
use crate::cache::generate_key;
use crate::domain::entities::{ResourceRecord, ResourceStats};
use crate::domain::resources::ResourceKind;

use super::service::ResourceService;
use super::types::{ListQuery, ResourceError};

impl ResourceService {
    pub async fn list(
        &self,
        kind: ResourceKind,
        query: &ListQuery,
    ) -> Result<Paginated<ResourceRecord>, ResourceError> {
        let schema = kind.schema();
        let page = PageRequest::new(query.page, query.limit)?;

        let mut filter = ResourceQueryFilter {
            active: query.active,
            fields: Vec::with_capacity(query.filters.len()),
        };
        for (name, raw) in &query.filters {
            let parsed = schema
                .parse_filter(name, raw)
                .map_err(ResourceError::InvalidInput)?;
            filter.fields.push(parsed);
        }

        let key = list_key(kind, &filter, page);
        if let Some(hit) = self.cached::<Paginated<ResourceRecord>>(&key) {
            return Ok(hit);
        }

        let (items, total) = tokio::try_join!(
            self.reader.list_resources(kind, &filter, page),
            self.reader.count_resources(kind, &filter)
        )?;

        let result = Paginated::new(items, page, total);
        self.remember(kind, key, &result);
        Ok(result)
    }

    pub async fn get(&self, kind: ResourceKind, id: Uuid) -> Result<ResourceRecord, ResourceError> {
        let key = item_key(kind, id);
        if let Some(hit) = self.cached::<ResourceRecord>(&key) {
            return Ok(hit);
        }

        let record = self
            .reader
            .find_by_id(kind, id)
            .await
            .map_err(ResourceError::for_id(kind, id))?
            .ok_or(ResourceError::NotFound { kind, id })?;

        self.remember(kind, key, &record);
        Ok(record)
    }

    /// Counts for kinds that expose a stats route. Cached under the kind's namespace.
    pub async fn stats(&self, kind: ResourceKind) -> Result<ResourceStats, ResourceError> {
        let group_by = kind.stats_groups();
        if group_by.is_empty() {
            return Err(ResourceError::invalid_input(format!(
                "{kind} does not publish statistics"
            )));
        }

        let key = format!("{}:stats", kind.cache_namespace());
        if let Some(hit) = self.cached::<ResourceStats>(&key) {
            return Ok(hit);
        }

        let stats = self.reader.resource_stats(kind, group_by).await?;
        self.remember(kind, key, &stats);
        Ok(stats)
    }
}

fn list_key(kind: ResourceKind, filter: &ResourceQueryFilter, page: PageRequest) -> String {
    let mut params = vec![
        ("page".to_string(), Some(page.page.to_string())),
        ("limit".to_string(), Some(page.limit.to_string())),
        ("active".to_string(), filter.active.map(|active| active.to_string())),
    ];
    params.extend(filter.fields.iter().map(|field| {
        let value = match &field.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        (field.field.to_string(), Some(value))
    }));
    generate_key(&format!("{}:items", kind.cache_namespace()), params)
}

fn item_key(kind: ResourceKind, id: Uuid) -> String {
    generate_key(
        &format!("{}:item", kind.cache_namespace()),
        [("id", Some(id.to_string()))],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_keys_live_under_the_kind_namespace() {
        let schema = ResourceKind::Award.schema();
        let filter = ResourceQueryFilter {
            active: Some(true),
            fields: vec![schema.parse_filter("year", "2024").unwrap()],
        };
        let key = list_key(ResourceKind::Award, &filter, PageRequest::default());
        assert_eq!(key, "awards:items:active:true|limit:12|page:1|year:2024");
    }

    #[test]
    fn unfiltered_list_key_omits_active() {
        let key = list_key(
            ResourceKind::Carousel,
            &ResourceQueryFilter::default(),
            PageRequest::default(),
        );
        assert_eq!(key, "carousel:items:limit:12|page:1");
    }
}
