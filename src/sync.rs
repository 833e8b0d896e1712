use tracing::info;

use crate::api::ApiClient;
use crate::error::ConsoleError;
use crate::store::{MetadataStore, Resource};

/// Fetches the authoritative catalog for `site` and replaces that site's
/// slice of the local store in one transaction. Fails as a unit: on any
/// network, decode or store error the local data is left exactly as it was.
/// Returns the number of cached rows.
pub fn sync_site(
    api: &dyn ApiClient,
    store: &MetadataStore,
    site: &str,
) -> Result<usize, ConsoleError> {
    let results = api.fetch_site_resources(site)?;
    let rows: Vec<Resource> = results
        .into_iter()
        .map(|r| Resource {
            id: None,
            site: site.to_string(),
            title: r.title,
            number: r.number,
            author: r.author,
            tags: r.tags,
            resource_id: r.id,
            time: r.time,
        })
        .collect();
    store.replace_site_resources(site, &rows)?;
    info!(site, count = rows.len(), "synced site catalog");
    Ok(rows.len())
}
