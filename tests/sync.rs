use assert_matches::assert_matches;
use serde_json::json;

use resource_console::api::{ApiClient, Basic, Download, ResourceDownload, SiteResource};
use resource_console::error::ConsoleError;
use resource_console::store::MetadataStore;
use resource_console::sync::sync_site;

/// Serves a fixed catalog per site; unknown sites fail like a backend error.
struct CatalogApi;

impl ApiClient for CatalogApi {
    fn fetch_basic(&self) -> Result<Basic, ConsoleError> {
        Ok(Basic {
            clients: vec!["local".to_string()],
            sites: vec!["siteA".to_string(), "siteB".to_string()],
        })
    }

    fn fetch_downloads(&self) -> Result<Vec<Download>, ConsoleError> {
        Ok(Vec::new())
    }

    fn fetch_resource_downloads(&self) -> Result<Vec<ResourceDownload>, ConsoleError> {
        Ok(Vec::new())
    }

    fn fetch_site_resources(&self, site: &str) -> Result<Vec<SiteResource>, ConsoleError> {
        match site {
            "siteA" => Ok(serde_json::from_value(json!([
                {"id": "A1", "title": "first", "number": "N1", "author": "x",
                 "tags": ["voice"], "size": 100, "time": 1700000000},
                {"id": "A2", "title": "second", "number": "N2", "author": "y",
                 "tags": [], "size": 200},
            ]))
            .unwrap()),
            "siteB" => Ok(serde_json::from_value(json!([
                {"id": "B1", "title": "other", "number": "N9", "author": "z",
                 "tags": ["drama"], "size": 300, "time": 1700000300},
            ]))
            .unwrap()),
            _ => Err(ConsoleError::Status {
                status: 500,
                message: "failed to create site".to_string(),
            }),
        }
    }
}

#[test]
fn sync_caches_one_site() {
    let store = MetadataStore::open_in_memory().unwrap();
    let count = sync_site(&CatalogApi, &store, "siteA").unwrap();
    assert_eq!(count, 2);

    let rows = store.site_resources("siteA").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].resource_id, "A1");
    assert_eq!(rows[0].site, "siteA");
    assert_eq!(rows[0].time, 1_700_000_000);
    // Backend omitted `time` for the second entry.
    assert_eq!(rows[1].time, 0);
}

#[test]
fn sync_does_not_touch_other_sites() {
    let store = MetadataStore::open_in_memory().unwrap();
    sync_site(&CatalogApi, &store, "siteA").unwrap();
    sync_site(&CatalogApi, &store, "siteB").unwrap();

    // A re-sync of siteA leaves siteB's slice alone.
    sync_site(&CatalogApi, &store, "siteA").unwrap();
    let site_b = store.site_resources("siteB").unwrap();
    assert_eq!(site_b.len(), 1);
    assert_eq!(site_b[0].resource_id, "B1");
}

#[test]
fn failed_fetch_leaves_store_untouched() {
    let store = MetadataStore::open_in_memory().unwrap();
    sync_site(&CatalogApi, &store, "siteA").unwrap();
    let before = store.all_resources().unwrap();

    let result = sync_site(&CatalogApi, &store, "unknown");
    assert_matches!(result, Err(ConsoleError::Status { status: 500, .. }));
    assert_eq!(store.all_resources().unwrap(), before);
}
