use serde_json::json;

use resource_console::api::{Download, ResourceDownload};
use resource_console::store::Resource;
use resource_console::view::{
    ResourceSortKey, StatusCounts, StatusFilter, child_downloads, count_by_status,
    filter_by_status, sort_resources,
};

fn resource_download(id: i64, resource_id: &str, status: &str) -> ResourceDownload {
    serde_json::from_value(json!({
        "id": id, "resource_id": resource_id, "status": status,
    }))
    .unwrap()
}

fn download(id: i64, resource_id: &str) -> Download {
    serde_json::from_value(json!({
        "id": id, "resource_id": resource_id,
    }))
    .unwrap()
}

fn fixture() -> Vec<ResourceDownload> {
    vec![
        resource_download(1, "R1", "downloading"),
        resource_download(2, "R2", ""),
        resource_download(3, "R3", "completed"),
        resource_download(4, "R4", "error"),
        resource_download(5, "R5", "downloading"),
    ]
}

#[test]
fn counts_over_mixed_statuses() {
    let counts = count_by_status(&fixture());
    assert_eq!(
        counts,
        StatusCounts {
            active: 3,
            downloading: 2,
            queue: 1,
            completed: 1,
            error: 1,
        }
    );
}

#[test]
fn counts_over_empty_list() {
    assert_eq!(count_by_status(&[]), StatusCounts::default());
}

#[test]
fn queue_filter_matches_empty_status_only() {
    let list = fixture();
    let queued = filter_by_status(&list, &"queue".parse().unwrap());
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].resource_id, "R2");
}

#[test]
fn none_filter_returns_all_in_order() {
    let list = fixture();
    let all = filter_by_status(&list, &"none".parse().unwrap());
    let ids: Vec<_> = all.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn active_filter_takes_downloading_and_queued() {
    let list = fixture();
    let active = filter_by_status(&list, &StatusFilter::Active);
    let ids: Vec<_> = active.iter().map(|r| r.resource_id.as_str()).collect();
    assert_eq!(ids, vec!["R1", "R2", "R5"]);
}

#[test]
fn literal_filter_is_exact() {
    let list = fixture();
    let errored = filter_by_status(&list, &"error".parse().unwrap());
    assert_eq!(errored.len(), 1);
    assert_eq!(errored[0].resource_id, "R4");
}

#[test]
fn child_downloads_join_on_resource_id_only() {
    let downloads = vec![
        download(1, "R1"),
        download(2, "R2"),
        download(3, "R1"),
        download(4, "R3"),
    ];
    let children = child_downloads(&downloads, "R1");
    let ids: Vec<_> = children.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![1, 3]);

    assert!(child_downloads(&downloads, "R9").is_empty());
}

#[test]
fn sort_resources_is_stable_per_key() {
    let mk = |number: &str, title: &str, time: i64| Resource {
        id: None,
        site: "siteA".to_string(),
        title: title.to_string(),
        number: number.to_string(),
        author: String::new(),
        tags: Vec::new(),
        resource_id: number.to_string(),
        time,
    };
    let mut resources = vec![mk("N2", "bbb", 30), mk("N1", "ccc", 10), mk("N3", "aaa", 20)];

    sort_resources(&mut resources, ResourceSortKey::Number);
    let numbers: Vec<_> = resources.iter().map(|r| r.number.as_str()).collect();
    assert_eq!(numbers, vec!["N1", "N2", "N3"]);

    sort_resources(&mut resources, ResourceSortKey::Title);
    let titles: Vec<_> = resources.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["aaa", "bbb", "ccc"]);

    sort_resources(&mut resources, ResourceSortKey::Time);
    let times: Vec<_> = resources.iter().map(|r| r.time).collect();
    assert_eq!(times, vec![10, 20, 30]);
}
