//! Pure presentation helpers over the poller snapshot and the catalog cache.
//! Everything here is deterministic in its inputs; no I/O, no shared state.

use std::convert::Infallible;
use std::str::FromStr;

use crate::api::{Download, ResourceDownload};
use crate::store::Resource;

/// Per-bucket resource-download counts. `active` is the display total of
/// `downloading + queue`, kept as the backend's web console defines it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub active: usize,
    pub downloading: usize,
    pub queue: usize,
    pub completed: usize,
    pub error: usize,
}

pub fn count_by_status(resource_downloads: &[ResourceDownload]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for r in resource_downloads {
        match r.status.as_str() {
            "downloading" => {
                counts.downloading += 1;
                counts.active += 1;
            }
            "" => {
                counts.queue += 1;
                counts.active += 1;
            }
            "completed" => counts.completed += 1,
            "error" => counts.error += 1,
            _ => {}
        }
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFilter {
    /// "none": everything passes.
    All,
    /// "active": downloading or queued.
    Active,
    /// "queue": empty status only.
    Queue,
    /// Any other literal is an exact status match.
    Exact(String),
}

impl FromStr for StatusFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "none" => StatusFilter::All,
            "active" => StatusFilter::Active,
            "queue" => StatusFilter::Queue,
            other => StatusFilter::Exact(other.to_string()),
        })
    }
}

impl StatusFilter {
    pub fn matches(&self, status: &str) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => status == "downloading" || status.is_empty(),
            StatusFilter::Queue => status.is_empty(),
            StatusFilter::Exact(wanted) => status == wanted,
        }
    }
}

/// Input order is preserved; `All` returns the list unmodified.
pub fn filter_by_status<'a>(
    resource_downloads: &'a [ResourceDownload],
    filter: &StatusFilter,
) -> Vec<&'a ResourceDownload> {
    resource_downloads
        .iter()
        .filter(|r| filter.matches(&r.status))
        .collect()
}

/// The file jobs belonging to one resource download; `resource_id` is the
/// only join key.
pub fn child_downloads<'a>(downloads: &'a [Download], resource_id: &str) -> Vec<&'a Download> {
    downloads
        .iter()
        .filter(|d| d.resource_id == resource_id)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceSortKey {
    #[default]
    Number,
    Title,
    Author,
    Time,
}

impl FromStr for ResourceSortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "number" => ResourceSortKey::Number,
            "title" => ResourceSortKey::Title,
            "author" => ResourceSortKey::Author,
            "time" => ResourceSortKey::Time,
            other => return Err(format!("unknown sort key: {other}")),
        })
    }
}

/// Stable ascending sort for catalog listings.
pub fn sort_resources(resources: &mut [Resource], key: ResourceSortKey) {
    resources.sort_by(|a, b| match key {
        ResourceSortKey::Number => a.number.cmp(&b.number),
        ResourceSortKey::Title => a.title.cmp(&b.title),
        ResourceSortKey::Author => a.author.cmp(&b.author),
        ResourceSortKey::Time => a.time.cmp(&b.time),
    });
}
