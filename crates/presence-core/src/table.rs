// ── Sorting & pagination for the device table ──

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use presence_api::types::Device;

use crate::filter::{DeviceFilter, FacetOptions, Summary, natural_cmp};

pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Page-number widgets list every page up to this count.
const COMPACT_PAGE_LIMIT: usize = 7;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortColumn {
    #[default]
    Name,
    Mac,
    Vendor,
    LastIp,
    LastSeen,
    Status,
    Online,
}

impl SortColumn {
    pub fn compare(self, a: &Device, b: &Device) -> Ordering {
        match self {
            Self::Name => natural_cmp(&a.name, &b.name),
            Self::Mac => natural_cmp(&a.mac, &b.mac),
            Self::Vendor => natural_cmp(&a.vendor, &b.vendor),
            Self::LastIp => natural_cmp(
                a.last_ip.as_deref().unwrap_or_default(),
                b.last_ip.as_deref().unwrap_or_default(),
            ),
            // Missing timestamps sort as the empty string, i.e. first.
            Self::LastSeen => a.last_seen_at.cmp(&b.last_seen_at),
            Self::Status => a.status.to_string().cmp(&b.status.to_string()),
            Self::Online => a.online.cmp(&b.online),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Stable in-place sort.
pub fn sort_devices(devices: &mut [Arc<Device>], column: SortColumn, direction: SortDirection) {
    devices.sort_by(|a, b| {
        let ord = column.compare(a, b);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

// ── Pagination ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    /// Always at least one page, even for an empty list.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size.max(1)).max(1)
    }

    pub fn clamp(&mut self, total: usize) {
        self.page_index = self.page_index.min(self.page_count(total) - 1);
    }

    pub fn next(&mut self, total: usize) {
        self.page_index = (self.page_index + 1).min(self.page_count(total) - 1);
    }

    pub fn prev(&mut self) {
        self.page_index = self.page_index.saturating_sub(1);
    }

    pub fn range(&self, total: usize) -> std::ops::Range<usize> {
        let size = self.page_size.max(1);
        let start = (self.page_index * size).min(total);
        start..(start + size).min(total)
    }
}

/// One entry in a page-number strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

/// Page strip around `page_index`: first, last, and neighbours, with
/// ellipses over gaps.
pub fn page_items(page_index: usize, page_count: usize) -> Vec<PageItem> {
    if page_count <= COMPACT_PAGE_LIMIT {
        return (0..page_count).map(PageItem::Page).collect();
    }

    let mut pages: Vec<usize> = [
        Some(0),
        Some(page_count - 1),
        page_index.checked_sub(1),
        Some(page_index),
        Some(page_index + 1),
    ]
    .into_iter()
    .flatten()
    .filter(|p| *p < page_count)
    .collect();
    pages.sort_unstable();
    pages.dedup();

    let mut items = Vec::with_capacity(pages.len() * 2);
    for (i, page) in pages.iter().enumerate() {
        if i > 0 && page - pages[i - 1] > 1 {
            items.push(PageItem::Ellipsis);
        }
        items.push(PageItem::Page(*page));
    }
    items
}

// ── Full pipeline ────────────────────────────────────────────────────

/// Result of filtering, sorting, and paging a device collection.
#[derive(Debug, Clone, Default)]
pub struct DeviceListView {
    pub filtered: Vec<Arc<Device>>,
    pub facets: FacetOptions,
    pub summary: Summary,
    pub page: Pagination,
}

impl DeviceListView {
    pub fn build(
        devices: &[Arc<Device>],
        filter: &DeviceFilter,
        sort: Option<(SortColumn, SortDirection)>,
        mut page: Pagination,
    ) -> Self {
        let mut filtered = filter.apply(devices);
        if let Some((column, direction)) = sort {
            sort_devices(&mut filtered, column, direction);
        }
        page.clamp(filtered.len());
        Self {
            facets: FacetOptions::from_devices(devices),
            summary: Summary::from_devices(devices.iter().map(|d| &**d)),
            filtered,
            page,
        }
    }

    pub fn page_rows(&self) -> &[Arc<Device>] {
        &self.filtered[self.page.range(self.filtered.len())]
    }

    pub fn page_count(&self) -> usize {
        self.page.page_count(self.filtered.len())
    }

    pub fn page_items(&self) -> Vec<PageItem> {
        page_items(self.page.page_index, self.page_count())
    }
}
