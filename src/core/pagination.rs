use serde::{Deserialize, Serialize};

/// One button of the page selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageItem {
    Page(u32),
    Ellipsis(Gap),
}

/// Serialized as `"..."`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gap {
    #[serde(rename = "...")]
    Gap,
}

impl PageItem {
    pub const ELLIPSIS: PageItem = PageItem::Ellipsis(Gap::Gap);

    pub fn page(&self) -> Option<u32> {
        match self {
            PageItem::Page(p) => Some(*p),
            PageItem::Ellipsis(_) => None,
        }
    }
}

/// Pages needed for `total` items
pub fn total_pages(total: usize, page_size: usize) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size) as u32
}

/// Compact page selector: first page, a window of two pages either side of the
/// current one, last page, with ellipsis markers over the gaps.
pub fn page_range(current_page: u32, total_pages: u32) -> Vec<PageItem> {
    if total_pages == 0 {
        return Vec::new();
    }

    let current = current_page.clamp(1, total_pages);
    let mut items = vec![PageItem::Page(1)];
    if total_pages == 1 {
        return items;
    }

    let start = current.saturating_sub(2).max(2);
    let end = (current + 2).min(total_pages - 1);

    if start > 2 {
        items.push(PageItem::ELLIPSIS);
    }
    items.extend((start..=end).map(PageItem::Page));
    if end < total_pages - 1 {
        items.push(PageItem::ELLIPSIS);
    }
    items.push(PageItem::Page(total_pages));

    items
}
