//! Collection envelope for list endpoints

use axum::http::Uri;
use serde::Serialize;

use crate::models::Page;

/// A projection that can be placed in a collection.
///
/// Projections of filterable entities override [`Resource::filters`] to
/// advertise the attribute names accepted as list filters.
pub trait Resource: Serialize {
    fn filters(&self) -> Option<&'static [&'static str]> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub first: String,
    pub last: String,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub current: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub per_page: u32,
    pub current_page: u32,
    pub last_page: u32,
    pub from: Option<u64>,
    pub to: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatedCollection<R> {
    pub items: Vec<R>,
    pub links: PageLinks,
    pub meta: PageMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<&'static str>>,
}

/// Either a page with links and metadata, or a bare list
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResourceCollection<R> {
    Paginated(PaginatedCollection<R>),
    Plain(Vec<R>),
}

impl<R: Resource> ResourceCollection<R> {
    pub fn paginate(page: Page<R>, base: &LinkBase) -> Self {
        let links = PageLinks {
            first: base.page_url(1),
            last: base.page_url(page.last_page()),
            prev: (page.current_page > 1).then(|| base.page_url(page.current_page - 1)),
            next: page.has_more_pages().then(|| base.page_url(page.current_page + 1)),
            current: page.current_page,
        };
        let meta = PageMeta {
            total: page.total,
            per_page: page.per_page,
            current_page: page.current_page,
            last_page: page.last_page(),
            from: page.from(),
            to: page.to(),
        };
        let filters = page
            .items
            .first()
            .and_then(Resource::filters)
            .map(|names| names.to_vec());

        ResourceCollection::Paginated(PaginatedCollection {
            items: page.items,
            links,
            meta,
            filters,
        })
    }

    /// Unpaginated form, serialized as a bare array. The book routes always
    /// paginate; this serves resources listed without paging.
    pub fn plain(items: Vec<R>) -> Self {
        ResourceCollection::Plain(items)
    }
}

/// Request path and query used to build page URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBase {
    path: String,
    params: Vec<String>,
}

impl LinkBase {
    /// Keep every query pair except `page`, which each link sets itself
    pub fn from_uri(base_url: Option<&str>, uri: &Uri) -> Self {
        let path = match base_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), uri.path()),
            None => uri.path().to_string(),
        };
        let params = uri
            .query()
            .map(|query| {
                query
                    .split('&')
                    .filter(|pair| !pair.is_empty())
                    .filter(|pair| pair.split('=').next() != Some("page"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self { path, params }
    }

    pub fn page_url(&self, page: u32) -> String {
        let mut pairs = self.params.clone();
        pairs.push(format!("page={}", page));
        format!("{}?{}", self.path, pairs.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageRequest;
    use serde_json::json;

    #[derive(Serialize)]
    struct Plain {
        id: u32,
    }

    impl Resource for Plain {}

    #[derive(Serialize)]
    struct Filterable {
        id: u32,
    }

    impl Resource for Filterable {
        fn filters(&self) -> Option<&'static [&'static str]> {
            Some(&["title"])
        }
    }

    fn base() -> LinkBase {
        LinkBase::from_uri(None, &"/api/books?title=Book&page=2".parse().unwrap())
    }

    #[test]
    fn test_link_base_replaces_page() {
        assert_eq!(base().page_url(3), "/api/books?title=Book&page=3");
        let absolute = LinkBase::from_uri(Some("https://books.example.org/"), &"/api/books".parse().unwrap());
        assert_eq!(absolute.page_url(1), "https://books.example.org/api/books?page=1");
    }

    #[test]
    fn test_paginated_shape() {
        // 25 records, 10 per page, page 2
        let items = (11..=20).map(|id| Plain { id }).collect();
        let page = Page::new(items, 25, PageRequest::new(Some(2), 10));
        let value = serde_json::to_value(ResourceCollection::paginate(page, &base())).unwrap();

        assert_eq!(
            value["links"],
            json!({
                "first": "/api/books?title=Book&page=1",
                "last": "/api/books?title=Book&page=3",
                "prev": "/api/books?title=Book&page=1",
                "next": "/api/books?title=Book&page=3",
                "current": 2
            })
        );
        assert_eq!(
            value["meta"],
            json!({"total": 25, "per_page": 10, "current_page": 2, "last_page": 3, "from": 11, "to": 20})
        );
        assert_eq!(value["items"].as_array().map(Vec::len), Some(10));
        assert!(value.get("filters").is_none());
    }

    #[test]
    fn test_filters_from_first_item() {
        let page = Page::new(vec![Filterable { id: 1 }], 1, PageRequest::default());
        let value = serde_json::to_value(ResourceCollection::paginate(page, &base())).unwrap();
        assert_eq!(value["filters"], json!(["title"]));
        assert_eq!(value["links"]["prev"], json!(null));
        assert_eq!(value["links"]["next"], json!(null));
    }

    #[test]
    fn test_empty_page_has_no_filters() {
        let page: Page<Filterable> = Page::new(vec![], 0, PageRequest::default());
        let value = serde_json::to_value(ResourceCollection::paginate(page, &base())).unwrap();
        assert!(value.get("filters").is_none());
        assert_eq!(value["meta"]["from"], json!(null));
    }

    #[test]
    fn test_plain_collection_is_array() {
        let value = serde_json::to_value(ResourceCollection::plain(vec![Plain { id: 1 }])).unwrap();
        assert_eq!(value, json!([{"id": 1}]));
    }
}
