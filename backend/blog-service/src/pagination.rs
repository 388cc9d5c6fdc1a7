//! Page-number pagination for list views.
//!
//! A requested page never fails: unparsable input falls back to the first
//! page and out-of-range numbers clamp to the nearest valid page. An empty
//! collection still has one (empty) page.

use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

/// `?page=` query parameter shared by every list route.
///
/// Extraction never fails: the first `page` pair wins, other parameters
/// are ignored and an unreadable query string means no page was asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn from_query_string(query: &str) -> Self {
        let pairs = web::Query::<Vec<(String, String)>>::from_query(query)
            .map(web::Query::into_inner)
            .unwrap_or_default();
        Self {
            page: pairs
                .into_iter()
                .find(|(key, _)| key == "page")
                .map(|(_, value)| value),
        }
    }

    pub fn requested(&self) -> Option<&str> {
        self.page.as_deref()
    }

    /// Canonical form of the request before the item count is known:
    /// `last`, or a page number of at least 1. Equal keys render equal pages.
    pub fn normalized(&self) -> String {
        let Some(raw) = self.requested().map(str::trim) else {
            return "1".to_string();
        };
        if raw.eq_ignore_ascii_case("last") {
            return "last".to_string();
        }
        match raw.parse::<i64>() {
            Ok(n) if n > 1 => n.to_string(),
            _ => "1".to_string(),
        }
    }
}

impl FromRequest for PageQuery {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(Self::from_query_string(req.query_string())))
    }
}

/// Splits `count` ordered items into pages of `per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

/// Offset/limit of one page, ready for a repository query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub offset: usize,
    pub limit: usize,
}

impl Paginator {
    pub fn new(count: usize, per_page: usize) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn num_pages(&self) -> usize {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    /// Resolve a raw `page` value to a valid 1-based page number.
    pub fn resolve(&self, requested: Option<&str>) -> usize {
        let last = self.num_pages();
        let Some(raw) = requested.map(str::trim) else {
            return 1;
        };
        if raw.eq_ignore_ascii_case("last") {
            return last;
        }
        match raw.parse::<i64>() {
            Ok(n) if n < 1 => 1,
            Ok(n) => (n as u64).min(last as u64) as usize,
            Err(_) => 1,
        }
    }

    pub fn window(&self, requested: Option<&str>) -> PageWindow {
        let number = self.resolve(requested);
        let offset = (number - 1) * self.per_page;
        PageWindow {
            number,
            offset,
            limit: self.per_page.min(self.count.saturating_sub(offset)),
        }
    }

    /// Wrap the items fetched for `window` with page metadata.
    pub fn page<T>(&self, window: PageWindow, object_list: Vec<T>) -> Page<T> {
        let num_pages = self.num_pages();
        let number = window.number;
        let has_next = number < num_pages;
        let has_previous = number > 1;
        let (start_index, end_index) = if self.count == 0 {
            (0, 0)
        } else {
            (window.offset + 1, window.offset + object_list.len())
        };

        Page {
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(number + 1),
            previous_page_number: has_previous.then_some(number - 1),
            start_index,
            end_index,
            object_list,
        }
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub per_page: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<usize>,
    pub previous_page_number: Option<usize>,
    /// 1-based index of the first item on this page (0 when empty)
    pub start_index: usize,
    pub end_index: usize,
    pub object_list: Vec<T>,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }
}

/// Paginate an already materialized, ordered collection.
pub fn paginate<T: Clone>(items: &[T], requested: Option<&str>, per_page: usize) -> Page<T> {
    let paginator = Paginator::new(items.len(), per_page);
    let window = paginator.window(requested);
    let slice = items[window.offset..window.offset + window.limit].to_vec();
    paginator.page(window, slice)
}
