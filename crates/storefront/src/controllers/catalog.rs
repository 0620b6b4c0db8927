//! Catalog orchestrator.
//!
//! Owns the shop page state: the current search intent (query, sort,
//! filters, category, page), the product page it produced, and the
//! category tree for navigation. Every intent change refetches from the
//! platform; results are never filtered or sorted locally.

use std::collections::HashMap;

use bookstall_core::CategoryId;
use tracing::{debug, warn};

use crate::commerce::types::{Category, PagedQueryResult, ProductProjection};
use crate::commerce::{CommerceError, NumericRange, ProductSearchRequest, SortKey};
use crate::controllers::Notice;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Products per shop page.
pub const PAGE_SIZE: u32 = 50;

/// Lifecycle of the product listing.
///
/// `Refetching` keeps the previous page visible while a replacement is in
/// flight; `Error` is only reached when there is nothing to show at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Loading,
    Ready,
    Refetching,
    Error,
}

/// Everything that parameterizes the current listing.
#[derive(Debug, Clone, Default)]
pub struct SearchIntent {
    pub query: String,
    pub fuzzy: bool,
    pub sort: SortKey,
    pub category: Option<CategoryId>,
    pub authors: Vec<String>,
    pub page_range: Option<NumericRange>,
    pub price_range: Option<NumericRange>,
    /// Zero-based page index.
    pub page: u32,
}

impl SearchIntent {
    fn to_request(&self) -> ProductSearchRequest {
        ProductSearchRequest {
            limit: Some(PAGE_SIZE),
            offset: self.page * PAGE_SIZE,
            search_query: (!self.query.trim().is_empty()).then(|| self.query.clone()),
            fuzzy: self.fuzzy,
            fuzzy_level: None,
            sort: Some(self.sort),
            category_id: self.category.clone(),
            authors: self.authors.clone(),
            page_range: self.page_range,
            price_range: self.price_range,
        }
    }
}

/// A category with its resolved children.
#[derive(Debug, Clone)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub label: String,
    pub children: Vec<CategoryNode>,
}

/// Build the category forest from the platform's flat list.
///
/// Categories whose parent is absent from the list are treated as roots,
/// so a partially-fetched tree still renders.
#[must_use]
pub fn build_category_tree(categories: &[Category]) -> Vec<CategoryNode> {
    let mut children_of: HashMap<&CategoryId, Vec<&Category>> = HashMap::new();
    let known: HashMap<&CategoryId, &Category> =
        categories.iter().map(|c| (&c.id, c)).collect();

    let mut roots: Vec<&Category> = Vec::new();
    for category in categories {
        match category.parent.as_ref().filter(|p| known.contains_key(&p.id)) {
            Some(parent) => children_of.entry(&parent.id).or_default().push(category),
            None => roots.push(category),
        }
    }

    fn build(category: &Category, children_of: &HashMap<&CategoryId, Vec<&Category>>) -> CategoryNode {
        CategoryNode {
            id: category.id.clone(),
            label: category.name.for_store().to_string(),
            children: children_of
                .get(&category.id)
                .map(|children| children.iter().map(|c| build(c, children_of)).collect())
                .unwrap_or_default(),
        }
    }

    roots.into_iter().map(|c| build(c, &children_of)).collect()
}

/// One crumb in the category breadcrumb. `category` is `None` for the
/// synthetic all-books root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub category: Option<CategoryId>,
    pub label: String,
}

/// Label of the synthetic breadcrumb root.
const ALL_BOOKS: &str = "All books";

/// The shop page state machine.
pub struct CatalogController {
    state: AppState,
    phase: Phase,
    intent: SearchIntent,
    products: Option<PagedQueryResult<ProductProjection>>,
    categories: Vec<Category>,
    notice: Option<Notice>,
}

impl CatalogController {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            phase: Phase::Loading,
            intent: SearchIntent::default(),
            products: None,
            categories: Vec::new(),
            notice: None,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn intent(&self) -> &SearchIntent {
        &self.intent
    }

    /// The current product page, when one has loaded.
    #[must_use]
    pub const fn products(&self) -> Option<&PagedQueryResult<ProductProjection>> {
        self.products.as_ref()
    }

    /// The category forest for navigation.
    #[must_use]
    pub fn category_tree(&self) -> Vec<CategoryNode> {
        build_category_tree(&self.categories)
    }

    /// Take the pending notice, clearing it.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Number of pages for the current result set, when the platform
    /// reported a total.
    #[must_use]
    pub fn total_pages(&self) -> Option<u64> {
        let total = self.products.as_ref()?.total?;
        Some(total.div_ceil(u64::from(PAGE_SIZE)))
    }

    /// Breadcrumb from the synthetic root down to the selected category.
    #[must_use]
    pub fn breadcrumb(&self) -> Vec<Breadcrumb> {
        let mut crumbs = vec![Breadcrumb {
            category: None,
            label: ALL_BOOKS.to_string(),
        }];
        let Some(selected) = &self.intent.category else {
            return crumbs;
        };

        let by_id: HashMap<&CategoryId, &Category> =
            self.categories.iter().map(|c| (&c.id, c)).collect();

        // Walk the parent chain upward, then reverse into root-first order
        let mut chain = Vec::new();
        let mut cursor = by_id.get(selected).copied();
        while let Some(category) = cursor {
            chain.push(Breadcrumb {
                category: Some(category.id.clone()),
                label: category.name.for_store().to_string(),
            });
            cursor = category
                .parent
                .as_ref()
                .and_then(|p| by_id.get(&p.id).copied());
        }
        chain.reverse();
        crumbs.extend(chain);
        crumbs
    }

    /// Initial load: categories plus the default listing.
    pub async fn load(&mut self) {
        let result = self.state.catalog().categories().await;
        match result {
            Ok(categories) => self.categories = categories,
            Err(e) => {
                warn!(error = %e, "Failed to load categories");
                self.notice = Some(Notice::error("Could not load categories"));
            }
        }
        self.refetch().await;
    }

    /// Select a category (or clear the selection) and refetch page 0.
    pub async fn select_category(&mut self, category: Option<CategoryId>) {
        self.intent.category = category;
        self.intent.page = 0;
        self.refetch().await;
    }

    /// Change the sort order and refetch page 0.
    pub async fn set_sort(&mut self, sort: SortKey) {
        self.intent.sort = sort;
        self.intent.page = 0;
        self.refetch().await;
    }

    /// Apply the filter panel and refetch page 0.
    pub async fn apply_filters(
        &mut self,
        authors: Vec<String>,
        page_range: Option<NumericRange>,
        price_range: Option<NumericRange>,
    ) {
        self.intent.authors = authors;
        self.intent.page_range = page_range;
        self.intent.price_range = price_range;
        self.intent.page = 0;
        self.refetch().await;
    }

    /// Run a text search and refetch page 0.
    pub async fn submit_search(&mut self, query: String, fuzzy: bool) {
        self.intent.query = query;
        self.intent.fuzzy = fuzzy;
        self.intent.page = 0;
        self.refetch().await;
    }

    /// Jump to a page of the current result set.
    pub async fn set_page(&mut self, page: u32) {
        self.intent.page = page;
        self.refetch().await;
    }

    /// Fetch a product detail page by its slug.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when no product carries the slug.
    pub async fn product_by_slug(&self, slug: &str) -> Result<ProductProjection> {
        match self.state.catalog().product_by_slug(slug).await {
            Ok(product) => Ok(product),
            Err(CommerceError::NotFound(_)) => {
                Err(AppError::NotFound(format!("product {slug}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop every refinement and show the default listing.
    pub async fn reset(&mut self) {
        self.intent = SearchIntent::default();
        self.refetch().await;
    }

    async fn refetch(&mut self) {
        self.phase = if self.products.is_some() {
            Phase::Refetching
        } else {
            Phase::Loading
        };

        let result = self.state.catalog().search(&self.intent.to_request()).await;
        match result {
            Ok(page) => {
                debug!(count = page.count, "Listing loaded");
                self.products = Some(page);
                self.phase = Phase::Ready;
            }
            Err(e) => {
                warn!(error = %e, "Search failed");
                self.notice = Some(Notice::error("Could not load products"));
                // Keep showing what the user already has
                self.phase = if self.products.is_some() {
                    Phase::Ready
                } else {
                    Phase::Error
                };
            }
        }
    }
}
