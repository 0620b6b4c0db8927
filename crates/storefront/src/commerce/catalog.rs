//! Catalog search client.
//!
//! Translates a structured search request into the platform's
//! query-string filter grammar. Dimensions combine with AND (each becomes
//! its own `filter` parameter); the author set combines with OR inside a
//! single parameter.

use async_trait::async_trait;
use bookstall_core::CategoryId;
use tracing::instrument;

use crate::commerce::http::CommerceHttp;
use crate::commerce::types::{Category, PagedQueryResult, ProductProjection};
use crate::commerce::CommerceError;

/// Default page size when a request does not set one.
pub const DEFAULT_LIMIT: u32 = 20;

/// Locale-qualified full-text search parameter.
const TEXT_PARAM: &str = "text.en";
/// Search field carrying the price in minor units.
const PRICE_FIELD: &str = "variants.price.centAmount";
/// Search field carrying the page-count attribute.
const PAGES_FIELD: &str = "variants.attributes.pages";
/// Search field carrying the author attribute.
const AUTHOR_FIELD: &str = "variants.attributes.author";

/// Sort keys accepted by the search endpoint. Only one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
}

impl SortKey {
    /// The `field direction` token the platform expects.
    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::NameAsc => "name.en asc",
            Self::NameDesc => "name.en desc",
            Self::PriceAsc => "price asc",
            Self::PriceDesc => "price desc",
        }
    }
}

/// An inclusive numeric range; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumericRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl NumericRange {
    /// Whether both bounds are open (no filter to emit).
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Render as the platform's range term, `*` marking an open bound.
    fn as_term(&self) -> String {
        let min = self.min.map_or_else(|| "*".to_string(), |v| v.to_string());
        let max = self.max.map_or_else(|| "*".to_string(), |v| v.to_string());
        format!("range ({min} to {max})")
    }
}

/// Escape a value for embedding in a quoted filter term.
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A structured catalog search request.
///
/// Price bounds are in major currency units (as entered in the filter
/// form); the builder converts them to the minor units the price field is
/// indexed in.
#[derive(Debug, Clone, Default)]
pub struct ProductSearchRequest {
    pub limit: Option<u32>,
    pub offset: u32,
    pub search_query: Option<String>,
    /// Enable fuzzy matching for the text query.
    pub fuzzy: bool,
    /// Edit-distance level for fuzzy matching (platform default when unset).
    pub fuzzy_level: Option<u8>,
    pub sort: Option<SortKey>,
    pub category_id: Option<CategoryId>,
    /// OR-combined author names.
    pub authors: Vec<String>,
    /// Page-count (publication attribute) bounds.
    pub page_range: Option<NumericRange>,
    /// Price bounds in major currency units.
    pub price_range: Option<NumericRange>,
}

impl ProductSearchRequest {
    /// Build the query parameters for the search endpoint.
    #[must_use]
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            (
                "limit".to_string(),
                self.limit.unwrap_or(DEFAULT_LIMIT).to_string(),
            ),
            ("offset".to_string(), self.offset.to_string()),
        ];

        if let Some(query) = self
            .search_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
        {
            params.push((TEXT_PARAM.to_string(), query.to_string()));
            if self.fuzzy {
                params.push(("fuzzy".to_string(), "true".to_string()));
                params.push((
                    "fuzzyLevel".to_string(),
                    self.fuzzy_level.unwrap_or(1).to_string(),
                ));
            }
        }

        if let Some(category_id) = &self.category_id {
            params.push((
                "filter".to_string(),
                format!("categories.id:\"{}\"", escape_filter_value(category_id.as_str())),
            ));
        }

        if let Some(range) = self.price_range.filter(|r| !r.is_unbounded()) {
            // The price field is indexed in minor units
            let minor = NumericRange {
                min: range.min.map(bookstall_core::money::major_to_minor),
                max: range.max.map(bookstall_core::money::major_to_minor),
            };
            params.push((
                "filter".to_string(),
                format!("{PRICE_FIELD}:{}", minor.as_term()),
            ));
        }

        if let Some(range) = self.page_range.filter(|r| !r.is_unbounded()) {
            params.push((
                "filter".to_string(),
                format!("{PAGES_FIELD}:{}", range.as_term()),
            ));
        }

        if !self.authors.is_empty() {
            let values = self
                .authors
                .iter()
                .map(|author| format!("\"{}\"", escape_filter_value(author)))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("filter".to_string(), format!("{AUTHOR_FIELD}:{values}")));
        }

        if let Some(sort) = self.sort {
            params.push(("sort".to_string(), sort.as_param().to_string()));
        }

        params
    }
}

/// Seam between the catalog orchestrator and the remote search endpoint.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Run a product search.
    async fn search(
        &self,
        request: &ProductSearchRequest,
    ) -> Result<PagedQueryResult<ProductProjection>, CommerceError>;

    /// Fetch the flat category list.
    async fn categories(&self) -> Result<Vec<Category>, CommerceError>;

    /// Fetch a single product by its localized slug.
    async fn product_by_slug(&self, slug: &str) -> Result<ProductProjection, CommerceError>;
}

/// Client for the catalog endpoints.
#[derive(Clone)]
pub struct CatalogClient {
    http: CommerceHttp,
}

impl CatalogClient {
    /// Create a new catalog client on shared HTTP plumbing.
    #[must_use]
    pub const fn new(http: CommerceHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    #[instrument(skip(self, request))]
    async fn search(
        &self,
        request: &ProductSearchRequest,
    ) -> Result<PagedQueryResult<ProductProjection>, CommerceError> {
        self.http
            .get_json("product-projections/search", &request.query_params())
            .await
    }

    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<Category>, CommerceError> {
        let params = vec![
            ("expand".to_string(), "parent".to_string()),
            ("sort".to_string(), "orderHint asc".to_string()),
            ("limit".to_string(), "500".to_string()),
        ];
        let page: PagedQueryResult<Category> = self.http.get_json("categories", &params).await?;
        Ok(page.results)
    }

    #[instrument(skip(self), fields(slug = %slug))]
    async fn product_by_slug(&self, slug: &str) -> Result<ProductProjection, CommerceError> {
        let params = vec![
            ("limit".to_string(), "1".to_string()),
            ("offset".to_string(), "0".to_string()),
            (
                "filter".to_string(),
                format!("slug.en:\"{}\"", escape_filter_value(slug)),
            ),
        ];
        let page: PagedQueryResult<ProductProjection> = self
            .http
            .get_json("product-projections/search", &params)
            .await?;
        page.results
            .into_iter()
            .next()
            .ok_or_else(|| CommerceError::NotFound(format!("product with slug {slug}")))
    }
}
