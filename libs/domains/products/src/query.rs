//! Listing query: filter, then sort, then skip, then limit.
//!
//! [`ProductQuery::from_params`] turns raw query-string values into a
//! typed query. Unusable values fall back to their defaults instead of
//! failing the request.

use mongodb::bson::{doc, Document};
use serde::Deserialize;
use std::cmp::Ordering;
use std::str::FromStr;
use strum::EnumString;
use utoipa::IntoParams;

use crate::models::Product;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// Raw listing parameters as they arrive in the query string
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Exact category match
    pub category: Option<String>,
    /// Inclusive lower price bound; ignored unless numeric
    pub min_price: Option<String>,
    /// Inclusive upper price bound; ignored unless numeric
    pub max_price: Option<String>,
    /// `price_asc` or `price_desc`; anything else keeps store order
    pub sort_by: Option<String>,
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Page size (default 10)
    pub limit: Option<String>,
}

/// Collects raw query-string pairs. The first occurrence of a repeated
/// key wins and unknown keys are ignored.
impl FromIterator<(String, String)> for ListParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "category" => &mut params.category,
                "minPrice" => &mut params.min_price,
                "maxPrice" => &mut params.max_price,
                "sortBy" => &mut params.sort_by,
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SortOrder {
    /// Insertion order (ascending `_id`)
    #[default]
    #[strum(disabled)]
    Natural,
    PriceAsc,
    PriceDesc,
}

/// Inclusive price bounds. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min.is_none_or(|min| price >= min) && self.max.is_none_or(|max| price <= max)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub price: PriceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based
    pub number: u64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// A fully resolved listing query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: SortOrder,
    pub page: Page,
}

impl ProductQuery {
    pub fn from_params(params: &ListParams) -> Self {
        let filter = ProductFilter {
            category: params
                .category
                .clone()
                .filter(|category| !category.trim().is_empty()),
            price: PriceRange {
                min: parse_price(params.min_price.as_deref()),
                max: parse_price(params.max_price.as_deref()),
            },
        };

        let sort = non_blank(params.sort_by.as_deref())
            .and_then(|raw| SortOrder::from_str(raw).ok())
            .unwrap_or_default();

        let page = Page {
            number: parse_positive::<u64>(params.page.as_deref()).unwrap_or(DEFAULT_PAGE),
            limit: parse_positive::<i64>(params.limit.as_deref()).unwrap_or(DEFAULT_LIMIT),
        };

        Self { filter, sort, page }
    }

    /// Number of matching documents to skip: `(page - 1) * limit`,
    /// clamped to what the server accepts.
    pub fn skip(&self) -> u64 {
        self.page
            .number
            .saturating_sub(1)
            .saturating_mul(self.page.limit as u64)
            .min(i64::MAX as u64)
    }

    pub fn limit(&self) -> i64 {
        self.page.limit
    }

    /// MongoDB filter document. Only supplied criteria appear in it.
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();

        if let Some(ref category) = self.filter.category {
            filter.insert("category", category.as_str());
        }

        if !self.filter.price.is_unbounded() {
            let mut range = Document::new();
            if let Some(min) = self.filter.price.min {
                range.insert("$gte", min);
            }
            if let Some(max) = self.filter.price.max {
                range.insert("$lte", max);
            }
            filter.insert("price", range);
        }

        filter
    }

    /// MongoDB sort document; `_id` breaks ties so pages are stable.
    pub fn sort_document(&self) -> Document {
        match self.sort {
            SortOrder::Natural => doc! { "_id": 1 },
            SortOrder::PriceAsc => doc! { "price": 1, "_id": 1 },
            SortOrder::PriceDesc => doc! { "price": -1, "_id": 1 },
        }
    }

    /// Same predicate as [`Self::to_document`], evaluated in memory
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = match self.filter.category {
            Some(ref wanted) => product.category.as_deref() == Some(wanted.as_str()),
            None => true,
        };
        category_ok && self.filter.price.contains(product.price)
    }

    /// Same ordering as [`Self::sort_document`], evaluated in memory
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let by_price = match self.sort {
            SortOrder::Natural => Ordering::Equal,
            SortOrder::PriceAsc => a.price.total_cmp(&b.price),
            SortOrder::PriceDesc => b.price.total_cmp(&a.price),
        };
        by_price.then_with(|| a.id.cmp(&b.id))
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_price(raw: Option<&str>) -> Option<f64> {
    non_blank(raw)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|p| p.is_finite())
}

fn parse_positive<T>(raw: Option<&str>) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    non_blank(raw)
        .and_then(|s| s.parse::<T>().ok())
        .filter(|n| *n > T::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attributes;
    use mongodb::bson::oid::ObjectId;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut p = ListParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "category" => p.category = value,
                "minPrice" => p.min_price = value,
                "maxPrice" => p.max_price = value,
                "sortBy" => p.sort_by = value,
                "page" => p.page = value,
                "limit" => p.limit = value,
                other => panic!("unknown param {}", other),
            }
        }
        p
    }

    fn product(price: f64, category: Option<&str>) -> Product {
        Product {
            id: ObjectId::new(),
            name: "item".to_string(),
            price,
            category: category.map(str::to_string),
            attributes: Attributes::new(),
        }
    }

    #[test]
    fn test_defaults() {
        let query = ProductQuery::from_params(&ListParams::default());
        assert_eq!(query, ProductQuery::default());
        assert_eq!(query.skip(), 0);
        assert_eq!(query.limit(), 10);
        assert_eq!(query.to_document(), Document::new());
        assert_eq!(query.sort_document(), doc! { "_id": 1 });
    }

    #[test]
    fn test_category_filter() {
        let query = ProductQuery::from_params(&params(&[("category", "office")]));
        assert_eq!(query.to_document(), doc! { "category": "office" });
    }

    #[test]
    fn test_blank_category_is_ignored() {
        let query = ProductQuery::from_params(&params(&[("category", "  ")]));
        assert_eq!(query.to_document(), Document::new());
    }

    #[test]
    fn test_category_is_matched_verbatim() {
        let query = ProductQuery::from_params(&params(&[("category", " office ")]));
        assert_eq!(query.to_document(), doc! { "category": " office " });
        assert!(query.matches(&product(1.0, Some(" office "))));
        assert!(!query.matches(&product(1.0, Some("office"))));
    }

    #[test]
    fn test_params_from_pairs_keep_first_value() {
        let pairs = [
            ("page", "2"),
            ("page", "5"),
            ("category", "office"),
            ("category", "kitchen"),
            ("color", "blue"),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string()));

        let collected: ListParams = pairs.into_iter().collect();
        assert_eq!(collected.page.as_deref(), Some("2"));
        assert_eq!(collected.category.as_deref(), Some("office"));
        assert_eq!(collected.limit, None);
    }

    #[test]
    fn test_price_range_bounds() {
        let both = ProductQuery::from_params(&params(&[("minPrice", "5"), ("maxPrice", "20")]));
        assert_eq!(
            both.to_document(),
            doc! { "price": { "$gte": 5.0, "$lte": 20.0 } }
        );

        let min_only = ProductQuery::from_params(&params(&[("minPrice", "0")]));
        assert_eq!(min_only.to_document(), doc! { "price": { "$gte": 0.0 } });

        let max_only = ProductQuery::from_params(&params(&[("maxPrice", "9.99")]));
        assert_eq!(max_only.to_document(), doc! { "price": { "$lte": 9.99 } });
    }

    #[test]
    fn test_non_numeric_price_is_absent() {
        let query = ProductQuery::from_params(&params(&[
            ("minPrice", "cheap"),
            ("maxPrice", "NaN"),
        ]));
        assert!(query.filter.price.is_unbounded());
        assert_eq!(query.to_document(), Document::new());

        let infinite = ProductQuery::from_params(&params(&[("maxPrice", "inf")]));
        assert!(infinite.filter.price.is_unbounded());
    }

    #[test]
    fn test_combined_filter() {
        let query = ProductQuery::from_params(&params(&[
            ("category", "office"),
            ("minPrice", "1"),
        ]));
        assert_eq!(
            query.to_document(),
            doc! { "category": "office", "price": { "$gte": 1.0 } }
        );
    }

    #[test]
    fn test_sort_orders() {
        let asc = ProductQuery::from_params(&params(&[("sortBy", "price_asc")]));
        assert_eq!(asc.sort, SortOrder::PriceAsc);
        assert_eq!(asc.sort_document(), doc! { "price": 1, "_id": 1 });

        let desc = ProductQuery::from_params(&params(&[("sortBy", "price_desc")]));
        assert_eq!(desc.sort, SortOrder::PriceDesc);
        assert_eq!(desc.sort_document(), doc! { "price": -1, "_id": 1 });
    }

    #[test]
    fn test_unknown_sort_keeps_natural_order() {
        for raw in ["name_asc", "PRICE", "", "natural"] {
            let query = ProductQuery::from_params(&params(&[("sortBy", raw)]));
            assert_eq!(query.sort, SortOrder::Natural, "sortBy={}", raw);
        }
    }

    #[test]
    fn test_pagination() {
        let query = ProductQuery::from_params(&params(&[("page", "3"), ("limit", "5")]));
        assert_eq!(query.skip(), 10);
        assert_eq!(query.limit(), 5);
    }

    #[test]
    fn test_invalid_pagination_falls_back_to_defaults() {
        for (page, limit) in [("0", "0"), ("-1", "-5"), ("abc", "x"), ("1.5", "2.5")] {
            let query = ProductQuery::from_params(&params(&[("page", page), ("limit", limit)]));
            assert_eq!(query.page, Page::default(), "page={} limit={}", page, limit);
        }
    }

    #[test]
    fn test_large_limit_is_honoured() {
        let query = ProductQuery::from_params(&params(&[("limit", "5000")]));
        assert_eq!(query.limit(), 5000);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let query = ProductQuery::from_params(&params(&[
            ("page", "18446744073709551615"),
            ("limit", "100"),
        ]));
        assert_eq!(query.skip(), i64::MAX as u64);
    }

    #[test]
    fn test_matches_mirrors_filter() {
        let query = ProductQuery::from_params(&params(&[
            ("category", "office"),
            ("minPrice", "2"),
            ("maxPrice", "5"),
        ]));

        assert!(query.matches(&product(2.0, Some("office"))));
        assert!(query.matches(&product(5.0, Some("office"))));
        assert!(!query.matches(&product(5.01, Some("office"))));
        assert!(!query.matches(&product(3.0, Some("kitchen"))));
        assert!(!query.matches(&product(3.0, None)));
    }

    #[test]
    fn test_compare_breaks_ties_by_id() {
        let query = ProductQuery::from_params(&params(&[("sortBy", "price_desc")]));
        let first = product(3.0, None);
        let second = product(3.0, None);
        let cheap = product(1.0, None);

        assert_eq!(query.compare(&first, &second), Ordering::Less);
        assert_eq!(query.compare(&cheap, &first), Ordering::Greater);
    }
}
