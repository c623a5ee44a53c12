//! Listing queries of the product catalog.

use anyhow::bail;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use url::form_urlencoded;
use value::{Dict, Query, Value};

pub const PRODUCTS_PATH: &str = "products";
pub const CATEGORIES_PATH: &str = "categories";

/// The id always stays a single segment below `products`.
pub fn product_path(id: &str) -> anyhow::Result<String> {
    if id.trim().is_empty() || id == "." || id == ".." {
        bail!("invalid product id {id:?}");
    }
    let segment = form_urlencoded::byte_serialize(id.as_bytes())
        .collect::<String>()
        // a literal `+` is already `%2B` here
        .replace('+', "%20");
    Ok(format!("{PRODUCTS_PATH}/{segment}"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum Sort {
    PriceAsc,
    PriceDesc,
    Name,
    Newest,
}

impl Display for Sort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Sort::PriceAsc => "priceAsc",
            Sort::PriceDesc => "priceDesc",
            Sort::Name => "name",
            Sort::Newest => "newest",
        })
    }
}

/// Filter, sort and paging of a product listing.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub except: Vec<String>,
    pub sort: Option<Sort>,
    pub page_index: u32,
    pub page_size: u32,
}

impl ProductQuery {
    pub fn new(page_size: u32) -> Self {
        ProductQuery {
            search: None,
            category: None,
            min_price: None,
            max_price: None,
            except: vec![],
            sort: None,
            page_index: 1,
            page_size,
        }
    }

    /// Products of the same category as the one shown, without it.
    pub fn related(category: &str, product_id: &str, page_size: u32) -> Self {
        ProductQuery::new(page_size)
            .category(category)
            .except(product_id)
    }

    pub fn search<S: Into<String>>(mut self, term: S) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn price(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn except<S: Into<String>>(mut self, id: S) -> Self {
        self.except.push(id.into());
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn page(mut self, page_index: u32) -> Self {
        self.page_index = page_index.max(1);
        self
    }

    /// The query in the layout the api expects; unset parts stay null and are
    /// therefore left out of the query string.
    pub fn to_query(&self) -> Query {
        let except = if self.except.is_empty() {
            Value::null()
        } else {
            Value::array(self.except.iter().map(Value::from).collect())
        };

        Dict::new()
            .with("SearchTerm", self.search.clone())
            .with(
                "Filter",
                Dict::new()
                    .with("CategoryId", self.category.clone())
                    .with("MinPrice", self.min_price)
                    .with("MaxPrice", self.max_price)
                    .with("ExceptIds", except),
            )
            .with("SortBy", self.sort.map(|s| s.to_string()))
            .with("PageIndex", self.page_index)
            .with("PageSize", self.page_size)
    }
}
