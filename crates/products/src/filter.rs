use serde::Deserialize;

use tingo_core::CategoryId;

use crate::Product;

/// Listing filter shared by the public and the authenticated catalog views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring over name, description, SKU and brand.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Only products at or below their restock threshold.
    #[serde(default, alias = "min_stock")]
    pub low_stock_only: bool,
    /// Hide deactivated products.
    #[serde(default)]
    pub active_only: bool,
}

impl ProductFilter {
    pub fn public() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn low_stock() -> Self {
        Self {
            active_only: true,
            low_stock_only: true,
            ..Self::default()
        }
    }

    /// Normalized search term; blank terms are ignored.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn matches(&self, product: &Product) -> bool {
        if self.active_only && !product.is_active {
            return false;
        }
        if self.low_stock_only && !product.is_low_stock() {
            return false;
        }
        if let Some(category) = &self.category_id {
            if product.category_id.as_ref() != Some(category) {
                return false;
            }
        }
        match self.search_term() {
            Some(term) => matches_search(product, term),
            None => true,
        }
    }

    /// Filter and order newest first.
    pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
        let mut out: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        sort_newest_first(&mut out);
        out
    }
}

pub fn sort_newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn matches_search(product: &Product, term: &str) -> bool {
    let needle = term.to_lowercase();
    [
        Some(product.name.as_str()),
        product.description.as_deref(),
        product.sku.as_deref(),
        product.brand.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}
