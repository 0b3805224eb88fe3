use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use tingo_core::{CategoryId, DomainError, DomainResult, ProductId};

/// Catalog product as exposed to clients.
///
/// `image_url` is the first attached image; `images` lists all of them and is
/// only filled in by detail lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "Sku", default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub current_stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Build a fresh record from validated input.
    pub fn create(id: ProductId, input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        input.validate()?;
        let ts = timestamp(now);
        Ok(Self {
            id,
            name: input.name.trim().to_string(),
            description: input.description,
            sku: input.sku,
            brand: input.brand,
            price: input.price,
            current_stock: input.current_stock,
            min_stock: input.min_stock,
            is_active: input.is_active,
            category_id: input.category_id,
            category: None,
            image_url: input.image_url,
            images: None,
            created_at: Some(ts.clone()),
            updated_at: Some(ts),
        })
    }

    /// Apply a validated partial update.
    pub fn apply_patch(&mut self, patch: &ProductPatch, now: DateTime<Utc>) -> DomainResult<()> {
        patch.validate()?;

        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(sku) = &patch.sku {
            self.sku = Some(sku.clone());
        }
        if let Some(brand) = &patch.brand {
            self.brand = Some(brand.clone());
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.current_stock {
            self.current_stock = stock;
        }
        if let Some(min) = patch.min_stock {
            self.min_stock = min;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(category_id) = &patch.category_id {
            self.category_id = Some(category_id.clone());
        }
        self.updated_at = Some(timestamp(now));
        Ok(())
    }

    /// Soft delete: products are never removed, only deactivated.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = Some(timestamp(now));
    }

    /// At or below the restock threshold.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }

    /// Attach image URLs; the first one becomes the cover `image_url`.
    pub fn with_images(mut self, images: Vec<String>, include_all: bool) -> Self {
        if self.image_url.is_none() {
            self.image_url = images.first().cloned();
        }
        if include_all {
            self.images = Some(images);
        }
        self
    }
}

pub(crate) fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Input for product creation. Accepts both the canonical field names and
/// the short aliases older clients send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "Sku", alias = "sku", default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    pub price: f64,
    #[serde(alias = "stock", default)]
    pub current_stock: i64,
    #[serde(alias = "stock_minimo", default)]
    pub min_stock: i64,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(alias = "active", default = "default_true")]
    pub is_active: bool,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        ensure_price(self.price)?;
        ensure_stock("current_stock", self.current_stock)?;
        ensure_stock("min_stock", self.min_stock)?;
        Ok(())
    }
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "Sku",
        alias = "sku",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(alias = "stock", default, skip_serializing_if = "Option::is_none")]
    pub current_stock: Option<i64>,
    #[serde(alias = "stock_minimo", default, skip_serializing_if = "Option::is_none")]
    pub min_stock: Option<i64>,
    #[serde(alias = "active", default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    /// Not a column: attached as an additional product image.
    #[serde(default, skip_serializing)]
    pub image_url: Option<String>,
}

impl ProductPatch {
    /// True when no column would change. A patch carrying only `image_url`
    /// still counts as empty.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.sku.is_none()
            && self.brand.is_none()
            && self.price.is_none()
            && self.current_stock.is_none()
            && self.min_stock.is_none()
            && self.is_active.is_none()
            && self.category_id.is_none()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
        }
        if let Some(price) = self.price {
            ensure_price(price)?;
        }
        if let Some(stock) = self.current_stock {
            ensure_stock("current_stock", stock)?;
        }
        if let Some(min) = self.min_stock {
            ensure_stock("min_stock", min)?;
        }
        Ok(())
    }
}

fn ensure_price(price: f64) -> DomainResult<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(DomainError::validation("price must be greater than 0"));
    }
    Ok(())
}

fn ensure_stock(field: &str, value: i64) -> DomainResult<()> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

/// Product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
