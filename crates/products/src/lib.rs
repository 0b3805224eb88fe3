//! Products catalog module.
//!
//! Pure catalog rules (no IO, no HTTP, no storage): record shape, input
//! validation and aliases, listing filters, image naming.

pub mod filter;
pub mod image;
pub mod product;

pub use filter::{sort_newest_first, ProductFilter};
pub use image::{ensure_image_content_type, image_object_key, stored_content_type};
pub use product::{Category, NewProduct, Product, ProductPatch};
