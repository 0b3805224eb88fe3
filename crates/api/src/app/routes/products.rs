use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use tingo_auth::Identity;
use tingo_core::{DomainError, ProductId};
use tingo_products::{
    ensure_image_content_type, image_object_key, stored_content_type, NewProduct, ProductFilter,
    ProductPatch,
};

use crate::app::dto::{self, ImageUploadResponse, MessageResponse};
use crate::app::errors::{self, json_error};
use crate::app::services::AppServices;
use crate::context::OptionalIdentity;

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "file";

pub async fn list_public(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<OptionalIdentity>,
    Query(query): Query<dto::PublicProductQuery>,
) -> axum::response::Response {
    if let Some(identity) = caller.identity() {
        tracing::debug!(subject = %identity.subject, "public catalog viewed by signed-in user");
    }

    match services.products.list(&query.into_filter()).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::backend_error_to_response(e),
    }
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.products.list_categories().await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => errors::backend_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(filter): Query<ProductFilter>,
) -> axum::response::Response {
    match services.products.list(&filter).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::backend_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse::<ProductId>() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.get(&id).await {
        Ok(Some(product)) => Json(product).into_response(),
        Ok(None) => errors::not_found("product"),
        Err(e) => errors::backend_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<NewProduct>,
) -> axum::response::Response {
    if let Err(e) = body.validate() {
        return errors::domain_error_to_response(e);
    }

    let product = match services.products.insert(body).await {
        Ok(p) => p,
        Err(e) => return errors::backend_error_to_response(e),
    };

    services
        .record_audit(
            &identity.subject,
            "CREATE",
            "product",
            Some(product.id.to_string()),
            None,
        )
        .await;

    (StatusCode::CREATED, Json(product)).into_response()
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> axum::response::Response {
    let id = match id.parse::<ProductId>() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    if let Err(e) = patch.validate() {
        return errors::domain_error_to_response(e);
    }

    let product = match services.products.update(&id, &patch).await {
        Ok(Some(p)) => p,
        Ok(None) => return errors::not_found("product"),
        Err(e) => return errors::backend_error_to_response(e),
    };

    services
        .record_audit(&identity.subject, "UPDATE", "product", Some(id.to_string()), None)
        .await;

    Json(product).into_response()
}

/// Soft delete: the product stays listed for staff but leaves the public catalog.
pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse::<ProductId>() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.deactivate(&id).await {
        Ok(true) => {}
        Ok(false) => return errors::not_found("product"),
        Err(e) => return errors::backend_error_to_response(e),
    }

    services
        .record_audit(&identity.subject, "DELETE", "product", Some(id.to_string()), None)
        .await;

    Json(MessageResponse::new("Producto desactivado exitosamente")).into_response()
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.products.list(&ProductFilter::low_stock()).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::backend_error_to_response(e),
    }
}

pub async fn upload_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> axum::response::Response {
    let id = match id.parse::<ProductId>() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.get(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::not_found("product"),
        Err(e) => return errors::backend_error_to_response(e),
    }

    let upload = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return errors::domain_error_to_response(DomainError::validation(format!(
                    "multipart field '{UPLOAD_FIELD}' is required"
                )));
            }
            Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_multipart", e.body_text()),
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        if let Err(e) = ensure_image_content_type(field.content_type()) {
            return errors::domain_error_to_response(e);
        }
        let filename = field.file_name().map(str::to_string);
        match field.bytes().await {
            Ok(bytes) => break (filename, bytes),
            Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_multipart", e.body_text()),
        }
    };

    let (filename, bytes) = upload;
    if bytes.is_empty() {
        return errors::domain_error_to_response(DomainError::validation("uploaded file is empty"));
    }

    let key = image_object_key(&id, &Uuid::new_v4().to_string(), filename.as_deref());
    let content_type = stored_content_type(filename.as_deref());
    if let Err(e) = services.objects.upload(&key, bytes.to_vec(), &content_type).await {
        return errors::backend_error_to_response(e);
    }

    let image_url = services.objects.public_url(&key);
    if let Err(e) = services.products.add_image(&id, &image_url).await {
        return errors::backend_error_to_response(e);
    }

    tracing::info!(product = %id, key = %key, size = bytes.len(), "product image stored");
    services
        .record_audit(
            &identity.subject,
            "UPLOAD_IMAGE",
            "product_image",
            Some(id.to_string()),
            None,
        )
        .await;

    Json(ImageUploadResponse {
        message: "Imagen subida exitosamente",
        image_url,
    })
    .into_response()
}
