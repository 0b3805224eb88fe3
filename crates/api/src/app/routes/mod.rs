use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub mod audit;
pub mod auth;
pub mod products;
pub mod roles;
pub mod system;

/// Open to anyone.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/password-recovery", post(auth::password_recovery))
        .route("/productos/categorias", get(products::list_categories))
}

/// Open to anyone; a valid token is attached as `OptionalIdentity`.
pub fn optional_identity_router() -> Router {
    Router::new().route("/productos/publicos", get(products::list_public))
}

/// Any authenticated caller.
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/productos/listar", get(products::list_products))
        .route("/productos/stock-minimo", get(products::low_stock))
        .route("/productos/crear", post(products::create_product))
        .route("/productos/editar/:id", put(products::update_product))
        .route("/productos/eliminar/:id", delete(products::delete_product))
        .route("/productos/subir-imagen/:id", post(products::upload_image))
        .route("/productos/:id", get(products::get_product))
        .route("/roles/listar", get(roles::list_roles))
}

/// Callers holding the `admin` role.
pub fn admin_router() -> Router {
    Router::new()
        .route("/roles/asignar", post(roles::assign_role))
        .route("/roles/usuarios", get(roles::list_users))
        .route("/auditoria/listar", get(audit::list_audit_logs))
}
