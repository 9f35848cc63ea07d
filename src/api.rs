//! HTTP surface: storefront views, admin product CRUD, token issuance and
//! lookup, client access exchange.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::{Catalog, CatalogError, PgCatalog};
use crate::domain::aggregates::product::{Base, Product, Variant};
use crate::domain::aggregates::token_record::{ClientContact, ClientTokenRecord};
use crate::domain::events::{ProductEvent, ProductFeed};
use crate::domain::value_objects::{derive_product_code, normalize_color, normalize_size};
use crate::gate;
use crate::token::{self, IssueError, PgTokenStore, ResolveError, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub catalog: PgCatalog,
    pub tokens: PgTokenStore,
    pub feed: ProductFeed,
    pub client_password: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "loomfront"})) }))
        .route("/retail", get(retail_catalog))
        .route("/client", get(client_gate_page))
        .route("/client/catalog", get(client_catalog))
        .route("/admin", get(admin_summary))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route("/api/v1/products/:code", get(get_product).put(update_product).delete(delete_product))
        .route("/api/v1/tokens", post(issue_token))
        .route("/api/v1/tokens/lookup", post(lookup_token))
        .route("/api/v1/tokens/:token", get(lookup_token_by_path))
        .route("/api/v1/client/access", post(client_access))
        .layer(middleware::from_fn(gate::access_gate))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        tracing::error!(error = %e, "catalog failure");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage error")
    }
}

impl From<IssueError> for ApiError {
    fn from(e: IssueError) -> Self {
        let status = match &e {
            IssueError::InvalidQuantity => StatusCode::UNPROCESSABLE_ENTITY,
            IssueError::ProductNotFound(_) | IssueError::VariantNotFound => StatusCode::NOT_FOUND,
            IssueError::AllocationExhausted => StatusCode::SERVICE_UNAVAILABLE,
            IssueError::Store(_) | IssueError::Catalog(_) => {
                tracing::error!(error = %e, "token issuance storage failure");
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage error");
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        let status = match &e {
            ResolveError::EmptyToken | ResolveError::MalformedToken | ResolveError::InvalidQuantity => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ResolveError::ProductNotFound | ResolveError::VariantNotFound => StatusCode::NOT_FOUND,
            ResolveError::Store(_) | ResolveError::Catalog(_) => {
                tracing::error!(error = %e, "token lookup storage failure");
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage error");
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "token store failure");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage error")
    }
}

fn validation_error(errors: validator::ValidationErrors) -> ApiError {
    // Surface the first failing field so the form can point at it. Nested
    // payloads (the contact block) report as `client.email` etc.
    let mut messages = Vec::new();
    collect_validation_messages("", &errors, &mut messages);
    let message = messages.into_iter().next().unwrap_or_else(|| "invalid request".to_string());
    ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, message)
}

fn collect_validation_messages(prefix: &str, errors: &validator::ValidationErrors, out: &mut Vec<String>) {
    use validator::ValidationErrorsKind;
    for (field, kind) in errors.errors() {
        let name = if prefix.is_empty() { field.to_string() } else { format!("{prefix}.{field}") };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for e in errs {
                    out.push(match &e.message {
                        Some(m) => format!("{name}: {m}"),
                        None => format!("{name}: invalid"),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_validation_messages(&name, nested, out),
            ValidationErrorsKind::List(items) => {
                for (idx, nested) in items {
                    collect_validation_messages(&format!("{name}[{idx}]"), nested, out);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Storefront views
// ---------------------------------------------------------------------------

async fn retail_catalog(State(s): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(s.catalog.list_by_base(Base::Retail).await?))
}

#[derive(Debug, Deserialize)]
struct GateQuery {
    redirect: Option<String>,
}

/// The client gate landing page. Always reachable; echoes the path the
/// visitor was bounced from so the form can forward them after the password
/// exchange.
async fn client_gate_page(Query(q): Query<GateQuery>) -> Json<serde_json::Value> {
    Json(json!({"gated": true, "redirect": q.redirect}))
}

async fn client_catalog(State(s): State<AppState>) -> Result<Json<Vec<crate::domain::aggregates::ClientProductView>>, ApiError> {
    let products = s.catalog.list_by_base(Base::Client).await?;
    Ok(Json(products.iter().map(Product::client_view).collect()))
}

async fn admin_summary(State(s): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let retail = s.catalog.count_by_base(Base::Retail).await?;
    let client = s.catalog.count_by_base(Base::Client).await?;
    Ok(Json(json!({"products": {"retail": retail, "client": client}})))
}

// ---------------------------------------------------------------------------
// Product CRUD (admin)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[validate(length(min = 1, message = "slug is required"))]
    pub slug: String,
    pub product_code: Option<String>,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    pub sub_category: Option<String>,
    pub fabric_details: Option<String>,
    pub care_instructions: Option<String>,
    pub hero_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub base: Base,
    #[validate(length(min = 1, message = "at least one variant is required"))]
    pub variants: Vec<VariantPayload>,
}

// Serialize is required by the length validator on `ProductPayload::variants`,
// which attaches the offending value as an error param.
#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VariantPayload {
    #[validate(length(min = 1, message = "sku is required"))]
    pub sku: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub size: String,
    #[serde(rename = "retailPriceBDT")]
    #[validate(range(min = 1, message = "price must be positive"))]
    pub retail_price_bdt: i64,
}

impl ProductPayload {
    fn into_product(self, id: Uuid, created_at: chrono::DateTime<chrono::Utc>) -> Product {
        let product_code = self
            .product_code
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| derive_product_code(&self.slug));
        Product {
            id,
            product_code,
            slug: self.slug,
            title: self.title,
            description: self.description,
            category: self.category,
            sub_category: self.sub_category,
            fabric_details: self.fabric_details,
            care_instructions: self.care_instructions,
            hero_image: self.hero_image,
            images: self.images,
            base: self.base,
            variants: self
                .variants
                .into_iter()
                .map(|v| Variant {
                    id: Uuid::new_v4(),
                    sku: v.sku.trim().to_string(),
                    color: normalize_color(&v.color),
                    size: normalize_size(&v.size),
                    retail_price_bdt: v.retail_price_bdt,
                })
                .collect(),
            created_at,
            updated_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    base: Option<String>,
}

async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<Vec<Product>>, ApiError> {
    let base = match p.base.as_deref() {
        None => Base::Retail,
        Some(raw) => Base::parse(raw).ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "base must be retail or client"))?,
    };
    Ok(Json(s.catalog.list_by_base(base).await?))
}

async fn get_product(State(s): State<AppState>, Path(code): Path<String>) -> Result<Json<Product>, ApiError> {
    s.catalog
        .find_by_code(&code)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "product not found"))
}

async fn create_product(State(s): State<AppState>, Json(payload): Json<ProductPayload>) -> Result<(StatusCode, Json<Product>), ApiError> {
    payload.validate().map_err(validation_error)?;
    let product = payload.into_product(Uuid::now_v7(), chrono::Utc::now());
    s.catalog.insert(&product).await?;
    s.feed
        .publish(ProductEvent::Created {
            product_code: product.product_code.clone(),
            slug: product.slug.clone(),
            base: product.base,
        })
        .await;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(State(s): State<AppState>, Path(code): Path<String>, Json(payload): Json<ProductPayload>) -> Result<Json<Product>, ApiError> {
    payload.validate().map_err(validation_error)?;
    let existing = s
        .catalog
        .find_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "product not found"))?;
    let mut product = payload.into_product(existing.id, existing.created_at);
    // The code is the external identifier; it never changes on update.
    product.product_code = existing.product_code;
    s.catalog.update(&product).await?;
    s.feed
        .publish(ProductEvent::Updated {
            product_code: product.product_code.clone(),
            slug: product.slug.clone(),
            base: product.base,
        })
        .await;
    Ok(Json(product))
}

async fn delete_product(State(s): State<AppState>, Path(code): Path<String>) -> Result<StatusCode, ApiError> {
    if !s.catalog.delete(&code).await? {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "product not found"));
    }
    s.feed.publish(ProductEvent::Deleted { product_code: code }).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Token issuance & lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenRequest {
    #[validate(length(min = 1, message = "SKU is required"))]
    pub sku: String,
    pub quantity: i64,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub size: String,
    #[validate]
    pub client: ContactPayload,
}

/// Contact fields default to empty strings so an omitted field surfaces as
/// a named validation error rather than a deserialization failure.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    pub company: Option<String>,
    pub notes: Option<String>,
}

impl From<ContactPayload> for ClientContact {
    fn from(c: ContactPayload) -> Self {
        ClientContact {
            name: c.name.trim().to_string(),
            email: c.email.trim().to_string(),
            phone: c.phone.trim().to_string(),
            address: c.address.trim().to_string(),
            company: c.company.filter(|v| !v.trim().is_empty()),
            notes: c.notes.filter(|v| !v.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenResponse {
    pub token: String,
    pub record: ClientTokenRecord,
    pub product: Product,
    pub variant: Variant,
}

async fn issue_token(State(s): State<AppState>, Json(req): Json<IssueTokenRequest>) -> Result<(StatusCode, Json<IssueTokenResponse>), ApiError> {
    req.validate().map_err(validation_error)?;
    let issued = token::issue(&s.tokens, &s.catalog, &req.sku, req.quantity, &req.color, &req.size, req.client.into()).await?;
    tracing::info!(token = %issued.record.token, "client token issued");
    Ok((
        StatusCode::CREATED,
        Json(IssueTokenResponse {
            token: issued.record.token.clone(),
            record: issued.record,
            product: issued.product,
            variant: issued.variant,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub token: String,
}

async fn lookup_token(State(s): State<AppState>, Json(req): Json<LookupRequest>) -> Result<Json<token::ResolvedToken>, ApiError> {
    Ok(Json(token::resolve(&s.tokens, &s.catalog, &req.token).await?))
}

/// Path-parameter variant for tools that percent-encode the token.
async fn lookup_token_by_path(State(s): State<AppState>, Path(raw): Path<String>) -> Result<Json<token::ResolvedToken>, ApiError> {
    Ok(Json(token::resolve(&s.tokens, &s.catalog, &raw).await?))
}

// ---------------------------------------------------------------------------
// Client access exchange
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ClientAccessRequest {
    password: String,
}

/// Compares the supplied password with the configured secret and, on a
/// match, grants wholesale access for 30 days via the `client_access`
/// cookie the gate reads.
async fn client_access(State(s): State<AppState>, Json(req): Json<ClientAccessRequest>) -> Response {
    if req.password == s.client_password {
        let cookie = format!(
            "{}={}; Path=/; Max-Age={}; SameSite=Lax",
            gate::CLIENT_ACCESS_COOKIE,
            gate::CLIENT_ACCESS_GRANTED,
            gate::CLIENT_ACCESS_MAX_AGE_SECS,
        );
        ([(header::SET_COOKIE, cookie)], Json(json!({"granted": true}))).into_response()
    } else {
        tracing::info!("client access password rejected");
        (StatusCode::UNAUTHORIZED, Json(json!({"error": "Incorrect password"}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue_request(email: &str) -> IssueTokenRequest {
        IssueTokenRequest {
            sku: "WEFT01-RED-M".into(),
            quantity: 2,
            color: "Red".into(),
            size: "M".into(),
            client: ContactPayload {
                name: "Rahim Traders".into(),
                email: email.into(),
                phone: "+8801700000000".into(),
                address: "Dhaka".into(),
                company: None,
                notes: None,
            },
        }
    }

    #[test]
    fn test_issue_request_validates_contact_fields() {
        assert!(issue_request("rahim@example.com").validate().is_ok());
        let err = issue_request("").validate().unwrap_err();
        assert!(format!("{err:?}").contains("email"));
    }

    #[test]
    fn test_validation_error_names_nested_field() {
        let err = issue_request("").validate().unwrap_err();
        let api = validation_error(err);
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(api.message.contains("client.email"), "got: {}", api.message);
    }

    #[test]
    fn test_issue_request_missing_email_deserializes_then_fails_validation() {
        let req: IssueTokenRequest = serde_json::from_value(json!({
            "sku": "WEFT01-RED-M",
            "quantity": 1,
            "client": {"name": "A", "phone": "1", "address": "Dhaka"}
        }))
        .unwrap();
        let err = req.validate().unwrap_err();
        assert!(format!("{err:?}").contains("email"));
    }

    #[test]
    fn test_contact_payload_drops_blank_optionals() {
        let c: ClientContact = ContactPayload {
            name: " A ".into(),
            email: "a@b.c".into(),
            phone: "1".into(),
            address: "Dhaka".into(),
            company: Some("  ".into()),
            notes: Some("call after 5".into()),
        }
        .into();
        assert_eq!(c.name, "A");
        assert!(c.company.is_none());
        assert_eq!(c.notes.as_deref(), Some("call after 5"));
    }

    #[test]
    fn test_product_payload_requires_variants() {
        let payload: ProductPayload = serde_json::from_value(json!({
            "slug": "plain-tee",
            "title": "Plain Tee",
            "category": "tees",
            "base": "retail",
            "variants": []
        }))
        .unwrap();
        let err = payload.validate().unwrap_err();
        assert!(format!("{err:?}").contains("variants"));
    }

    #[test]
    fn test_product_payload_derives_code_from_slug() {
        let payload: ProductPayload = serde_json::from_value(json!({
            "slug": "jamdani-saree-red",
            "title": "Jamdani Saree",
            "category": "sarees",
            "base": "client",
            "variants": [{"sku": "JAM-RED-FS", "color": "Red", "size": "", "retailPriceBDT": 4500}]
        }))
        .unwrap();
        payload.validate().unwrap();
        let p = payload.into_product(Uuid::new_v4(), chrono::Utc::now());
        assert_eq!(p.product_code, "JAMDANISAREE");
        assert_eq!(p.variants[0].size, "unsized");
        assert_eq!(p.variants[0].color, "Red");
    }
}
