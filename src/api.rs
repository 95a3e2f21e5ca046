//! REST API Server for the savings optimizer
//!
//! Exposes the calculator, the distribution optimizer and the spend
//! allocator over HTTP. The optimizer runs on the blocking pool under a
//! deadline.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::calculator::{calculate, calculate_all};
use crate::config::AppConfig;
use crate::error::OptimizerError;
use crate::models::{Distribution, Requirements};
use crate::optimizer::{estimate_scenarios, optimize};
use crate::products::ProductKind;
use crate::progress::TracingProgress;
use crate::spend::allocate_spend;
use crate::tiers::TierTable;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CalculateRequest {
    pub product: String,
    pub deposit: f64,
    #[serde(default)]
    pub requirements: Requirements,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CalculateAllRequest {
    pub deposit: f64,
    #[serde(default)]
    pub requirements: Requirements,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OptimizeRequest {
    pub total_amount: u64,
    #[serde(default)]
    pub requirements: Requirements,
    /// Restrict the search to these products
    pub products: Option<Vec<String>>,
    pub increment: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpendRequest {
    pub total_spend: f64,
    /// Deposit held with each product, keyed by product name
    pub deposits: BTreeMap<String, u64>,
    #[serde(default)]
    pub requirements: Requirements,
    pub salary_product: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProductInfo {
    pub name: String,
    pub bonus_cap: u64,
    pub min_qualifying_spend: Option<f64>,
    pub tier_count: usize,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn fail(e: &OptimizerError) -> ApiResult {
    let status = match e {
        OptimizerError::UnknownProduct(_)
        | OptimizerError::InvalidInput(_)
        | OptimizerError::InvalidAmount { .. }
        | OptimizerError::InvalidRate(_) => StatusCode::BAD_REQUEST,
        OptimizerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        OptimizerError::MissingTier { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(e.to_string())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub table: Arc<TierTable>,
    pub config: Arc<AppConfig>,
}

/// =============================
/// Helpers — Name → Product Parsing
/// =============================

fn parse_product(name: &str) -> Result<ProductKind, OptimizerError> {
    name.parse()
}

fn parse_products(names: &[String]) -> Result<Vec<ProductKind>, OptimizerError> {
    names.iter().map(|n| parse_product(n)).collect()
}

fn parse_deposits(deposits: &BTreeMap<String, u64>) -> Result<Distribution, OptimizerError> {
    deposits
        .iter()
        .map(|(name, amount)| Ok((parse_product(name)?, *amount)))
        .collect()
}

/// =============================
/// Health & Catalogue Endpoints
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn list_products(State(state): State<ApiState>) -> ApiResult {
    let products: Vec<ProductInfo> = state
        .table
        .products()
        .map(|product| ProductInfo {
            name: product.name().to_string(),
            bonus_cap: state.config.optimizer.bonus_cap(product),
            min_qualifying_spend: product.min_qualifying_spend(),
            tier_count: state.table.tiers(product).len(),
        })
        .collect();
    ok(products)
}

/// =============================
/// Calculation Endpoints
/// =============================

async fn calculate_handler(
    State(state): State<ApiState>,
    Json(req): Json<CalculateRequest>,
) -> ApiResult {
    let product = match parse_product(&req.product) {
        Ok(product) => product,
        Err(e) => return fail(&e),
    };
    info!(product = %product, deposit = req.deposit, "Calculate request");

    match calculate(product, req.deposit, &state.table, &req.requirements) {
        Ok(result) => ok(serde_json::json!({
            "product": product,
            "total_interest": result.total_interest,
            "monthly_interest": result.monthly_interest(),
            "breakdown": result.breakdown,
            "warnings": result.warnings,
        })),
        Err(e) => {
            warn!(product = %product, error = %e, "Calculation failed");
            fail(&e)
        }
    }
}

async fn calculate_all_handler(
    State(state): State<ApiState>,
    Json(req): Json<CalculateAllRequest>,
) -> ApiResult {
    if !req.deposit.is_finite() || req.deposit < 0.0 {
        return fail(&OptimizerError::InvalidInput(format!(
            "deposit must be a non-negative amount, got {}",
            req.deposit
        )));
    }
    ok(calculate_all(req.deposit, &state.table, &req.requirements))
}

/// =============================
/// Optimization Endpoints
/// =============================

async fn optimize_handler(
    State(state): State<ApiState>,
    Json(req): Json<OptimizeRequest>,
) -> ApiResult {
    if req.total_amount > state.config.max_optimize_amount {
        return fail(&OptimizerError::InvalidInput(format!(
            "total_amount {} exceeds the limit of {}",
            req.total_amount, state.config.max_optimize_amount
        )));
    }

    let mut config = state.config.optimizer.clone();
    if let Some(names) = &req.products {
        match parse_products(names) {
            Ok(products) => config.products = products,
            Err(e) => return fail(&e),
        }
    }
    if let Some(increment) = req.increment {
        config.increment = increment;
    }
    if let Err(e) = config.validate() {
        return fail(&e);
    }

    if config.increment < state.config.min_increment {
        return fail(&OptimizerError::InvalidInput(format!(
            "increment {} is below the minimum of {}",
            config.increment, state.config.min_increment
        )));
    }
    let scenarios = estimate_scenarios(req.total_amount, &config, req.requirements.has_salary);
    if scenarios > state.config.max_scenarios {
        return fail(&OptimizerError::InvalidInput(format!(
            "search of {} scenarios exceeds the limit of {}; use a larger increment or fewer products",
            scenarios, state.config.max_scenarios
        )));
    }

    info!(
        total_amount = req.total_amount,
        products = config.products.len(),
        increment = config.increment,
        "Optimize request"
    );

    let table = Arc::clone(&state.table);
    let requirements = req.requirements;
    let total = req.total_amount;
    let deadline = state.config.optimize_timeout;

    let task = tokio::task::spawn_blocking(move || {
        optimize(total, &table, &requirements, &config, &mut TracingProgress)
    });

    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(Ok(outcome))) => ok(outcome),
        Ok(Ok(Err(e))) => fail(&e),
        Ok(Err(join_error)) => {
            error!(error = %join_error, "Optimizer task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Optimizer task failed: {}", join_error))),
            )
        }
        Err(_) => {
            warn!(total_amount = total, "Optimizer exceeded deadline");
            fail(&OptimizerError::Timeout(deadline.as_secs()))
        }
    }
}

async fn spend_handler(State(state): State<ApiState>, Json(req): Json<SpendRequest>) -> ApiResult {
    let deposits = match parse_deposits(&req.deposits) {
        Ok(deposits) => deposits,
        Err(e) => return fail(&e),
    };
    let salary_product = match req.salary_product.as_deref().map(parse_product).transpose() {
        Ok(product) => product,
        Err(e) => return fail(&e),
    };

    match allocate_spend(
        req.total_spend,
        &deposits,
        &state.table,
        &req.requirements,
        salary_product,
    ) {
        Ok(allocation) => ok(allocation),
        Err(e) => fail(&e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(table: Arc<TierTable>, config: Arc<AppConfig>) -> Router {
    let state = ApiState { table, config };

    Router::new()
        .route("/health", get(health))
        .route("/api/products", get(list_products))
        .route("/api/calculate", post(calculate_handler))
        .route("/api/calculate/all", post(calculate_all_handler))
        .route("/api/optimize", post(optimize_handler))
        .route("/api/spend", post(spend_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    table: Arc<TierTable>,
    config: Arc<AppConfig>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let router = create_router(table, config);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn router_with(config: AppConfig) -> Router {
        let table = TierTable::builtin().unwrap();
        create_router(Arc::new(table), Arc::new(config))
    }

    async fn send(router: Router, method: &str, uri: &str, body: serde_json::Value) -> (StatusCode, ApiResponse) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let router = router_with(AppConfig::default());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_products_listed() {
        let router = router_with(AppConfig::default());
        let (status, body) = send(router, "GET", "/api/products", serde_json::json!({})).await;

        assert_eq!(status, StatusCode::OK);
        let products = body.data.unwrap();
        assert_eq!(products.as_array().unwrap().len(), ProductKind::ALL.len());
    }

    #[tokio::test]
    async fn test_calculate_single_product() {
        let router = router_with(AppConfig::default());
        let (status, body) = send(
            router,
            "POST",
            "/api/calculate",
            serde_json::json!({ "product": "chocolate", "deposit": 10000.0 }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        let total = body.data.unwrap()["total_interest"].as_f64().unwrap();
        assert!((total - 360.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_product_is_bad_request() {
        let router = router_with(AppConfig::default());
        let (status, body) = send(
            router,
            "POST",
            "/api/calculate",
            serde_json::json!({ "product": "Mattress", "deposit": 1000.0 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert!(body.error.unwrap().contains("Mattress"));
    }

    #[tokio::test]
    async fn test_calculate_all_returns_every_product() {
        let router = router_with(AppConfig::default());
        let (status, body) = send(
            router,
            "POST",
            "/api/calculate/all",
            serde_json::json!({
                "deposit": 50000.0,
                "requirements": { "has_salary": true, "salary_amount": 4000.0 }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap().as_array().unwrap().len(), ProductKind::ALL.len());
    }

    #[tokio::test]
    async fn test_optimize_small_search() {
        let router = router_with(AppConfig::default());
        let (status, body) = send(
            router,
            "POST",
            "/api/optimize",
            serde_json::json!({
                "total_amount": 100000,
                "increment": 25000,
                "products": ["SC BonusSaver", "Chocolate"],
                "requirements": { "has_salary": true, "salary_amount": 5000.0 }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        let solutions = data["solutions"].as_array().unwrap();
        assert_eq!(solutions.len(), 3);
        assert_eq!(solutions[0]["salary_product"], "SC BonusSaver");
    }

    #[tokio::test]
    async fn test_optimize_rejects_large_amount() {
        let config = AppConfig {
            max_optimize_amount: 10_000,
            ..Default::default()
        };
        let (status, _) = send(
            router_with(config),
            "POST",
            "/api/optimize",
            serde_json::json!({ "total_amount": 20000 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_optimize_rejects_fine_increment() {
        let (status, body) = send(
            router_with(AppConfig::default()),
            "POST",
            "/api/optimize",
            serde_json::json!({ "total_amount": 500000, "increment": 1 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.unwrap().contains("minimum"));
    }

    #[tokio::test]
    async fn test_optimize_rejects_oversized_search() {
        let config = AppConfig {
            max_scenarios: 1_000,
            ..Default::default()
        };
        let (status, body) = send(
            router_with(config),
            "POST",
            "/api/optimize",
            serde_json::json!({ "total_amount": 100000 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.unwrap().contains("scenarios"));
    }

    #[tokio::test]
    async fn test_optimize_rejects_duplicate_products() {
        let (status, _) = send(
            router_with(AppConfig::default()),
            "POST",
            "/api/optimize",
            serde_json::json!({
                "total_amount": 100000,
                "increment": 50000,
                "products": ["Chocolate", "chocolate"]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_optimize_deadline() {
        let config = AppConfig {
            optimize_timeout: Duration::from_millis(1),
            ..Default::default()
        };
        let (status, body) = send(
            router_with(config),
            "POST",
            "/api/optimize",
            serde_json::json!({
                "total_amount": 100000,
                "requirements": { "has_salary": true, "salary_amount": 5000.0 }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body.error.unwrap().contains("deadline"));
    }

    #[tokio::test]
    async fn test_spend_allocation() {
        let router = router_with(AppConfig::default());
        let (status, body) = send(
            router,
            "POST",
            "/api/spend",
            serde_json::json!({
                "total_spend": 1500.0,
                "deposits": { "BOC SmartSaver": 50000 }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        assert_eq!(data["allocation"]["BOC SmartSaver"], 1500.0);
    }
}
