use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;
use crate::core::{ExchangeEngine, ExchangeError};
use crate::models::{
    CounterpartQuery, CreateExchangeRequest, ErrorResponse, ExchangeRequestStatus, FindMatchesRequest,
    FindMatchesResponse, HealthResponse, MatchDecision, MatchDecisionRequest, MatchesQuery, MatchesResponse,
    UserQuery,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: ExchangeEngine,
    pub default_max_distance: Option<f64>,
}

/// Configure all exchange-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/exchanges", web::post().to(create_exchange))
        .route("/exchanges", web::get().to(list_exchanges))
        .route("/exchanges/{id}", web::get().to(get_exchange))
        .route("/exchanges/{id}", web::delete().to(delete_exchange))
        .route("/exchanges/{id}/matches/find", web::post().to(find_matches))
        .route("/exchanges/{id}/matches", web::get().to(list_matches))
        .route("/matches/{id}/accept", web::post().to(accept_match))
        .route("/matches/{id}/decline", web::post().to(decline_match))
        .route("/matches/{id}/counterpart", web::get().to(get_counterpart));
}

/// Map an engine error onto a JSON error response
pub fn error_response(err: &ExchangeError) -> HttpResponse {
    let (status, error) = match err {
        ExchangeError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation failed"),
        ExchangeError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
        ExchangeError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
        ExchangeError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Storage error"),
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }

    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

fn bad_request(error: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 400,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.engine.health_check().await { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Create exchange request endpoint
///
/// POST /api/v1/exchanges
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "userEmail": "string",
///   "desiredBookId": "string",
///   "offeredBookIds": ["string"],
///   "latitude": 52.23,
///   "longitude": 21.01
/// }
/// ```
async fn create_exchange(
    state: web::Data<AppState>,
    req: web::Json<CreateExchangeRequest>,
) -> HttpResponse {
    if let Err(errors) = req.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    match state
        .engine
        .create_exchange_request(
            &req.user_id,
            &req.user_email,
            &req.desired_book_id,
            &req.offered_book_ids,
            req.latitude,
            req.longitude,
        )
        .await
    {
        Ok(request) => HttpResponse::Created().json(request),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/exchanges?userId={userId}&status={status}
async fn list_exchanges(state: web::Data<AppState>, query: web::Query<UserQuery>) -> HttpResponse {
    if let Err(errors) = query.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    let status = match query.status.as_deref().map(str::parse::<ExchangeRequestStatus>) {
        None => None,
        Some(Ok(status)) => Some(status),
        Some(Err(message)) => return bad_request("Invalid status", message),
    };

    match state.engine.list_exchange_requests(&query.user_id, status).await {
        Ok(requests) => HttpResponse::Ok().json(requests),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/exchanges/{id}?userId={userId}
async fn get_exchange(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<UserQuery>,
) -> HttpResponse {
    match state.engine.get_exchange_request(path.into_inner(), &query.user_id).await {
        Ok(request) => HttpResponse::Ok().json(request),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/v1/exchanges/{id}?userId={userId}
///
/// Only the owner may delete; completed requests answer 409.
async fn delete_exchange(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<UserQuery>,
) -> HttpResponse {
    let id = path.into_inner();

    if let Err(e) = state.engine.get_exchange_request(id, &query.user_id).await {
        return error_response(&e);
    }

    match state.engine.delete_exchange_request(id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&e),
    }
}

/// POST /api/v1/exchanges/{id}/matches/find
///
/// Request body:
/// ```json
/// { "userId": "string" }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<FindMatchesRequest>,
) -> HttpResponse {
    if let Err(errors) = req.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    let request_id = path.into_inner();
    tracing::info!("Finding matches for request {} (user {})", request_id, req.user_id);

    match state.engine.find_matching_requests(request_id, &req.user_id).await {
        Ok(candidates) => HttpResponse::Ok().json(FindMatchesResponse {
            total_results: candidates.len(),
            candidates,
        }),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/exchanges/{id}/matches?maxDistance={distance}
///
/// Without `maxDistance` the configured default applies; with neither,
/// every match is returned.
async fn list_matches(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<MatchesQuery>,
) -> HttpResponse {
    let request_id = path.into_inner();

    let result = match query.max_distance.or(state.default_max_distance) {
        Some(threshold) => state.engine.get_matches_distance_filtered(request_id, threshold).await,
        None => state.engine.get_matches(request_id).await,
    };

    match result {
        Ok(matches) => HttpResponse::Ok().json(MatchesResponse {
            total_results: matches.len(),
            matches,
        }),
        Err(e) => error_response(&e),
    }
}

/// POST /api/v1/matches/{id}/accept
///
/// Request body:
/// ```json
/// { "userId": "string", "requestId": "uuid" }
/// ```
async fn accept_match(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<MatchDecisionRequest>,
) -> HttpResponse {
    decide(&state, path.into_inner(), &req, MatchDecision::Accepted).await
}

/// POST /api/v1/matches/{id}/decline
async fn decline_match(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<MatchDecisionRequest>,
) -> HttpResponse {
    decide(&state, path.into_inner(), &req, MatchDecision::Declined).await
}

/// Record a decision for a request owned by the caller
async fn decide(
    state: &AppState,
    match_id: Uuid,
    req: &MatchDecisionRequest,
    decision: MatchDecision,
) -> HttpResponse {
    if let Err(errors) = req.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    // Another user's request is reported as missing
    if let Err(e) = state.engine.get_exchange_request(req.request_id, &req.user_id).await {
        return error_response(&e);
    }

    let result = match decision {
        MatchDecision::Declined => state.engine.decline_match(match_id, req.request_id).await,
        _ => state.engine.accept_match(match_id, req.request_id).await,
    };

    match result {
        Ok(exchange_match) => HttpResponse::Ok().json(exchange_match),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/matches/{id}/counterpart?requestId={requestId}
async fn get_counterpart(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<CounterpartQuery>,
) -> HttpResponse {
    let exchange_match = match state.engine.get_match(path.into_inner()).await {
        Ok(exchange_match) => exchange_match,
        Err(e) => return error_response(&e),
    };

    match state.engine.matched_request(&exchange_match, query.request_id).await {
        Ok(request) => HttpResponse::Ok().json(request),
        Err(e) => error_response(&e),
    }
}
