// src/server/mod.rs
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::{reject::Rejection, reply::Reply, Filter};

use crate::company::Company;
use crate::index::SearchOptions;
use crate::query::{DatasetStatus, QueryService};
use crate::refresh::{RefreshPhase, RefreshScheduler, RefreshStats};

/// Everything the handlers need; cheap to clone into each route.
#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
    pub scheduler: Arc<RefreshScheduler>,
    pub search_limit: usize,
}

/// `{ "ok": 1, "data": ... }` on success, `{ "ok": 0, "error": ... }` otherwise.
#[derive(Serialize)]
struct Envelope<T: Serialize> {
    ok: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    fn data(data: T) -> Self {
        Self {
            ok: 1,
            data: Some(data),
            error: None,
        }
    }
}

impl Envelope<()> {
    fn ok() -> Self {
        Self {
            ok: 1,
            data: None,
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: 0,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Serialize)]
struct StatusBody {
    phase: RefreshPhase,
    stats: RefreshStats,
    dataset: Option<DatasetStatus>,
}

/// All routes, with unmatched requests answered in the same envelope.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path::end().and(warp::get()).and_then(health_check);

    let company = warp::path!("company" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_company);

    let search = warp::path!("search")
        .and(warp::get())
        .and(warp::query::<SearchParams>())
        .and(with_state(state.clone()))
        .and_then(search_companies);

    let status = warp::path!("status")
        .and(warp::get())
        .and(with_state(state))
        .and_then(get_status);

    health
        .or(company)
        .or(search)
        .or(status)
        .recover(handle_rejection)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&Envelope::ok()))
}

async fn get_company(code: String, state: AppState) -> Result<impl Reply, Rejection> {
    let reply = match state.query.lookup(&code) {
        Some(company) => warp::reply::with_status(
            warp::reply::json(&Envelope::data(&*company)),
            StatusCode::OK,
        ),
        None => {
            debug!(code = %code, "company not found");
            warp::reply::with_status(
                warp::reply::json(&Envelope::error(format!("no company with code {code}"))),
                StatusCode::NOT_FOUND,
            )
        }
    };
    Ok(reply)
}

async fn search_companies(params: SearchParams, state: AppState) -> Result<impl Reply, Rejection> {
    let text = params.q.unwrap_or_default();
    let options = SearchOptions {
        limit: state.search_limit,
        ..Default::default()
    };
    let hits = state.query.search(&text, &options);
    debug!(query = %text, hits = hits.len(), "search");
    let companies: Vec<&Company> = hits.iter().map(|c| c.as_ref()).collect();
    Ok(warp::reply::json(&Envelope::data(companies)))
}

async fn get_status(state: AppState) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&Envelope::data(StatusBody {
        phase: state.scheduler.phase(),
        stats: state.scheduler.stats(),
        dataset: state.query.status(),
    })))
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else {
        warn!(rejection = ?err, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&Envelope::error(message)),
        status,
    ))
}
