use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::{net::SocketAddr, sync::Arc};

use crate::{ServerError, expenses, statistics, user};
use engine::{Engine, EngineError};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Resolves Basic credentials into an [`engine::Principal`] request extension.
///
/// Bad or missing credentials are a 401; storage failures surface as 500.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let missing = || EngineError::Unauthenticated("missing credentials".to_string());
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(missing().into());
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(missing().into());
    }

    let principal = state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await
        .inspect_err(|err| {
            if let EngineError::Unauthenticated(_) = err {
                tracing::debug!("authentication rejected: {err}");
            }
        })?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/users", get(user::list))
        .route("/users/me", get(user::me))
        .route("/users/{id}", get(user::get))
        .route("/users/{id}/budget", put(user::update_budget))
        .route("/expenses", post(expenses::create).get(expenses::list))
        .route("/expenses/stats", get(statistics::get_stats))
        .route(
            "/expenses/{id}",
            get(expenses::get)
                .put(expenses::update)
                .delete(expenses::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    Router::new()
        .route("/users/signup", post(user::signup))
        .merge(protected)
        .with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
