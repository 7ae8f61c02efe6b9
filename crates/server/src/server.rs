use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::sync::Arc;

use crate::{catalog, lending, profile, reviews, sessions::Sessions, user};
use engine::{Engine, User};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub sessions: Arc<Sessions>,
}

/// The authenticated user on public routes, if credentials were sent.
#[derive(Clone, Debug)]
pub struct Caller(pub Option<User>);

async fn check_credentials(
    state: &ServerState,
    header: &Authorization<Basic>,
) -> Result<User, StatusCode> {
    if header.username().is_empty() || header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    state
        .engine
        .authenticate(header.username(), header.password())
        .await
        .map_err(|err| {
            tracing::error!("authentication lookup failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)
}

/// Protected routes: valid Basic credentials are required.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(header)) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let user = check_credentials(&state, &header).await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Public routes: anonymous access is fine, wrong credentials are not.
async fn optional_auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = match auth_header {
        Some(TypedHeader(header)) => Some(check_credentials(&state, &header).await?),
        None => None,
    };

    request.extensions_mut().insert(Caller(user));
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/books/{book_id}/select", post(catalog::select))
        .route("/login", post(user::login))
        .route("/logout", post(user::logout))
        .route("/profile", get(profile::get).patch(profile::update))
        .route("/deposit", post(profile::deposit))
        .route("/borrow/{book_id}", post(lending::borrow))
        .route("/buy/{book_id}", post(lending::buy))
        .route("/return/{history_id}", post(lending::return_book))
        .route("/review/{book_id}", post(reviews::review_new))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    let public = Router::new()
        .route("/", get(catalog::list))
        .route("/books", get(catalog::list))
        .route("/book/{book_id}", get(catalog::details))
        .route("/categories", get(catalog::categories))
        .route("/register", post(user::register))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    protected.merge(public).with_state(state)
}

/// The full HTTP application with fresh browsing sessions.
pub fn app(engine: Engine) -> Router {
    router(ServerState {
        engine: Arc::new(engine),
        sessions: Arc::new(Sessions::default()),
    })
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine)).await
}
