use axum::{
    Router,
    routing::{get, post},
};
use engine::{KeyValueStore, LocalAuthority};

use crate::goals;

pub struct ServerState<S> {
    pub authority: LocalAuthority<S>,
}

impl<S> Clone for ServerState<S> {
    fn clone(&self) -> Self {
        Self {
            authority: self.authority.clone(),
        }
    }
}

impl<S> ServerState<S> {
    pub fn new(authority: LocalAuthority<S>) -> Self {
        Self { authority }
    }
}

pub fn router<S: KeyValueStore + 'static>(state: ServerState<S>) -> Router {
    Router::new()
        .route("/goals/{goal_id}", get(goals::get::<S>))
        .route("/goals/{goal_id}/sync", post(goals::sync::<S>))
        .with_state(state)
}

pub async fn run_with_listener<S: KeyValueStore + 'static>(
    authority: LocalAuthority<S>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Savings authority listening on {}", addr);

    axum::serve(listener, router(ServerState::new(authority))).await
}

pub fn spawn_with_listener<S: KeyValueStore + 'static>(
    authority: LocalAuthority<S>,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(authority, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
