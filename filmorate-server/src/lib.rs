//! HTTP backend for films, users, likes and friendships.
//!
//! Request handlers live in [`routes`] and only talk to the storage traits in
//! [`storage`]. Which backing answers them (in-memory maps or SQLite tables)
//! is chosen once when the [`State`] is built.

pub mod config;
pub mod error;
pub mod friends;
pub mod popular;
pub mod routes;
pub mod storage;

use std::net::TcpListener;

use anyhow::Context;
use axum::Router;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::storage::{FilmStorage, GenreStorage, MpaStorage, Storage, UserStorage};

#[derive(Clone)]
pub struct State {
    storage: Storage,
}

impl State {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
    pub fn films(&self) -> &dyn FilmStorage {
        self.storage.films.as_ref()
    }
    pub fn users(&self) -> &dyn UserStorage {
        self.storage.users.as_ref()
    }
    pub fn genres(&self) -> &dyn GenreStorage {
        self.storage.genres.as_ref()
    }
    pub fn mpa(&self) -> &dyn MpaStorage {
        self.storage.mpa.as_ref()
    }
}

pub fn app(state: State) -> Router {
    routes::router(state)
}

/// Serves the API on an already bound listener until the server stops.
pub async fn serve(listener: TcpListener, state: State) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;
    info!(%addr, "Listening");
    axum::Server::from_tcp(listener)
        .with_context(|| format!("Error serving on {addr}"))?
        .serve(app(state).into_make_service())
        .await?;
    Ok(())
}

pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("filmorate_server=info")),
        )
        .with_target(false)
        .compact()
        .init();
}
