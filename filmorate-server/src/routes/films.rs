use axum::extract::{Path, Query};
use axum::{Extension, Json};
use filmorate_common::{Film, Id};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::storage::DEFAULT_POPULAR_COUNT;
use crate::State;

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    count: Option<usize>,
}

pub async fn get_films(Extension(state): Extension<State>) -> Result<Json<Vec<Film>>> {
    Ok(Json(state.films().find_all()?))
}

pub async fn post_film(Extension(state): Extension<State>, Json(film): Json<Film>) -> Result<Json<Film>> {
    debug!(?film, "post_film called");
    Ok(Json(state.films().add(film)?))
}

pub async fn put_film(Extension(state): Extension<State>, Json(film): Json<Film>) -> Result<Json<Film>> {
    debug!(?film, "put_film called");
    Ok(Json(state.films().update(film)?))
}

pub async fn get_film(Extension(state): Extension<State>, Path(id): Path<Id>) -> Result<Json<Film>> {
    Ok(Json(state.films().find_by_id(id)?))
}

pub async fn put_like(
    Extension(state): Extension<State>,
    Path((id, user_id)): Path<(Id, Id)>,
) -> Result<Json<Film>> {
    Ok(Json(state.films().put_like(id, user_id)?))
}

pub async fn delete_like(
    Extension(state): Extension<State>,
    Path((id, user_id)): Path<(Id, Id)>,
) -> Result<Json<Film>> {
    Ok(Json(state.films().delete_like(id, user_id)?))
}

pub async fn get_popular(
    Extension(state): Extension<State>,
    Query(params): Query<PopularParams>,
) -> Result<Json<Vec<Film>>> {
    let count = params.count.unwrap_or(DEFAULT_POPULAR_COUNT);
    Ok(Json(state.films().find_best(count)?))
}
