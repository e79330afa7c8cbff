//! Read-only lookups of the genre and MPA reference data.

use axum::extract::Path;
use axum::{Extension, Json};
use filmorate_common::{Genre, Id, Mpa};

use crate::error::Result;
use crate::State;

pub async fn get_genres(Extension(state): Extension<State>) -> Result<Json<Vec<Genre>>> {
    Ok(Json(state.genres().find_all()?))
}

pub async fn get_genre(Extension(state): Extension<State>, Path(id): Path<Id>) -> Result<Json<Genre>> {
    Ok(Json(state.genres().find_by_id(id)?))
}

pub async fn get_ratings(Extension(state): Extension<State>) -> Result<Json<Vec<Mpa>>> {
    Ok(Json(state.mpa().find_all()?))
}

pub async fn get_rating(Extension(state): Extension<State>, Path(id): Path<Id>) -> Result<Json<Mpa>> {
    Ok(Json(state.mpa().find_by_id(id)?))
}
