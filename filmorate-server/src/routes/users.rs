use axum::extract::Path;
use axum::{Extension, Json};
use filmorate_common::{Id, User};
use tracing::debug;

use crate::error::Result;
use crate::State;

pub async fn get_users(Extension(state): Extension<State>) -> Result<Json<Vec<User>>> {
    Ok(Json(state.users().find_all()?))
}

pub async fn post_user(Extension(state): Extension<State>, Json(user): Json<User>) -> Result<Json<User>> {
    debug!(?user, "post_user called");
    Ok(Json(state.users().create(user)?))
}

pub async fn put_user(Extension(state): Extension<State>, Json(user): Json<User>) -> Result<Json<User>> {
    debug!(?user, "put_user called");
    Ok(Json(state.users().update(user)?))
}

pub async fn get_user(Extension(state): Extension<State>, Path(id): Path<Id>) -> Result<Json<User>> {
    Ok(Json(state.users().find_by_id(id)?))
}

pub async fn put_friend(
    Extension(state): Extension<State>,
    Path((id, friend_id)): Path<(Id, Id)>,
) -> Result<Json<User>> {
    Ok(Json(state.users().add_friend(id, friend_id)?))
}

pub async fn delete_friend(
    Extension(state): Extension<State>,
    Path((id, friend_id)): Path<(Id, Id)>,
) -> Result<Json<User>> {
    Ok(Json(state.users().delete_friend(id, friend_id)?))
}

pub async fn get_friends(Extension(state): Extension<State>, Path(id): Path<Id>) -> Result<Json<Vec<User>>> {
    Ok(Json(state.users().friends(id)?))
}

pub async fn get_common_friends(
    Extension(state): Extension<State>,
    Path((id, other_id)): Path<(Id, Id)>,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.users().common_friends(id, other_id)?))
}
