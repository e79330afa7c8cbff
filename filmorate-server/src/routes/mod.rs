pub mod catalog;
pub mod films;
pub mod users;

use axum::routing::{get, put};
use axum::{Extension, Router};

use crate::State;

pub fn router(state: State) -> Router {
    Router::new()
        .route("/films", get(films::get_films).post(films::post_film).put(films::put_film))
        .route("/films/popular", get(films::get_popular))
        .route("/films/:id", get(films::get_film))
        .route("/films/:id/like/:user_id", put(films::put_like).delete(films::delete_like))
        .route("/users", get(users::get_users).post(users::post_user).put(users::put_user))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/friends", get(users::get_friends))
        .route("/users/:id/friends/:friend_id", put(users::put_friend).delete(users::delete_friend))
        .route("/users/:id/friends/common/:other_id", get(users::get_common_friends))
        .route("/genres", get(catalog::get_genres))
        .route("/genres/:id", get(catalog::get_genre))
        .route("/mpa", get(catalog::get_ratings))
        .route("/mpa/:id", get(catalog::get_rating))
        .layer(Extension(state))
}
