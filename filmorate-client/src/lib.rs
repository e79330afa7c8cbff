use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A request the server answered with a non-success status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

async fn json<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body["error"].as_str().map(String::from))
        .unwrap_or_default();
    Err(ApiError { status, message }.into())
}

pub mod client {
    use anyhow::Result;
    use filmorate_common::{Film, Genre, Id, Mpa, Url, User};
    use reqwest::Client;

    use crate::json;

    pub async fn get_films(client: &Client, url: &Url) -> Result<Vec<Film>> {
        json(client.get(url.join("/films")).send().await?).await
    }
    pub async fn add_film(client: &Client, url: &Url, film: &Film) -> Result<Film> {
        json(client.post(url.join("/films")).json(film).send().await?).await
    }
    pub async fn update_film(client: &Client, url: &Url, film: &Film) -> Result<Film> {
        json(client.put(url.join("/films")).json(film).send().await?).await
    }
    pub async fn get_film(client: &Client, url: &Url, id: Id) -> Result<Film> {
        json(client.get(url.join(format!("/films/{id}"))).send().await?).await
    }
    pub async fn put_like(client: &Client, url: &Url, film_id: Id, user_id: Id) -> Result<Film> {
        json(client.put(url.join(format!("/films/{film_id}/like/{user_id}"))).send().await?).await
    }
    pub async fn delete_like(client: &Client, url: &Url, film_id: Id, user_id: Id) -> Result<Film> {
        json(client.delete(url.join(format!("/films/{film_id}/like/{user_id}"))).send().await?).await
    }
    /// Most liked films first. The server picks the default size when `count` is `None`.
    pub async fn get_popular(client: &Client, url: &Url, count: Option<usize>) -> Result<Vec<Film>> {
        let mut request = client.get(url.join("/films/popular"));
        if let Some(count) = count {
            request = request.query(&[("count", count)]);
        }
        json(request.send().await?).await
    }

    pub async fn get_users(client: &Client, url: &Url) -> Result<Vec<User>> {
        json(client.get(url.join("/users")).send().await?).await
    }
    pub async fn create_user(client: &Client, url: &Url, user: &User) -> Result<User> {
        json(client.post(url.join("/users")).json(user).send().await?).await
    }
    pub async fn update_user(client: &Client, url: &Url, user: &User) -> Result<User> {
        json(client.put(url.join("/users")).json(user).send().await?).await
    }
    pub async fn get_user(client: &Client, url: &Url, id: Id) -> Result<User> {
        json(client.get(url.join(format!("/users/{id}"))).send().await?).await
    }
    pub async fn add_friend(client: &Client, url: &Url, id: Id, friend_id: Id) -> Result<User> {
        json(client.put(url.join(format!("/users/{id}/friends/{friend_id}"))).send().await?).await
    }
    pub async fn delete_friend(client: &Client, url: &Url, id: Id, friend_id: Id) -> Result<User> {
        json(client.delete(url.join(format!("/users/{id}/friends/{friend_id}"))).send().await?).await
    }
    pub async fn get_friends(client: &Client, url: &Url, id: Id) -> Result<Vec<User>> {
        json(client.get(url.join(format!("/users/{id}/friends"))).send().await?).await
    }
    pub async fn get_common_friends(client: &Client, url: &Url, id: Id, other_id: Id) -> Result<Vec<User>> {
        json(client.get(url.join(format!("/users/{id}/friends/common/{other_id}"))).send().await?).await
    }

    pub async fn get_genres(client: &Client, url: &Url) -> Result<Vec<Genre>> {
        json(client.get(url.join("/genres")).send().await?).await
    }
    pub async fn get_genre(client: &Client, url: &Url, id: Id) -> Result<Genre> {
        json(client.get(url.join(format!("/genres/{id}"))).send().await?).await
    }
    pub async fn get_ratings(client: &Client, url: &Url) -> Result<Vec<Mpa>> {
        json(client.get(url.join("/mpa")).send().await?).await
    }
    pub async fn get_rating(client: &Client, url: &Url, id: Id) -> Result<Mpa> {
        json(client.get(url.join(format!("/mpa/{id}"))).send().await?).await
    }
}
