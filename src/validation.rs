//! Domain rules shared by every storage backing.
//!
//! Both `normalize_*` functions take ownership and hand back the value the
//! store should persist, so defaults (user name, genre order) are applied in
//! exactly one place.

use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use thiserror::Error;

use crate::{Film, Id, User};

pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Release date of the first film ever screened.
pub static FIRST_FILM_DATE: LazyLock<NaiveDate> =
    LazyLock::new(|| NaiveDate::from_ymd_opt(1895, 12, 28).expect("valid calendar date"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("email pattern compiles"));

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("film name must not be blank")]
    BlankName,

    #[error("film description must be 1 to {} characters long, got {0}", MAX_DESCRIPTION_LEN)]
    DescriptionLength(usize),

    #[error("release date {0} is before {}", *FIRST_FILM_DATE)]
    ReleaseDate(NaiveDate),

    #[error("film duration must be positive, got {0}")]
    Duration(i64),

    #[error("invalid email address: {0:?}")]
    Email(String),

    #[error("login must be non-empty and contain no whitespace: {0:?}")]
    Login(String),

    #[error("birthday {0} is in the future")]
    Birthday(NaiveDate),

    #[error("user {0} cannot befriend themselves")]
    SelfFriendship(Id),
}

pub fn normalize_film(mut film: Film) -> Result<Film, ValidationError> {
    if film.name.trim().is_empty() {
        return Err(ValidationError::BlankName);
    }
    let description_len = film.description.chars().count();
    if description_len == 0 || description_len > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::DescriptionLength(description_len));
    }
    if film.release_date < *FIRST_FILM_DATE {
        return Err(ValidationError::ReleaseDate(film.release_date));
    }
    if film.duration <= 0 {
        return Err(ValidationError::Duration(film.duration));
    }
    film.genres.sort_by_key(|genre| genre.id);
    film.genres.dedup_by_key(|genre| genre.id);
    Ok(film)
}

pub fn normalize_user(mut user: User) -> Result<User, ValidationError> {
    if !EMAIL.is_match(&user.email) {
        return Err(ValidationError::Email(user.email));
    }
    if user.login.is_empty() || user.login.chars().any(char::is_whitespace) {
        return Err(ValidationError::Login(user.login));
    }
    if user.birthday > Utc::now().date_naive() {
        return Err(ValidationError::Birthday(user.birthday));
    }
    if user.name.trim().is_empty() {
        user.name = user.login.clone();
    }
    Ok(user)
}

pub fn check_friendship(user_id: Id, friend_id: Id) -> Result<(), ValidationError> {
    if user_id == friend_id {
        return Err(ValidationError::SelfFriendship(user_id));
    }
    Ok(())
}
