//! Entity store contract and its two backings.
//!
//! Every entity kind has its own trait. [`Storage`] bundles one trait object
//! per kind; which backing sits behind them is decided once, by
//! [`Storage::open`], and is invisible to the request handlers.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use filmorate_common::{Film, Genre, Id, Mpa, User, ValidationError};
use thiserror::Error;

use crate::config::{Backend, Config};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Number of films returned by [`FilmStorage::find_best`] when the caller does not say.
pub const DEFAULT_POPULAR_COUNT: usize = 10;

/// Reference genres seeded into every store.
pub const GENRES: &[(Id, &str)] = &[
    (1, "Comedy"),
    (2, "Drama"),
    (3, "Cartoon"),
    (4, "Thriller"),
    (5, "Documentary"),
    (6, "Action"),
];

/// Reference MPA ratings seeded into every store.
pub const MPA_RATINGS: &[(Id, &str)] = &[(1, "G"), (2, "PG"), (3, "PG-13"), (4, "R"), (5, "NC-17")];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} with id = {id} not found")]
    NotFound { entity: &'static str, id: Id },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Operation(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}

impl StorageError {
    pub fn film(id: Id) -> Self {
        StorageError::NotFound { entity: "film", id }
    }
    pub fn user(id: Id) -> Self {
        StorageError::NotFound { entity: "user", id }
    }
    pub fn genre(id: Id) -> Self {
        StorageError::NotFound { entity: "genre", id }
    }
    pub fn mpa(id: Id) -> Self {
        StorageError::NotFound { entity: "mpa", id }
    }
}

pub trait FilmStorage: Send + Sync {
    fn find_all(&self) -> Result<Vec<Film>>;
    /// Validates, assigns the next id and stores the film. Supplied `id` and `likes` are ignored.
    fn add(&self, film: Film) -> Result<Film>;
    /// Replaces the stored film with the same id, keeping its likes.
    fn update(&self, film: Film) -> Result<Film>;
    fn find_by_id(&self, id: Id) -> Result<Film>;
    fn put_like(&self, film_id: Id, user_id: Id) -> Result<Film>;
    fn delete_like(&self, film_id: Id, user_id: Id) -> Result<Film>;
    /// Films by descending like count, ties by ascending id, at most `count` of them.
    fn find_best(&self, count: usize) -> Result<Vec<Film>>;
}

pub trait UserStorage: Send + Sync {
    fn find_all(&self) -> Result<Vec<User>>;
    /// Validates, assigns the next id and stores the user. Supplied `id` and `friends` are ignored.
    fn create(&self, user: User) -> Result<User>;
    /// Replaces the stored user with the same id, keeping its friends.
    fn update(&self, user: User) -> Result<User>;
    fn find_by_id(&self, id: Id) -> Result<User>;
    /// Writes an unconfirmed edge in both directions and returns the updated `user_id`.
    fn add_friend(&self, user_id: Id, friend_id: Id) -> Result<User>;
    /// Removes the edge in both directions and returns the updated `user_id`.
    fn delete_friend(&self, user_id: Id, friend_id: Id) -> Result<User>;
    /// Users that `user_id` has added, ascending by id.
    fn friends(&self, user_id: Id) -> Result<Vec<User>>;
    fn common_friends(&self, user_id: Id, other_id: Id) -> Result<Vec<User>>;
}

pub trait GenreStorage: Send + Sync {
    fn find_all(&self) -> Result<Vec<Genre>>;
    fn find_by_id(&self, id: Id) -> Result<Genre>;
}

pub trait MpaStorage: Send + Sync {
    fn find_all(&self) -> Result<Vec<Mpa>>;
    fn find_by_id(&self, id: Id) -> Result<Mpa>;
}

#[derive(Clone)]
pub struct Storage {
    pub films: Arc<dyn FilmStorage>,
    pub users: Arc<dyn UserStorage>,
    pub genres: Arc<dyn GenreStorage>,
    pub mpa: Arc<dyn MpaStorage>,
}

impl Storage {
    pub fn open(config: &Config) -> Result<Self> {
        match config.storage {
            Backend::Memory => Ok(Self::in_memory()),
            Backend::Sqlite if config.database.as_os_str() == ":memory:" => Self::sqlite_in_memory(),
            Backend::Sqlite => Self::sqlite(&config.database),
        }
    }

    pub fn in_memory() -> Self {
        let db = memory::MemoryDb::new();
        Self {
            films: Arc::new(memory::MemoryFilmStorage::new(db.clone())),
            users: Arc::new(memory::MemoryUserStorage::new(db.clone())),
            genres: Arc::new(memory::MemoryGenreStorage::new(db.clone())),
            mpa: Arc::new(memory::MemoryMpaStorage::new(db)),
        }
    }

    pub fn sqlite(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::from_sqlite(sqlite::SqliteDb::open(path)?))
    }

    pub fn sqlite_in_memory() -> Result<Self> {
        Ok(Self::from_sqlite(sqlite::SqliteDb::open_in_memory()?))
    }

    fn from_sqlite(db: sqlite::SqliteDb) -> Self {
        Self {
            films: Arc::new(sqlite::SqliteFilmStorage::new(db.clone())),
            users: Arc::new(sqlite::SqliteUserStorage::new(db.clone())),
            genres: Arc::new(sqlite::SqliteGenreStorage::new(db.clone())),
            mpa: Arc::new(sqlite::SqliteMpaStorage::new(db)),
        }
    }
}
