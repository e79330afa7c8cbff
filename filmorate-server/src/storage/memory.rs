//! Process-local backing: maps from id to entity, lost on restart.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use filmorate_common::validation::{check_friendship, normalize_film, normalize_user};
use filmorate_common::{Film, Genre, Id, Mpa, User};
use tracing::{debug, warn};

use super::{FilmStorage, GenreStorage, MpaStorage, Result, StorageError, UserStorage, GENRES, MPA_RATINGS};
use crate::{friends, popular};

#[derive(Debug, Default)]
struct Tables {
    films: BTreeMap<Id, Film>,
    users: BTreeMap<Id, User>,
    genres: BTreeMap<Id, Genre>,
    mpa: BTreeMap<Id, Mpa>,
    /// Last ids handed out, shared by every handle over the same tables.
    last_film_id: Id,
    last_user_id: Id,
}

impl Tables {
    fn film(&self, id: Id) -> Result<&Film> {
        self.films.get(&id).ok_or(StorageError::film(id))
    }

    fn user(&self, id: Id) -> Result<&User> {
        self.users.get(&id).ok_or(StorageError::user(id))
    }

    fn users(&self, ids: impl IntoIterator<Item = Id>) -> Result<Vec<User>> {
        ids.into_iter().map(|id| self.user(id).cloned()).collect()
    }

    /// Replaces the MPA and genre references with the catalog entries.
    fn resolve(&self, film: &mut Film) -> Result<()> {
        film.mpa = self.mpa.get(&film.mpa.id).cloned().ok_or(StorageError::mpa(film.mpa.id))?;
        for genre in film.genres.iter_mut() {
            *genre = self.genres.get(&genre.id).cloned().ok_or(StorageError::genre(genre.id))?;
        }
        Ok(())
    }
}

/// Shared handle to the in-memory tables.
#[derive(Clone, Debug)]
pub struct MemoryDb(Arc<Mutex<Tables>>);

impl MemoryDb {
    pub fn new() -> Self {
        let tables = Tables {
            genres: GENRES.iter().map(|(id, name)| (*id, Genre::new(*id, *name))).collect(),
            mpa: MPA_RATINGS.iter().map(|(id, name)| (*id, Mpa::new(*id, *name))).collect(),
            ..Tables::default()
        };
        Self(Arc::new(Mutex::new(tables)))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.0.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl Default for MemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MemoryFilmStorage {
    db: MemoryDb,
}

impl MemoryFilmStorage {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

impl FilmStorage for MemoryFilmStorage {
    fn find_all(&self) -> Result<Vec<Film>> {
        let tables = self.db.lock()?;
        debug!(size = tables.films.len(), "Films listed");
        Ok(tables.films.values().cloned().collect())
    }

    fn add(&self, film: Film) -> Result<Film> {
        let mut film = normalize_film(film).map_err(|err| {
            warn!(%err, "Film rejected");
            err
        })?;
        let mut tables = self.db.lock()?;
        tables.resolve(&mut film)?;
        tables.last_film_id += 1;
        film.id = tables.last_film_id;
        film.likes.clear();
        tables.films.insert(film.id, film.clone());
        debug!(film_id = film.id, "Film added");
        Ok(film)
    }

    fn update(&self, film: Film) -> Result<Film> {
        let mut film = normalize_film(film).map_err(|err| {
            warn!(%err, "Film update rejected");
            err
        })?;
        let mut tables = self.db.lock()?;
        film.likes = tables.film(film.id)?.likes.clone();
        tables.resolve(&mut film)?;
        tables.films.insert(film.id, film.clone());
        debug!(film_id = film.id, "Film updated");
        Ok(film)
    }

    fn find_by_id(&self, id: Id) -> Result<Film> {
        self.db.lock()?.film(id).cloned()
    }

    fn put_like(&self, film_id: Id, user_id: Id) -> Result<Film> {
        let mut tables = self.db.lock()?;
        tables.film(film_id)?;
        if !tables.users.contains_key(&user_id) {
            return Err(StorageError::Operation(format!(
                "cannot like film {film_id}: user {user_id} does not exist"
            )));
        }
        let film = tables.films.get_mut(&film_id).ok_or(StorageError::film(film_id))?;
        film.likes.insert(user_id);
        debug!(film_id, user_id, "Like added");
        Ok(film.clone())
    }

    fn delete_like(&self, film_id: Id, user_id: Id) -> Result<Film> {
        let mut tables = self.db.lock()?;
        let film = tables.films.get_mut(&film_id).ok_or(StorageError::film(film_id))?;
        if !film.likes.remove(&user_id) {
            return Err(StorageError::Operation(format!(
                "user {user_id} has not liked film {film_id}"
            )));
        }
        debug!(film_id, user_id, "Like removed");
        Ok(film.clone())
    }

    fn find_best(&self, count: usize) -> Result<Vec<Film>> {
        let tables = self.db.lock()?;
        debug!(count, "Ranking popular films");
        Ok(popular::rank_by_likes(tables.films.values().cloned(), count))
    }
}

pub struct MemoryUserStorage {
    db: MemoryDb,
}

impl MemoryUserStorage {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

impl UserStorage for MemoryUserStorage {
    fn find_all(&self) -> Result<Vec<User>> {
        let tables = self.db.lock()?;
        debug!(size = tables.users.len(), "Users listed");
        Ok(tables.users.values().cloned().collect())
    }

    fn create(&self, user: User) -> Result<User> {
        let mut user = normalize_user(user).map_err(|err| {
            warn!(%err, "User rejected");
            err
        })?;
        let mut tables = self.db.lock()?;
        tables.last_user_id += 1;
        user.id = tables.last_user_id;
        user.friends.clear();
        tables.users.insert(user.id, user.clone());
        debug!(user_id = user.id, "User created");
        Ok(user)
    }

    fn update(&self, user: User) -> Result<User> {
        let mut user = normalize_user(user).map_err(|err| {
            warn!(%err, "User update rejected");
            err
        })?;
        let mut tables = self.db.lock()?;
        user.friends = tables.user(user.id)?.friends.clone();
        tables.users.insert(user.id, user.clone());
        debug!(user_id = user.id, "User updated");
        Ok(user)
    }

    fn find_by_id(&self, id: Id) -> Result<User> {
        self.db.lock()?.user(id).cloned()
    }

    fn add_friend(&self, user_id: Id, friend_id: Id) -> Result<User> {
        let mut tables = self.db.lock()?;
        let mut user = tables.user(user_id)?.clone();
        let mut friend = tables.user(friend_id)?.clone();
        check_friendship(user_id, friend_id)?;
        if !friends::link(&mut user, &mut friend) {
            return Err(StorageError::Conflict(format!(
                "user {user_id} has already added user {friend_id} as a friend"
            )));
        }
        tables.users.insert(friend_id, friend);
        tables.users.insert(user_id, user.clone());
        debug!(user_id, friend_id, "Friend added");
        Ok(user)
    }

    fn delete_friend(&self, user_id: Id, friend_id: Id) -> Result<User> {
        let mut tables = self.db.lock()?;
        let mut user = tables.user(user_id)?.clone();
        let mut friend = tables.user(friend_id)?.clone();
        if !friends::unlink(&mut user, &mut friend) {
            return Err(StorageError::Operation(format!(
                "users {user_id} and {friend_id} are not friends"
            )));
        }
        tables.users.insert(friend_id, friend);
        tables.users.insert(user_id, user.clone());
        debug!(user_id, friend_id, "Friend removed");
        Ok(user)
    }

    fn friends(&self, user_id: Id) -> Result<Vec<User>> {
        let tables = self.db.lock()?;
        let ids: Vec<Id> = tables.user(user_id)?.friends.keys().copied().collect();
        debug!(user_id, size = ids.len(), "Friends listed");
        tables.users(ids)
    }

    fn common_friends(&self, user_id: Id, other_id: Id) -> Result<Vec<User>> {
        let tables = self.db.lock()?;
        let ids = friends::common_friend_ids(&tables.user(user_id)?.friends, &tables.user(other_id)?.friends);
        debug!(user_id, other_id, size = ids.len(), "Common friends listed");
        tables.users(ids)
    }
}

pub struct MemoryGenreStorage {
    db: MemoryDb,
}

impl MemoryGenreStorage {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

impl GenreStorage for MemoryGenreStorage {
    fn find_all(&self) -> Result<Vec<Genre>> {
        Ok(self.db.lock()?.genres.values().cloned().collect())
    }

    fn find_by_id(&self, id: Id) -> Result<Genre> {
        self.db.lock()?.genres.get(&id).cloned().ok_or(StorageError::genre(id))
    }
}

pub struct MemoryMpaStorage {
    db: MemoryDb,
}

impl MemoryMpaStorage {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

impl MpaStorage for MemoryMpaStorage {
    fn find_all(&self) -> Result<Vec<Mpa>> {
        Ok(self.db.lock()?.mpa.values().cloned().collect())
    }

    fn find_by_id(&self, id: Id) -> Result<Mpa> {
        self.db.lock()?.mpa.get(&id).cloned().ok_or(StorageError::mpa(id))
    }
}
