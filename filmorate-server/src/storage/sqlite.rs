//! Relational backing on a single SQLite connection.
//!
//! Writes that touch more than one table run in one transaction; returning
//! early with an error drops the transaction, which rolls it back.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use filmorate_common::validation::{check_friendship, normalize_film, normalize_user};
use filmorate_common::{Film, FriendStatus, Genre, Id, Mpa, User};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use super::{FilmStorage, GenreStorage, MpaStorage, Result, StorageError, UserStorage, GENRES, MPA_RATINGS};

const SCHEMA: &str = include_str!("schema.sql");

const FILM_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM films WHERE film_id = ?1)";
const USER_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1)";
const GENRE_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM genres WHERE genre_id = ?1)";
const MPA_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM mpa WHERE mpa_id = ?1)";

/// Shared handle to the database connection.
#[derive(Clone)]
pub struct SqliteDb {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening SQLite database");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        {
            let mut genres = conn.prepare("INSERT OR IGNORE INTO genres (genre_id, genre_name) VALUES (?1, ?2)")?;
            for (id, name) in GENRES {
                genres.execute(params![id, name])?;
            }
            let mut ratings = conn.prepare("INSERT OR IGNORE INTO mpa (mpa_id, mpa_name) VALUES (?1, ?2)")?;
            for (id, name) in MPA_RATINGS {
                ratings.execute(params![id, name])?;
            }
        }
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn exists(conn: &Connection, sql: &str, id: Id) -> Result<bool> {
    Ok(conn.query_row(sql, [id], |row| row.get(0))?)
}

fn ids(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Id>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt.query_map(args, |row| row.get(0))?.collect::<rusqlite::Result<Vec<Id>>>()?;
    Ok(ids)
}

fn next_id(conn: &Connection, table: &str, column: &str) -> Result<Id> {
    let sql = format!("SELECT COALESCE(MAX({column}), 0) + 1 FROM {table}");
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

fn load_film(conn: &Connection, id: Id) -> Result<Film> {
    let mut film = conn
        .query_row(
            "SELECT film_id, film_name, description, release_date, duration FROM films WHERE film_id = ?1",
            [id],
            |row| {
                Ok(Film {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    release_date: row.get(3)?,
                    duration: row.get(4)?,
                    likes: BTreeSet::new(),
                    genres: Vec::new(),
                    mpa: Mpa::default(),
                })
            },
        )
        .optional()?
        .ok_or(StorageError::film(id))?;

    film.likes = ids(conn, "SELECT user_id FROM likes WHERE film_id = ?1", [id])?.into_iter().collect();

    let mut genres = conn.prepare(
        "SELECT g.genre_id, g.genre_name FROM film_genres fg \
         JOIN genres g ON fg.genre_id = g.genre_id \
         WHERE fg.film_id = ?1 ORDER BY g.genre_id",
    )?;
    film.genres = genres
        .query_map([id], |row| Ok(Genre::new(row.get(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<_>>()?;

    film.mpa = conn.query_row(
        "SELECT m.mpa_id, m.mpa_name FROM film_mpa fm JOIN mpa m ON fm.mpa_id = m.mpa_id WHERE fm.film_id = ?1",
        [id],
        |row| Ok(Mpa::new(row.get(0)?, row.get::<_, String>(1)?)),
    )?;
    Ok(film)
}

fn link_mpa(conn: &Connection, film_id: Id, mpa_id: Id) -> Result<()> {
    if !exists(conn, MPA_EXISTS, mpa_id)? {
        return Err(StorageError::mpa(mpa_id));
    }
    conn.execute(
        "INSERT OR REPLACE INTO film_mpa (film_id, mpa_id) VALUES (?1, ?2)",
        params![film_id, mpa_id],
    )?;
    Ok(())
}

fn link_genres(conn: &Connection, film_id: Id, genres: &[Genre]) -> Result<()> {
    let mut insert = conn.prepare("INSERT INTO film_genres (film_id, genre_id) VALUES (?1, ?2)")?;
    for genre in genres {
        if !exists(conn, GENRE_EXISTS, genre.id)? {
            return Err(StorageError::genre(genre.id));
        }
        insert.execute(params![film_id, genre.id])?;
    }
    Ok(())
}

fn friend_status(row: &Row<'_>, idx: usize) -> rusqlite::Result<FriendStatus> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn load_user(conn: &Connection, id: Id) -> Result<User> {
    let mut user = conn
        .query_row(
            "SELECT user_id, user_email, user_login, user_name, birthday FROM users WHERE user_id = ?1",
            [id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    login: row.get(2)?,
                    name: row.get(3)?,
                    birthday: row.get(4)?,
                    friends: BTreeMap::new(),
                })
            },
        )
        .optional()?
        .ok_or(StorageError::user(id))?;

    let mut friends = conn.prepare("SELECT friend_id, friend_status FROM friends WHERE user_id = ?1")?;
    user.friends = friends
        .query_map([id], |row| Ok((row.get(0)?, friend_status(row, 1)?)))?
        .collect::<rusqlite::Result<_>>()?;
    Ok(user)
}

fn load_users(conn: &Connection, ids: Vec<Id>) -> Result<Vec<User>> {
    ids.into_iter().map(|id| load_user(conn, id)).collect()
}

fn require_user(conn: &Connection, id: Id) -> Result<()> {
    if exists(conn, USER_EXISTS, id)? {
        Ok(())
    } else {
        Err(StorageError::user(id))
    }
}

pub struct SqliteFilmStorage {
    db: SqliteDb,
}

impl SqliteFilmStorage {
    pub fn new(db: SqliteDb) -> Self {
        Self { db }
    }
}

impl FilmStorage for SqliteFilmStorage {
    fn find_all(&self) -> Result<Vec<Film>> {
        let conn = self.db.lock()?;
        let films = ids(&conn, "SELECT film_id FROM films ORDER BY film_id", [])?
            .into_iter()
            .map(|id| load_film(&conn, id))
            .collect::<Result<Vec<_>>>()?;
        debug!(size = films.len(), "Films listed");
        Ok(films)
    }

    fn add(&self, film: Film) -> Result<Film> {
        let film = normalize_film(film).map_err(|err| {
            warn!(%err, "Film rejected");
            err
        })?;
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;
        let id = next_id(&tx, "films", "film_id")?;
        tx.execute(
            "INSERT INTO films (film_id, film_name, description, release_date, duration) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, film.name, film.description, film.release_date, film.duration],
        )?;
        link_mpa(&tx, id, film.mpa.id)?;
        link_genres(&tx, id, &film.genres)?;
        let film = load_film(&tx, id)?;
        tx.commit()?;
        debug!(film_id = id, "Film added");
        Ok(film)
    }

    fn update(&self, film: Film) -> Result<Film> {
        let film = normalize_film(film).map_err(|err| {
            warn!(%err, "Film update rejected");
            err
        })?;
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;
        let updated = tx.execute(
            "UPDATE films SET film_name = ?1, description = ?2, release_date = ?3, duration = ?4 WHERE film_id = ?5",
            params![film.name, film.description, film.release_date, film.duration, film.id],
        )?;
        if updated == 0 {
            return Err(StorageError::film(film.id));
        }
        link_mpa(&tx, film.id, film.mpa.id)?;
        tx.execute("DELETE FROM film_genres WHERE film_id = ?1", [film.id])?;
        link_genres(&tx, film.id, &film.genres)?;
        let film = load_film(&tx, film.id)?;
        tx.commit()?;
        debug!(film_id = film.id, "Film updated");
        Ok(film)
    }

    fn find_by_id(&self, id: Id) -> Result<Film> {
        let conn = self.db.lock()?;
        load_film(&conn, id)
    }

    fn put_like(&self, film_id: Id, user_id: Id) -> Result<Film> {
        let conn = self.db.lock()?;
        if !exists(&conn, FILM_EXISTS, film_id)? {
            return Err(StorageError::film(film_id));
        }
        if !exists(&conn, USER_EXISTS, user_id)? {
            return Err(StorageError::Operation(format!(
                "cannot like film {film_id}: user {user_id} does not exist"
            )));
        }
        conn.execute(
            "INSERT OR IGNORE INTO likes (film_id, user_id) VALUES (?1, ?2)",
            params![film_id, user_id],
        )?;
        debug!(film_id, user_id, "Like added");
        load_film(&conn, film_id)
    }

    fn delete_like(&self, film_id: Id, user_id: Id) -> Result<Film> {
        let conn = self.db.lock()?;
        if !exists(&conn, FILM_EXISTS, film_id)? {
            return Err(StorageError::film(film_id));
        }
        let deleted = conn.execute(
            "DELETE FROM likes WHERE film_id = ?1 AND user_id = ?2",
            params![film_id, user_id],
        )?;
        if deleted == 0 {
            return Err(StorageError::Operation(format!(
                "user {user_id} has not liked film {film_id}"
            )));
        }
        debug!(film_id, user_id, "Like removed");
        load_film(&conn, film_id)
    }

    fn find_best(&self, count: usize) -> Result<Vec<Film>> {
        let conn = self.db.lock()?;
        debug!(count, "Ranking popular films");
        let limit = i64::try_from(count).unwrap_or(i64::MAX);
        ids(
            &conn,
            "SELECT f.film_id FROM films f LEFT JOIN likes l ON f.film_id = l.film_id \
             GROUP BY f.film_id ORDER BY COUNT(l.user_id) DESC, f.film_id LIMIT ?1",
            [limit],
        )?
        .into_iter()
        .map(|id| load_film(&conn, id))
        .collect()
    }
}

pub struct SqliteUserStorage {
    db: SqliteDb,
}

impl SqliteUserStorage {
    pub fn new(db: SqliteDb) -> Self {
        Self { db }
    }
}

impl UserStorage for SqliteUserStorage {
    fn find_all(&self) -> Result<Vec<User>> {
        let conn = self.db.lock()?;
        let users = load_users(&conn, ids(&conn, "SELECT user_id FROM users ORDER BY user_id", [])?)?;
        debug!(size = users.len(), "Users listed");
        Ok(users)
    }

    fn create(&self, user: User) -> Result<User> {
        let user = normalize_user(user).map_err(|err| {
            warn!(%err, "User rejected");
            err
        })?;
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;
        let id = next_id(&tx, "users", "user_id")?;
        tx.execute(
            "INSERT INTO users (user_id, user_email, user_login, user_name, birthday) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, user.email, user.login, user.name, user.birthday],
        )?;
        let user = load_user(&tx, id)?;
        tx.commit()?;
        debug!(user_id = id, "User created");
        Ok(user)
    }

    fn update(&self, user: User) -> Result<User> {
        let user = normalize_user(user).map_err(|err| {
            warn!(%err, "User update rejected");
            err
        })?;
        let conn = self.db.lock()?;
        let updated = conn.execute(
            "UPDATE users SET user_email = ?1, user_login = ?2, user_name = ?3, birthday = ?4 WHERE user_id = ?5",
            params![user.email, user.login, user.name, user.birthday, user.id],
        )?;
        if updated == 0 {
            return Err(StorageError::user(user.id));
        }
        debug!(user_id = user.id, "User updated");
        load_user(&conn, user.id)
    }

    fn find_by_id(&self, id: Id) -> Result<User> {
        let conn = self.db.lock()?;
        load_user(&conn, id)
    }

    fn add_friend(&self, user_id: Id, friend_id: Id) -> Result<User> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;
        require_user(&tx, user_id)?;
        require_user(&tx, friend_id)?;
        check_friendship(user_id, friend_id)?;
        let existing: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM friends WHERE user_id = ?1 AND friend_id = ?2)",
            params![user_id, friend_id],
            |row| row.get(0),
        )?;
        if existing {
            return Err(StorageError::Conflict(format!(
                "user {user_id} has already added user {friend_id} as a friend"
            )));
        }
        let status = FriendStatus::Unconfirmed.as_str();
        let mut insert = tx.prepare("INSERT INTO friends (user_id, friend_id, friend_status) VALUES (?1, ?2, ?3)")?;
        insert.execute(params![user_id, friend_id, status])?;
        insert.execute(params![friend_id, user_id, status])?;
        drop(insert);
        let user = load_user(&tx, user_id)?;
        tx.commit()?;
        debug!(user_id, friend_id, "Friend added");
        Ok(user)
    }

    fn delete_friend(&self, user_id: Id, friend_id: Id) -> Result<User> {
        let conn = self.db.lock()?;
        require_user(&conn, user_id)?;
        require_user(&conn, friend_id)?;
        let deleted = conn.execute(
            "DELETE FROM friends WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)",
            params![user_id, friend_id],
        )?;
        if deleted == 0 {
            return Err(StorageError::Operation(format!(
                "users {user_id} and {friend_id} are not friends"
            )));
        }
        debug!(user_id, friend_id, "Friend removed");
        load_user(&conn, user_id)
    }

    fn friends(&self, user_id: Id) -> Result<Vec<User>> {
        let conn = self.db.lock()?;
        require_user(&conn, user_id)?;
        let ids = ids(&conn, "SELECT friend_id FROM friends WHERE user_id = ?1 ORDER BY friend_id", [user_id])?;
        debug!(user_id, size = ids.len(), "Friends listed");
        load_users(&conn, ids)
    }

    fn common_friends(&self, user_id: Id, other_id: Id) -> Result<Vec<User>> {
        let conn = self.db.lock()?;
        require_user(&conn, user_id)?;
        require_user(&conn, other_id)?;
        let ids = ids(
            &conn,
            "SELECT f.friend_id FROM friends f \
             JOIN friends fw ON f.friend_id = fw.friend_id \
             WHERE f.user_id = ?1 AND fw.user_id = ?2 ORDER BY f.friend_id",
            params![user_id, other_id],
        )?;
        debug!(user_id, other_id, size = ids.len(), "Common friends listed");
        load_users(&conn, ids)
    }
}

pub struct SqliteGenreStorage {
    db: SqliteDb,
}

impl SqliteGenreStorage {
    pub fn new(db: SqliteDb) -> Self {
        Self { db }
    }
}

impl GenreStorage for SqliteGenreStorage {
    fn find_all(&self) -> Result<Vec<Genre>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare("SELECT genre_id, genre_name FROM genres ORDER BY genre_id")?;
        let genres = stmt
            .query_map([], |row| Ok(Genre::new(row.get(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(genres)
    }

    fn find_by_id(&self, id: Id) -> Result<Genre> {
        self.db
            .lock()?
            .query_row("SELECT genre_id, genre_name FROM genres WHERE genre_id = ?1", [id], |row| {
                Ok(Genre::new(row.get(0)?, row.get::<_, String>(1)?))
            })
            .optional()?
            .ok_or(StorageError::genre(id))
    }
}

pub struct SqliteMpaStorage {
    db: SqliteDb,
}

impl SqliteMpaStorage {
    pub fn new(db: SqliteDb) -> Self {
        Self { db }
    }
}

impl MpaStorage for SqliteMpaStorage {
    fn find_all(&self) -> Result<Vec<Mpa>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare("SELECT mpa_id, mpa_name FROM mpa ORDER BY mpa_id")?;
        let ratings = stmt
            .query_map([], |row| Ok(Mpa::new(row.get(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(ratings)
    }

    fn find_by_id(&self, id: Id) -> Result<Mpa> {
        self.db
            .lock()?
            .query_row("SELECT mpa_id, mpa_name FROM mpa WHERE mpa_id = ?1", [id], |row| {
                Ok(Mpa::new(row.get(0)?, row.get::<_, String>(1)?))
            })
            .optional()?
            .ok_or(StorageError::mpa(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn film() -> Film {
        Film::new("Stalker", "The Zone", NaiveDate::from_ymd_opt(1979, 5, 25).unwrap(), 161, 3).with_genres([2])
    }

    #[test]
    fn failed_composite_insert_is_rolled_back() {
        let db = SqliteDb::open_in_memory().unwrap();
        let films = SqliteFilmStorage::new(db.clone());

        let err = films.add(film().with_genres([2, 77])).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { entity: "genre", id: 77 }));

        let conn = db.lock().unwrap();
        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM films", [], |row| row.get(0)).unwrap();
        let links: i64 = conn.query_row("SELECT COUNT(*) FROM film_mpa", [], |row| row.get(0)).unwrap();
        assert_eq!((rows, links), (0, 0));
        drop(conn);

        assert_eq!(films.add(film()).unwrap().id, 1);
    }

    #[test]
    fn failed_update_keeps_previous_genres() {
        let db = SqliteDb::open_in_memory().unwrap();
        let films = SqliteFilmStorage::new(db);
        let stored = films.add(film().with_genres([1, 2])).unwrap();

        let mut changed = stored.clone();
        changed.name = "Сталкер".into();
        changed.genres = vec![Genre::reference(3), Genre::reference(99)];
        assert!(films.update(changed).is_err());

        assert_eq!(films.find_by_id(stored.id).unwrap(), stored);
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filmorate.db");
        {
            let films = SqliteFilmStorage::new(SqliteDb::open(&path).unwrap());
            films.add(film()).unwrap();
            films.add(film()).unwrap();
        }
        let films = SqliteFilmStorage::new(SqliteDb::open(&path).unwrap());
        assert_eq!(films.find_all().unwrap().len(), 2);
        assert_eq!(films.add(film()).unwrap().id, 3);
        assert_eq!(
            SqliteGenreStorage::new(SqliteDb::open(&path).unwrap()).find_all().unwrap().len(),
            GENRES.len()
        );
    }

    #[test]
    fn friend_rows_are_written_both_ways() {
        let db = SqliteDb::open_in_memory().unwrap();
        let users = SqliteUserStorage::new(db.clone());
        let birthday = NaiveDate::from_ymd_opt(1932, 4, 4).unwrap();
        let a = users.create(User::new("andrei@mosfilm.su", "tarkovsky", "", birthday)).unwrap();
        let b = users.create(User::new("anatoly@mosfilm.su", "solonitsyn", "", birthday)).unwrap();
        users.add_friend(a.id, b.id).unwrap();

        let conn = db.lock().unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM friends WHERE friend_status = 'UNCONFIRMED'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }
}
