pub mod validation;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub use validation::ValidationError;

/// Identifier of every stored entity. Assigned by the store, starting at 1.
pub type Id = i64;

/// Base address of a running filmorate server, e.g. `http://127.0.0.1:8080`.
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
pub struct Url(pub String);

impl Url {
    pub fn join(&self, path: impl AsRef<str>) -> String {
        String::from(self.0.trim_end_matches('/')) + path.as_ref()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    #[serde(default)]
    pub id: Id,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes: BTreeSet<Id>,
    /// Unique by id, ascending.
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<Genre>,
    pub mpa: Mpa,
}

impl Film {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        release_date: NaiveDate,
        duration: i64,
        mpa: Id,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: description.into(),
            release_date,
            duration,
            likes: BTreeSet::new(),
            genres: Vec::new(),
            mpa: Mpa::reference(mpa),
        }
    }

    pub fn with_genres(mut self, ids: impl IntoIterator<Item = Id>) -> Self {
        self.genres = ids.into_iter().map(Genre::reference).collect();
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: Id,
    pub email: String,
    pub login: String,
    /// Falls back to `login` when blank.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    pub birthday: NaiveDate,
    #[serde(default, deserialize_with = "null_as_default")]
    pub friends: BTreeMap<Id, FriendStatus>,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        login: impl Into<String>,
        name: impl Into<String>,
        birthday: NaiveDate,
    ) -> Self {
        Self {
            id: 0,
            email: email.into(),
            login: login.into(),
            name: name.into(),
            birthday,
            friends: BTreeMap::new(),
        }
    }
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
pub struct Genre {
    pub id: Id,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

impl Genre {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
    /// A genre known only by id, as sent by clients. The store fills in the name.
    pub fn reference(id: Id) -> Self {
        Self { id, name: String::new() }
    }
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
pub struct Mpa {
    pub id: Id,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

impl Mpa {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
    pub fn reference(id: Id) -> Self {
        Self { id, name: String::new() }
    }
}

#[derive(Eq, PartialEq, Hash, Clone, Copy, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FriendStatus {
    #[default]
    Unconfirmed,
    Confirmed,
}

impl FriendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendStatus::Unconfirmed => "UNCONFIRMED",
            FriendStatus::Confirmed => "CONFIRMED",
        }
    }
}

impl fmt::Display for FriendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown friend status: {0}")]
pub struct UnknownFriendStatus(pub String);

impl FromStr for FriendStatus {
    type Err = UnknownFriendStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNCONFIRMED" => Ok(FriendStatus::Unconfirmed),
            "CONFIRMED" => Ok(FriendStatus::Confirmed),
            other => Err(UnknownFriendStatus(other.to_string())),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
