//! The same behaviour is required from every storage backing, so each test
//! here runs once against the in-memory maps and once against SQLite.

use chrono::NaiveDate;
use filmorate_common::{Film, FriendStatus, Genre, Id, Mpa, User, ValidationError};
use filmorate_server::storage::{Storage, StorageError, DEFAULT_POPULAR_COUNT};

macro_rules! contract_tests {
    ($backing:ident, $open:expr, [$($name:ident),+ $(,)?]) => {
        mod $backing {
            $(
                #[test]
                fn $name() {
                    super::$name($open);
                }
            )+
        }
    };
}

macro_rules! all_contract_tests {
    ($backing:ident, $open:expr) => {
        contract_tests!($backing, $open, [
            release_date_boundary,
            find_by_id_returns_added_film,
            ids_are_monotonic,
            unknown_references_are_not_found,
            update_missing_film_is_not_found,
            update_replaces_film_fields,
            user_login_and_default_name,
            update_missing_user_is_not_found,
            update_replaces_user_fields_and_keeps_friends,
            add_friend_is_symmetric,
            repeated_add_friend_conflicts,
            delete_friend_twice_fails,
            friend_operations_need_existing_users,
            self_friendship_is_rejected,
            common_friends_is_the_intersection,
            find_best_orders_by_like_count,
            find_best_limits_and_breaks_ties_by_id,
            put_like_checks_film_and_user,
            delete_like_removes_only_that_pairing,
            catalog_lookups,
        ]);
    };
}

all_contract_tests!(memory, filmorate_server::storage::Storage::in_memory());
all_contract_tests!(sqlite, filmorate_server::storage::Storage::sqlite_in_memory().expect("open sqlite"));

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn terminator() -> Film {
    Film::new("Terminator", "Full termination", date(1984, 10, 26), 107, 4).with_genres([6, 4])
}

fn avatar() -> Film {
    Film::new("Avatar", "Avatars planet fantasy", date(2009, 12, 18), 162, 3)
}

fn titanic() -> Film {
    Film::new("Titanic", "Titanic is sinking", date(1997, 12, 19), 195, 3).with_genres([2])
}

fn user(login: &str) -> User {
    User::new(format!("{login}@mail.com"), login, "", date(1980, 1, 1))
}

fn users(storage: &Storage, count: usize) -> Vec<Id> {
    (0..count)
        .map(|n| storage.users.create(user(&format!("user{n}"))).unwrap().id)
        .collect()
}

fn friend_ids(users: Vec<User>) -> Vec<Id> {
    users.into_iter().map(|u| u.id).collect()
}

fn film_ids(films: Vec<Film>) -> Vec<Id> {
    films.into_iter().map(|f| f.id).collect()
}

fn release_date_boundary(storage: Storage) {
    let mut early = terminator();
    early.release_date = date(1895, 12, 27);
    let err = storage.films.add(early).unwrap_err();
    assert!(matches!(err, StorageError::Validation(ValidationError::ReleaseDate(_))));

    let mut first = terminator();
    first.release_date = date(1895, 12, 28);
    assert_eq!(storage.films.add(first).unwrap().release_date, date(1895, 12, 28));
}

fn find_by_id_returns_added_film(storage: Storage) {
    let added = storage.films.add(terminator()).unwrap();
    let found = storage.films.find_by_id(added.id).unwrap();
    assert_eq!(found, added);

    let mut expected = terminator();
    expected.id = added.id;
    expected.mpa = Mpa::new(4, "R");
    expected.genres = vec![Genre::new(4, "Thriller"), Genre::new(6, "Action")];
    assert_eq!(found, expected);
}

fn ids_are_monotonic(storage: Storage) {
    let ids = film_ids(vec![
        storage.films.add(terminator()).unwrap(),
        storage.films.add(avatar()).unwrap(),
        storage.films.add(titanic()).unwrap(),
    ]);
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(film_ids(storage.films.find_all().unwrap()).len(), 3);
    assert_eq!(users(&storage, 2), vec![1, 2]);
}

fn unknown_references_are_not_found(storage: Storage) {
    let mut film = avatar();
    film.mpa = Mpa::reference(42);
    assert!(matches!(
        storage.films.add(film).unwrap_err(),
        StorageError::NotFound { entity: "mpa", id: 42 }
    ));
    assert!(matches!(
        storage.films.add(avatar().with_genres([1, 9])).unwrap_err(),
        StorageError::NotFound { entity: "genre", id: 9 }
    ));
    assert!(matches!(storage.films.find_by_id(1).unwrap_err(), StorageError::NotFound { entity: "film", id: 1 }));
    assert!(storage.films.find_all().unwrap().is_empty());
}

fn update_missing_film_is_not_found(storage: Storage) {
    storage.films.add(terminator()).unwrap();
    let mut film = avatar();
    film.id = 10;
    assert!(matches!(storage.films.update(film).unwrap_err(), StorageError::NotFound { entity: "film", id: 10 }));
}

fn update_replaces_film_fields(storage: Storage) {
    let added = storage.films.add(terminator()).unwrap();
    let mut changed = titanic();
    changed.id = added.id;
    let updated = storage.films.update(changed).unwrap();

    assert_eq!(updated.name, "Titanic");
    assert_eq!(updated.duration, 195);
    assert_eq!(updated.mpa, Mpa::new(3, "PG-13"));
    assert_eq!(updated.genres, vec![Genre::new(2, "Drama")]);
    assert_eq!(storage.films.find_by_id(added.id).unwrap(), updated);
}

fn user_login_and_default_name(storage: Storage) {
    let err = storage.users.create(User::new("ab@mail.com", "a b", "", date(1980, 1, 1))).unwrap_err();
    assert!(matches!(err, StorageError::Validation(ValidationError::Login(_))));

    let created = storage.users.create(user("terminator")).unwrap();
    assert_eq!(created.name, "terminator");
    assert_eq!(storage.users.find_by_id(created.id).unwrap(), created);
}

fn update_missing_user_is_not_found(storage: Storage) {
    let mut missing = user("twister");
    missing.id = 10;
    assert!(matches!(storage.users.update(missing).unwrap_err(), StorageError::NotFound { entity: "user", id: 10 }));
}

fn update_replaces_user_fields_and_keeps_friends(storage: Storage) {
    let ids = users(&storage, 2);
    storage.users.add_friend(ids[0], ids[1]).unwrap();

    let mut changed = User::new("galileo@mail.com", "galileo", "Galileo", date(1964, 2, 15));
    changed.id = ids[0];
    let updated = storage.users.update(changed).unwrap();

    assert_eq!(updated.name, "Galileo");
    assert_eq!(updated.email, "galileo@mail.com");
    assert_eq!(updated.friends.keys().copied().collect::<Vec<_>>(), vec![ids[1]]);
    assert_eq!(storage.users.find_by_id(ids[0]).unwrap(), updated);
}

fn add_friend_is_symmetric(storage: Storage) {
    let ids = users(&storage, 2);
    let (a, b) = (ids[0], ids[1]);
    let updated = storage.users.add_friend(a, b).unwrap();
    assert_eq!(updated.friends.get(&b), Some(&FriendStatus::Unconfirmed));

    assert_eq!(friend_ids(storage.users.friends(a).unwrap()), vec![b]);
    assert_eq!(friend_ids(storage.users.friends(b).unwrap()), vec![a]);
}

fn repeated_add_friend_conflicts(storage: Storage) {
    let ids = users(&storage, 2);
    storage.users.add_friend(ids[0], ids[1]).unwrap();
    assert!(matches!(storage.users.add_friend(ids[0], ids[1]).unwrap_err(), StorageError::Conflict(_)));
    assert!(matches!(storage.users.add_friend(ids[1], ids[0]).unwrap_err(), StorageError::Conflict(_)));
    assert_eq!(storage.users.friends(ids[0]).unwrap().len(), 1);
}

fn delete_friend_twice_fails(storage: Storage) {
    let ids = users(&storage, 2);
    storage.users.add_friend(ids[0], ids[1]).unwrap();
    let updated = storage.users.delete_friend(ids[1], ids[0]).unwrap();
    assert!(updated.friends.is_empty());
    assert!(storage.users.friends(ids[0]).unwrap().is_empty());
    assert!(storage.users.friends(ids[1]).unwrap().is_empty());

    assert!(matches!(storage.users.delete_friend(ids[0], ids[1]).unwrap_err(), StorageError::Operation(_)));
}

fn friend_operations_need_existing_users(storage: Storage) {
    let ids = users(&storage, 1);
    let missing = 99;
    for err in [
        storage.users.add_friend(ids[0], missing).unwrap_err(),
        storage.users.add_friend(missing, ids[0]).unwrap_err(),
        storage.users.delete_friend(ids[0], missing).unwrap_err(),
        storage.users.friends(missing).unwrap_err(),
        storage.users.common_friends(ids[0], missing).unwrap_err(),
    ] {
        assert!(matches!(err, StorageError::NotFound { entity: "user", id: 99 }), "{err}");
    }
}

fn self_friendship_is_rejected(storage: Storage) {
    let ids = users(&storage, 1);
    let err = storage.users.add_friend(ids[0], ids[0]).unwrap_err();
    assert!(matches!(err, StorageError::Validation(ValidationError::SelfFriendship(_))));
    assert!(storage.users.friends(ids[0]).unwrap().is_empty());
}

fn common_friends_is_the_intersection(storage: Storage) {
    let ids = users(&storage, 6);
    let (a, b) = (ids[0], ids[1]);
    for friend in [ids[4], ids[2], ids[5]] {
        storage.users.add_friend(a, friend).unwrap();
    }
    for friend in [ids[5], ids[3], ids[4]] {
        storage.users.add_friend(b, friend).unwrap();
    }

    let common = storage.users.common_friends(a, b).unwrap();
    assert_eq!(friend_ids(common), vec![ids[4], ids[5]]);
    assert!(storage.users.common_friends(a, ids[3]).unwrap().is_empty());
    // a and b are friends of every common friend.
    assert_eq!(friend_ids(storage.users.common_friends(ids[4], ids[5]).unwrap()), vec![a, b]);
}

fn find_best_orders_by_like_count(storage: Storage) {
    let likers = users(&storage, 3);
    let once = storage.films.add(terminator()).unwrap().id;
    let thrice = storage.films.add(avatar()).unwrap().id;
    let twice = storage.films.add(titanic()).unwrap().id;
    for (film, count) in [(once, 1), (thrice, 3), (twice, 2)] {
        for liker in &likers[..count] {
            storage.films.put_like(film, *liker).unwrap();
        }
    }

    let best = storage.films.find_best(2).unwrap();
    assert_eq!(film_ids(best.clone()), vec![thrice, twice]);
    assert_eq!(best[0].likes.len(), 3);
    assert_eq!(best[1].likes.len(), 2);
}

fn find_best_limits_and_breaks_ties_by_id(storage: Storage) {
    let liker = users(&storage, 1)[0];
    for _ in 0..12 {
        storage.films.add(avatar()).unwrap();
    }
    storage.films.put_like(7, liker).unwrap();

    let best = film_ids(storage.films.find_best(DEFAULT_POPULAR_COUNT).unwrap());
    assert_eq!(best, vec![7, 1, 2, 3, 4, 5, 6, 8, 9, 10]);
    assert_eq!(storage.films.find_best(100).unwrap().len(), 12);
    assert!(storage.films.find_best(0).unwrap().is_empty());
}

fn put_like_checks_film_and_user(storage: Storage) {
    let liker = users(&storage, 1)[0];
    let film = storage.films.add(titanic()).unwrap().id;

    assert!(matches!(storage.films.put_like(film, 42).unwrap_err(), StorageError::Operation(_)));
    assert!(matches!(
        storage.films.put_like(42, liker).unwrap_err(),
        StorageError::NotFound { entity: "film", id: 42 }
    ));

    storage.films.put_like(film, liker).unwrap();
    let liked = storage.films.put_like(film, liker).unwrap();
    assert_eq!(liked.likes.iter().copied().collect::<Vec<_>>(), vec![liker]);
}

fn delete_like_removes_only_that_pairing(storage: Storage) {
    let likers = users(&storage, 2);
    let first = storage.films.add(terminator()).unwrap().id;
    let second = storage.films.add(avatar()).unwrap().id;

    assert!(matches!(storage.films.delete_like(first, likers[0]).unwrap_err(), StorageError::Operation(_)));

    storage.films.put_like(first, likers[0]).unwrap();
    storage.films.put_like(first, likers[1]).unwrap();
    storage.films.put_like(second, likers[0]).unwrap();

    let after = storage.films.delete_like(first, likers[0]).unwrap();
    assert_eq!(after.likes.iter().copied().collect::<Vec<_>>(), vec![likers[1]]);
    assert!(storage.films.find_by_id(second).unwrap().likes.contains(&likers[0]));
    assert!(matches!(storage.films.delete_like(first, likers[0]).unwrap_err(), StorageError::Operation(_)));
}

fn catalog_lookups(storage: Storage) {
    let genres = storage.genres.find_all().unwrap();
    assert_eq!(genres.len(), 6);
    assert_eq!(genres[0], Genre::new(1, "Comedy"));
    assert_eq!(storage.genres.find_by_id(4).unwrap(), Genre::new(4, "Thriller"));
    assert!(matches!(storage.genres.find_by_id(7).unwrap_err(), StorageError::NotFound { entity: "genre", id: 7 }));

    let ratings = storage.mpa.find_all().unwrap();
    assert_eq!(ratings.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(), vec!["G", "PG", "PG-13", "R", "NC-17"]);
    assert_eq!(storage.mpa.find_by_id(5).unwrap(), Mpa::new(5, "NC-17"));
    assert!(matches!(storage.mpa.find_by_id(0).unwrap_err(), StorageError::NotFound { entity: "mpa", id: 0 }));
}
