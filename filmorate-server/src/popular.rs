use filmorate_common::Film;

/// Orders films by descending number of likers and keeps the first `count`.
///
/// The sort is stable, so films with equal like counts keep their input order.
pub fn rank_by_likes(films: impl IntoIterator<Item = Film>, count: usize) -> Vec<Film> {
    let mut films: Vec<Film> = films.into_iter().collect();
    films.sort_by(|a, b| b.likes.len().cmp(&a.likes.len()));
    films.truncate(count);
    films
}
