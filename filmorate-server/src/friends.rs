//! Friend graph bookkeeping on the per-user adjacency maps.

use std::collections::BTreeMap;

use filmorate_common::{FriendStatus, Id, User};

/// Ids present in both friend maps, in `a`'s order.
pub fn common_friend_ids(a: &BTreeMap<Id, FriendStatus>, b: &BTreeMap<Id, FriendStatus>) -> Vec<Id> {
    a.keys().filter(|id| b.contains_key(id)).copied().collect()
}

/// Records an unconfirmed edge in both directions.
///
/// Returns `false` and leaves both users untouched if `user` already holds an edge to `friend`.
pub fn link(user: &mut User, friend: &mut User) -> bool {
    if user.friends.contains_key(&friend.id) {
        return false;
    }
    user.friends.insert(friend.id, FriendStatus::Unconfirmed);
    friend.friends.insert(user.id, FriendStatus::Unconfirmed);
    true
}

/// Drops the edge in both directions. Returns whether anything was removed.
pub fn unlink(user: &mut User, friend: &mut User) -> bool {
    let forward = user.friends.remove(&friend.id).is_some();
    let backward = friend.friends.remove(&user.id).is_some();
    forward || backward
}
