//! Idempotent set-membership over ordered reference arrays.
//!
//! Wishlists, watched sets, list movies and list followers are stored as arrays that
//! behave as sets: an id appears at most once and insertion order is kept.

use serde::Serialize;

/// Outcome of a follow toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    Added,
    Removed,
}

/// Appends `id` unless already present. Returns whether the set changed.
pub fn add<T: PartialEq>(set: &mut Vec<T>, id: T) -> bool {
    if set.contains(&id) {
        return false;
    }
    set.push(id);
    true
}

/// Removes the matching reference if present. Returns whether the set changed.
pub fn remove<T: PartialEq>(set: &mut Vec<T>, id: &T) -> bool {
    match set.iter().position(|x| x == id) {
        Some(index) => {
            set.remove(index);
            true
        }
        None => false,
    }
}

/// Present → removed, absent → added
pub fn toggle<T: PartialEq>(set: &mut Vec<T>, id: T) -> Membership {
    if remove(set, &id) {
        Membership::Removed
    } else {
        set.push(id);
        Membership::Added
    }
}
