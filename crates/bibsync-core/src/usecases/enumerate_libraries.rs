//! Library enumeration
//!
//! Produces the ordered set of libraries to synchronize for a user.

use crate::domain::{Group, Library, UserIdentity};

/// Lists the libraries to synchronize for `user`
///
/// The personal library always comes first, followed by one library per
/// group in input order. Pure function; an empty `groups` slice yields only
/// the personal library.
pub fn enumerate_libraries(user: &UserIdentity, groups: &[Group]) -> Vec<Library> {
    let mut libraries = Vec::with_capacity(groups.len() + 1);
    libraries.push(Library::Personal { owner_id: user.id });
    libraries.extend(groups.iter().map(Library::from));
    libraries
}
