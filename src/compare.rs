use std::collections::HashSet;
use std::hash::Hash;

/// True when `a` and `b` hold exactly the same members, ignoring order and
/// repeats.
pub fn eq_set<'a, T>(
    a: impl IntoIterator<Item = &'a T>,
    b: impl IntoIterator<Item = &'a T>,
) -> bool
where
    T: Eq + Hash + 'a,
{
    let a: HashSet<&T> = a.into_iter().collect();
    let b: HashSet<&T> = b.into_iter().collect();
    a.len() == b.len() && b.iter().all(|item| a.contains(item))
}
