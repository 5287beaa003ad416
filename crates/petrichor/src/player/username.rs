use std::sync::LazyLock;

use regex::Regex;

pub const MIN_LEN: usize = 4;
pub const MAX_LEN: usize = 16;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9_-]+").expect("username regex"));

/// Lowercases, then drops anything outside `a-z 0-9 _ -`.
pub fn sanitize(u: &str) -> String {
    DISALLOWED.replace_all(&u.to_lowercase(), "").into_owned()
}

/// Length check only; run `sanitize` first.
pub fn is_valid(u: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&u.len())
}
