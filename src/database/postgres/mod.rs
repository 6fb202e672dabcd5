mod lessons;
mod users;

pub use lessons::PgLessonRepository;
pub use users::PgUserRepository;

use sqlx::error::DatabaseError as SqlxDatabaseError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

pub(crate) fn is_unique_violation(err: &dyn SqlxDatabaseError) -> bool {
    err.code().as_deref() == Some(UNIQUE_VIOLATION)
}

pub(crate) fn is_foreign_key_violation(err: &dyn SqlxDatabaseError) -> bool {
    err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION)
}

/// Escape LIKE wildcards so user search terms match literally
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
