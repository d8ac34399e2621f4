use regex::Regex;
use std::sync::LazyLock;

/// Statement keywords that must never reach the database, matched as the
/// first token of the query.
static DENYLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(insert|update|delete|drop|alter|create|truncate|replace|exec|execute|merge|grant|revoke|commit|rollback|call|begin)\b",
    )
    .unwrap()
});

/// Read-only statement forms the service is willing to run.
static ALLOWLIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(select|show|describe|explain|with)\b").unwrap());

/// Classifies a SQL string as read-only-safe.
///
/// This is a first-token prefix check, not a parser: it stops a single
/// leading mutating statement, but does not detect multi-statement input
/// behind separators or mutation hidden inside function calls.
pub fn is_safe(query: &str) -> bool {
    !DENYLIST.is_match(query) && ALLOWLIST.is_match(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_read_statements() {
        assert!(is_safe("SELECT * FROM t"));
        assert!(is_safe("  select id from orders where x = 1"));
        assert!(is_safe("WITH recent AS (SELECT 1) SELECT * FROM recent"));
        assert!(is_safe("show tables"));
        assert!(is_safe("DESCRIBE orders"));
        assert!(is_safe("explain select * from t"));
    }

    #[test]
    fn rejects_write_statements() {
        assert!(!is_safe("  insert into t values (1)"));
        assert!(!is_safe("update t set x=1"));
        assert!(!is_safe("DELETE FROM t"));
        assert!(!is_safe("drop table t"));
        assert!(!is_safe("TRUNCATE t"));
        assert!(!is_safe("begin transaction"));
        assert!(!is_safe("grant all on t to someone"));
    }

    #[test]
    fn matches_whole_keywords_only() {
        // "selectx" must not pass as "select", and "inserted" is not "insert"
        assert!(!is_safe("selectx from t"));
        assert!(!is_safe("updates from t"));
        // ...but a denylist keyword embedded in a longer allowed token is fine
        assert!(is_safe("select inserted_at from t"));
    }

    #[test]
    fn rejects_everything_else() {
        assert!(!is_safe(""));
        assert!(!is_safe("   "));
        assert!(!is_safe("hello world"));
        // a leading comment hides the first token from the allowlist
        assert!(!is_safe("-- comment\nselect 1"));
    }

    #[test]
    fn bare_keyword_at_end_of_string_still_matches() {
        assert!(is_safe("select"));
        assert!(!is_safe("insert"));
    }
}
