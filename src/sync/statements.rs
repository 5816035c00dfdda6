//! Naive splitting of schema files into executable statements.

/// Keywords that mark a statement as data-modifying. Matched as substrings of
/// the uppercased statement.
const DATA_KEYWORDS: &[&str] = &["INSERT", "UPDATE", "DELETE"];

/// Splits `sql` on `;`, trims each piece and drops empty pieces and pieces
/// starting with `--`.
///
/// There is no awareness of quoting, so a `;` inside a string literal or a
/// routine body splits the statement.
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !stmt.starts_with("--"))
        .collect()
}

/// True when the statement mentions a data-modifying keyword anywhere,
/// including inside identifiers (`deleted_at` counts).
pub fn is_data_mutation(statement: &str) -> bool {
    let upper = statement.to_uppercase();
    DATA_KEYWORDS.iter().any(|keyword| upper.contains(keyword))
}

/// True for execution errors meaning the object is already in place.
pub fn is_already_exists(err: &anyhow::Error) -> bool {
    format!("{:#}", err).contains("already exists")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_split_drops_empty_and_comment_pieces() {
        let sql = "CREATE TABLE a (id INT);\n-- note;\n\n;\n  CREATE TABLE b (id INT)  ;\n";
        assert_eq!(
            split_statements(sql),
            vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]
        );
    }

    #[test]
    fn test_leading_comment_hides_statement() {
        // The comment filter looks at the whole piece, not at lines.
        let sql = "-- tables\nCREATE TABLE a (id INT);";
        assert!(split_statements(sql).is_empty());
    }

    #[rstest]
    #[case("INSERT INTO a VALUES (1)", true)]
    #[case("update a set id = 2", true)]
    #[case("Delete from a", true)]
    #[case("ALTER TABLE a ADD COLUMN deleted_at DATETIME", true)]
    #[case("CREATE TRIGGER t BEFORE INSERT ON a FOR EACH ROW SET @x = 1", true)]
    #[case("CREATE TABLE a (id INT)", false)]
    #[case("CREATE INDEX idx_a ON a (id)", false)]
    fn test_is_data_mutation(#[case] statement: &str, #[case] expected: bool) {
        assert_eq!(is_data_mutation(statement), expected);
    }

    #[test]
    fn test_is_already_exists_checks_whole_chain() {
        let err = anyhow::anyhow!("error returned from database: 1050 (42S01): Table 'a' already exists")
            .context("statement failed");
        assert!(is_already_exists(&err));
        assert!(!is_already_exists(&anyhow::anyhow!("Unknown column 'x'")));
    }
}
