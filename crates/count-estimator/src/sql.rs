//! SQL text for the exact-count path.

use crate::{CountQuery, TableName};

/// SQL flavor used to render identifiers and placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Postgres,
}

impl Dialect {
    /// Quotes an identifier, doubling any embedded quote character.
    pub fn quote_identifier(&self, ident: &str) -> String {
        let quote = match self {
            Dialect::MySql => '`',
            Dialect::Postgres => '"',
        };
        let mut quoted = String::with_capacity(ident.len() + 2);
        quoted.push(quote);
        for c in ident.chars() {
            if c == quote {
                quoted.push(quote);
            }
            quoted.push(c);
        }
        quoted.push(quote);
        quoted
    }

    /// Quotes a possibly schema-qualified table name.
    pub fn quote_table(&self, table: &TableName) -> String {
        match table.schema() {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(table.table())
            ),
            None => self.quote_identifier(table.table()),
        }
    }

    /// Placeholder for the `index`th bind parameter (1-based).
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }
}

/// Renders `SELECT COUNT(*)` for the query, ignoring pagination bounds.
///
/// Bind values must be supplied in filter order, skipping filters whose
/// operator takes no value. The output contains `WHERE` exactly when the
/// query has filters.
pub fn render_count(query: &CountQuery, dialect: Dialect) -> String {
    let mut sql = format!("SELECT COUNT(*) FROM {}", dialect.quote_table(&query.table));
    let mut param_count = 0;

    for (i, filter) in query.filters.iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        sql.push_str(&dialect.quote_identifier(&filter.column));
        sql.push(' ');
        sql.push_str(filter.op.as_sql());
        if filter.op.takes_value() {
            param_count += 1;
            sql.push(' ');
            sql.push_str(&dialect.placeholder(param_count));
        }
    }

    sql
}

/// Escapes a value for use inside a single-quoted MySQL `LIKE` pattern so it
/// matches only itself.
pub fn escape_like_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\\\\\"),
            '%' => escaped.push_str("\\%"),
            '_' => escaped.push_str("\\_"),
            '\'' => escaped.push_str("''"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Filter;

    fn orders() -> CountQuery {
        CountQuery::for_table("orders").unwrap()
    }

    #[test]
    fn unfiltered_count_has_no_where_clause() {
        let sql = render_count(&orders(), Dialect::MySql);
        assert_eq!(sql, "SELECT COUNT(*) FROM `orders`");
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn bounds_do_not_reach_the_sql() {
        let sql = render_count(&orders().offset(10).limit(5), Dialect::Postgres);
        assert_eq!(sql, "SELECT COUNT(*) FROM \"orders\"");
    }

    #[test]
    fn mysql_filters_use_question_marks() {
        let query = orders()
            .filter(Filter::eq("status", "shipped"))
            .filter(Filter::is_null("deleted_at"))
            .filter(Filter::gt("total", 100));
        assert_eq!(
            render_count(&query, Dialect::MySql),
            "SELECT COUNT(*) FROM `orders` WHERE `status` = ? AND `deleted_at` IS NULL AND `total` > ?"
        );
    }

    #[test]
    fn postgres_placeholders_skip_valueless_filters() {
        let query = orders()
            .filter(Filter::eq("status", "shipped"))
            .filter(Filter::is_not_null("shipped_at"))
            .filter(Filter::like("customer", "a%"));
        assert_eq!(
            render_count(&query, Dialect::Postgres),
            "SELECT COUNT(*) FROM \"orders\" WHERE \"status\" = $1 AND \"shipped_at\" IS NOT NULL AND \"customer\" LIKE $2"
        );
    }

    #[test]
    fn identifiers_are_quoted_per_dialect() {
        assert_eq!(Dialect::MySql.quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(Dialect::Postgres.quote_identifier("we\"ird"), "\"we\"\"ird\"");

        let qualified = TableName::new("shop.orders").unwrap();
        assert_eq!(Dialect::MySql.quote_table(&qualified), "`shop`.`orders`");
        assert_eq!(Dialect::Postgres.quote_table(&qualified), "\"shop\".\"orders\"");
    }

    #[test]
    fn like_literal_escapes_wildcards() {
        assert_eq!(escape_like_literal("order_items"), "order\\_items");
        assert_eq!(escape_like_literal("50%"), "50\\%");
        assert_eq!(escape_like_literal("o'brien"), "o''brien");
        assert_eq!(escape_like_literal("plain"), "plain");
        // literal backslash: doubled for the string literal, doubled again for LIKE
        assert_eq!(escape_like_literal("a\\b"), "a\\\\\\\\b");
        assert_eq!(escape_like_literal("a\\b").matches('\\').count(), 4);
    }
}
