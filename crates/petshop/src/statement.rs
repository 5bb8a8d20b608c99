//! Statement assembly for the six data-store operations.
//!
//! Builders here are pure: they validate identifiers, produce SQL with `:name`
//! placeholders and the map those names resolve against. Nothing touches the
//! database until [`DataStore`](crate::DataStore) executes the result.

use std::fmt;

use crate::error::{StoreError, StoreResult};
use crate::ident;
use crate::named;
use crate::params;
use crate::value::{Value, ValueMap};

/// Suffix appended to WHERE-side parameter names that collide with SET names.
pub const WHERE_SUFFIX: &str = "_where";

/// Statement kind, used for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    SelectAll,
    SelectWhere,
    Count,
    Insert,
    Update,
    Delete,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::SelectAll => "select_all",
            Op::SelectWhere => "select_where",
            Op::Count => "count",
            Op::Insert => "insert",
            Op::Update => "update",
            Op::Delete => "delete",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An assembled statement with named placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub op: Op,
    pub table: String,
    pub sql: String,
    pub bound: ValueMap,
}

impl Statement {
    /// Positional SQL and parameters for the driver.
    pub fn bind(&self) -> StoreResult<(String, Vec<Value>)> {
        named::bind(&self.sql, &self.bound)
    }
}

fn table_name(table: &str) -> StoreResult<String> {
    ident::table(table)
}

fn with_where(mut sql: String, predicate: &str) -> String {
    let predicate = predicate.trim();
    if !predicate.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(predicate);
    }
    sql
}

/// `SELECT * FROM table ORDER BY order`.
pub fn select_all(table: &str, order: &str) -> StoreResult<Statement> {
    let name = table_name(table)?;
    let order = ident::order_by(order)?;
    Ok(Statement {
        op: Op::SelectAll,
        sql: format!("SELECT * FROM {name} ORDER BY {order}"),
        table: name,
        bound: ValueMap::new(),
    })
}

/// `SELECT * FROM table [WHERE predicate]`. An empty predicate selects everything.
pub fn select_where(table: &str, predicate: &str, bound: &ValueMap) -> StoreResult<Statement> {
    let name = table_name(table)?;
    Ok(Statement {
        op: Op::SelectWhere,
        sql: with_where(format!("SELECT * FROM {name}"), predicate),
        table: name,
        bound: bound.clone(),
    })
}

/// `SELECT COUNT(*) FROM table [WHERE predicate]`.
pub fn count(table: &str, predicate: &str, bound: &ValueMap) -> StoreResult<Statement> {
    let name = table_name(table)?;
    Ok(Statement {
        op: Op::Count,
        sql: with_where(format!("SELECT COUNT(*) FROM {name}"), predicate),
        table: name,
        bound: bound.clone(),
    })
}

/// `INSERT INTO table (cols) VALUES (:cols)`, skipping nulls and `id`.
pub fn insert(table: &str, values: &ValueMap) -> StoreResult<Statement> {
    let name = table_name(table)?;
    let p = params::build_for_insert(values);
    if p.is_empty() {
        return Err(StoreError::invalid_statement(format!(
            "insert into {name} has no non-null columns"
        )));
    }
    let columns = p
        .columns
        .iter()
        .map(|c| ident::column(c))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(Statement {
        op: Op::Insert,
        sql: format!(
            "INSERT INTO {name} ({}) VALUES ({})",
            columns.join(", "),
            p.placeholders.join(", ")
        ),
        table: name,
        bound: p.bound,
    })
}

/// Merge WHERE parameters into the SET map, renaming colliding names.
///
/// Every key of `where_bound` that also appears in `set_values` is stored as
/// `key_where` (more suffixes are appended if that is taken too) and its
/// placeholder in `predicate` is rewritten. Returns the rewritten predicate and
/// the merged map.
pub fn merge_where(
    set_values: &ValueMap,
    set_bound: ValueMap,
    predicate: &str,
    where_bound: &ValueMap,
) -> (String, ValueMap) {
    let mut merged = set_bound;
    let mut predicate = predicate.to_string();

    for (key, value) in where_bound {
        if !set_values.contains_key(key) && !merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
            continue;
        }
        let mut renamed = format!("{key}{WHERE_SUFFIX}");
        while merged.contains_key(&renamed) || where_bound.contains_key(&renamed) {
            renamed.push_str(WHERE_SUFFIX);
        }
        predicate = named::rename_placeholder(&predicate, key, &renamed);
        merged.insert(renamed, value.clone());
    }

    (predicate, merged)
}

/// `UPDATE table SET col = :col, ... WHERE predicate`.
///
/// Rejects an empty SET list (after null skipping) and an empty predicate.
pub fn update(
    table: &str,
    set_values: &ValueMap,
    predicate: &str,
    where_bound: &ValueMap,
) -> StoreResult<Statement> {
    let name = table_name(table)?;
    let p = params::build(set_values);
    if p.is_empty() {
        return Err(StoreError::invalid_statement(format!(
            "update of {name} has an empty SET list"
        )));
    }
    if predicate.trim().is_empty() {
        return Err(StoreError::invalid_statement(format!(
            "update of {name} has no WHERE predicate"
        )));
    }
    for c in &p.columns {
        ident::column(c)?;
    }

    let set_clause = p.assignments().join(", ");
    let (predicate, bound) = merge_where(set_values, p.bound, predicate.trim(), where_bound);

    Ok(Statement {
        op: Op::Update,
        sql: format!("UPDATE {name} SET {set_clause} WHERE {predicate}"),
        table: name,
        bound,
    })
}

/// `DELETE FROM table WHERE col = :col AND ...`, matching every non-null entry.
pub fn delete(table: &str, match_values: &ValueMap) -> StoreResult<Statement> {
    let name = table_name(table)?;
    let p = params::build(match_values);
    if p.is_empty() {
        return Err(StoreError::invalid_statement(format!(
            "delete from {name} has no match values"
        )));
    }
    for c in &p.columns {
        ident::column(c)?;
    }
    Ok(Statement {
        op: Op::Delete,
        sql: format!("DELETE FROM {name} WHERE {}", p.assignments().join(" AND ")),
        table: name,
        bound: p.bound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values;

    #[test]
    fn update_renames_colliding_where_keys() {
        let set = values! { "status" => "active" };
        let whr = values! { "status" => "pending", "id" => "7" };
        let stmt = update("orders", &set, "status = :status AND id = :id", &whr).unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE orders SET status = :status WHERE status = :status_where AND id = :id"
        );
        assert_eq!(
            stmt.bound,
            values! { "status" => "active", "status_where" => "pending", "id" => "7" }
        );

        // every placeholder resolves to exactly one entry
        let names = named::placeholder_names(&stmt.sql);
        assert_eq!(names.len(), stmt.bound.len());
        for n in names {
            assert!(stmt.bound.contains_key(&n));
        }
    }

    #[test]
    fn update_binds_renamed_parameters_positionally() {
        let set = values! { "unread" => false };
        let whr = values! { "unread" => true };
        let stmt = update("notifications", &set, "unread = :unread", &whr).unwrap();
        let (sql, params) = stmt.bind().unwrap();
        assert_eq!(sql, "UPDATE notifications SET unread = $1 WHERE unread = $2");
        assert_eq!(params, vec![Value::Bool(false), Value::Bool(true)]);
    }

    #[test]
    fn rename_avoids_existing_suffixed_keys() {
        let set = values! { "a" => 1_i64 };
        let whr = values! { "a" => 2_i64, "a_where" => 3_i64 };
        let (pred, merged) = merge_where(
            &set,
            set.clone(),
            "a = :a AND b = :a_where",
            &whr,
        );
        assert_eq!(pred, "a = :a_where_where AND b = :a_where");
        assert_eq!(merged["a"], Value::Int(1));
        assert_eq!(merged["a_where"], Value::Int(3));
        assert_eq!(merged["a_where_where"], Value::Int(2));
    }

    #[test]
    fn update_rejects_empty_set_and_where() {
        let whr = values! { "id" => "1" };
        let err = update("pets", &values! { "likes" => None::<i64> }, "id = :id", &whr).unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatement(_)));

        let err = update("pets", &values! { "likes" => 1_i64 }, "  ", &whr).unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatement(_)));
    }

    #[test]
    fn insert_skips_identity_and_nulls() {
        let stmt = insert(
            "pets",
            &values! { "id" => "X", "name" => "Rex", "image_url" => None::<String> },
        )
        .unwrap();
        assert_eq!(stmt.sql, "INSERT INTO pets (name) VALUES (:name)");
        assert!(!stmt.bound.contains_key("id"));
    }

    #[test]
    fn insert_rejects_bad_column_keys() {
        let err = insert("pets", &values! { "name) VALUES (1); --" => "x" }).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn delete_matches_with_and() {
        let stmt = delete("favorites", &values! { "pet_id" => "p1", "user_id" => "u1" }).unwrap();
        assert_eq!(
            stmt.sql,
            "DELETE FROM favorites WHERE pet_id = :pet_id AND user_id = :user_id"
        );
        assert!(delete("favorites", &ValueMap::new()).is_err());
    }

    #[test]
    fn select_variants() {
        assert_eq!(
            select_all("notifications", "id desc").unwrap().sql,
            "SELECT * FROM notifications ORDER BY id DESC"
        );
        assert!(select_all("pets", "id; DROP TABLE pets").is_err());
        assert!(select_all("pets; --", "id").is_err());

        let stmt = select_where("pets", "", &ValueMap::new()).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM pets");

        let stmt = count("reservations", "pet_id = :pet_id", &values! { "pet_id" => "p" }).unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM reservations WHERE pet_id = :pet_id");
        assert_eq!(stmt.op, Op::Count);
    }

    #[test]
    fn missing_where_param_surfaces_on_bind() {
        let stmt = select_where("pets", "breed = :breed", &ValueMap::new()).unwrap();
        assert!(matches!(stmt.bind(), Err(StoreError::MissingParam(_))));
    }
}
