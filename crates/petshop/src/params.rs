//! Column map → named-parameter triples.

use crate::value::ValueMap;

/// Identity column skipped by insert call sites.
pub const IDENTITY_COLUMN: &str = "id";

/// Parallel column / placeholder lists plus the values they bind.
///
/// `columns[i]` is bound through `placeholders[i]`, which is `:` + the column
/// name, and `bound[columns[i]]` holds its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    pub columns: Vec<String>,
    pub placeholders: Vec<String>,
    pub bound: ValueMap,
}

impl NamedParams {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// `col = :col` fragments, in column order.
    pub fn assignments(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.placeholders)
            .map(|(col, ph)| format!("{col} = {ph}"))
            .collect()
    }
}

/// Build parameters from `input`, skipping null values.
pub fn build(input: &ValueMap) -> NamedParams {
    build_filtered(input, |_| true)
}

/// Like [`build`], additionally skipping the identity column.
pub fn build_for_insert(input: &ValueMap) -> NamedParams {
    build_filtered(input, |key| key != IDENTITY_COLUMN)
}

fn build_filtered(input: &ValueMap, keep: impl Fn(&str) -> bool) -> NamedParams {
    let mut out = NamedParams::default();
    for (key, value) in input {
        if value.is_null() || !keep(key) {
            continue;
        }
        out.columns.push(key.clone());
        out.placeholders.push(placeholder(key));
        out.bound.insert(key.clone(), value.clone());
    }
    out
}

/// Placeholder text for a parameter name.
pub fn placeholder(name: &str) -> String {
    format!(":{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values;

    #[test]
    fn skips_nulls_and_keeps_lists_parallel() {
        let input = values! {
            "name" => "Rex",
            "image_url" => None::<String>,
            "likes" => 3_i64,
        };
        let p = build(&input);
        assert_eq!(p.columns, vec!["likes", "name"]);
        assert_eq!(p.placeholders, vec![":likes", ":name"]);
        assert_eq!(p.bound.len(), 2);
        assert_eq!(p.len(), p.placeholders.len());
        assert!(!p.bound.contains_key("image_url"));
    }

    #[test]
    fn insert_excludes_identity_column() {
        let input = values! { "id" => "X", "name" => "Rex" };
        let p = build_for_insert(&input);
        assert_eq!(p.columns, vec!["name"]);
        assert_eq!(p.placeholders, vec![":name"]);
        assert!(!p.bound.contains_key("id"));

        // update/delete call sites keep it
        assert_eq!(build(&input).columns, vec!["id", "name"]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let p = build(&ValueMap::new());
        assert!(p.is_empty());
        assert!(p.placeholders.is_empty());
        assert!(p.bound.is_empty());
    }

    #[test]
    fn assignments_pair_columns_with_placeholders() {
        let p = build(&values! { "status" => "active" });
        assert_eq!(p.assignments(), vec!["status = :status"]);
    }
}
