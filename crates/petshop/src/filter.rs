//! Sparse pet filter → conjunctive WHERE predicates.

use serde::{Deserialize, Serialize};

use crate::schema::{Column, PetColumn, eq_predicate};
use crate::value::{Value, ValueMap};

/// Optional equality criteria for listing pets.
///
/// Empty strings and a zero price mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetFilter {
    pub id: String,
    pub name: String,
    pub breed: String,
    pub gender: String,
    pub price: f64,
    pub reference_number: String,
}

/// Canonical gender values stored in `pets.gender`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Case-insensitive match against `male` / `female`.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("male") {
            Some(Gender::Male)
        } else if s.eq_ignore_ascii_case("female") {
            Some(Gender::Female)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// Predicates in field order, with the values they bind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    pub predicates: Vec<String>,
    pub bound: ValueMap,
}

impl CompiledFilter {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Predicates joined with `AND`; empty when there is nothing to filter on.
    pub fn where_clause(&self) -> String {
        self.predicates.join(" AND ")
    }

    fn push(&mut self, column: PetColumn, value: impl Into<Value>) {
        self.predicates.push(eq_predicate(column));
        self.bound.insert(column.name().to_string(), value.into());
    }
}

/// Compile a filter. `None` yields an empty result.
///
/// Field order is fixed: gender, price, name, id, reference number, breed.
/// A gender other than male/female is dropped rather than matched.
pub fn compile(filter: Option<&PetFilter>) -> CompiledFilter {
    let mut out = CompiledFilter::default();
    let Some(f) = filter else {
        return out;
    };

    if let Some(gender) = Gender::parse(&f.gender) {
        out.push(PetColumn::Gender, gender.as_str());
    }
    if f.price != 0.0 {
        out.push(PetColumn::Price, f.price);
    }

    let text_fields = [
        (PetColumn::Name, &f.name),
        (PetColumn::Id, &f.id),
        (PetColumn::ReferenceNumber, &f.reference_number),
        (PetColumn::Breed, &f.breed),
    ];
    for (column, value) in text_fields {
        if !value.is_empty() {
            out.push(column, value.as_str());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_filter_compiles_to_nothing() {
        let c = compile(None);
        assert!(c.is_empty());
        assert!(c.bound.is_empty());
        assert_eq!(c.where_clause(), "");

        assert!(compile(Some(&PetFilter::default())).is_empty());
    }

    #[test]
    fn gender_is_normalized_and_zero_price_skipped() {
        let f = PetFilter {
            gender: "MALE".into(),
            price: 0.0,
            ..Default::default()
        };
        let c = compile(Some(&f));
        assert_eq!(c.predicates, vec!["gender = :gender"]);
        assert_eq!(c.bound["gender"], Value::from("Male"));
    }

    #[test]
    fn unknown_gender_is_dropped() {
        let f = PetFilter {
            gender: "unknown".into(),
            breed: "Shiba".into(),
            ..Default::default()
        };
        let c = compile(Some(&f));
        assert_eq!(c.predicates, vec!["breed = :breed"]);
        assert!(!c.bound.contains_key("gender"));
    }

    #[test]
    fn fields_follow_fixed_order() {
        let f = PetFilter {
            id: "7".into(),
            name: "Rex".into(),
            breed: "Shiba".into(),
            gender: "female".into(),
            price: 120.5,
            reference_number: "R-1".into(),
        };
        let c = compile(Some(&f));
        assert_eq!(
            c.predicates,
            vec![
                "gender = :gender",
                "price = :price",
                "name = :name",
                "id = :id",
                "reference_number = :reference_number",
                "breed = :breed",
            ]
        );
        assert_eq!(c.predicates.len(), c.bound.len());
        assert_eq!(c.bound["gender"], Value::from("Female"));
        assert_eq!(c.bound["price"], Value::Float(120.5));
        assert_eq!(
            c.where_clause(),
            "gender = :gender AND price = :price AND name = :name AND id = :id \
             AND reference_number = :reference_number AND breed = :breed"
        );
    }

    #[test]
    fn deserializes_sparse_json() {
        let f: PetFilter = serde_json::from_str(r#"{"breed":"Corgi"}"#).unwrap();
        assert_eq!(f.breed, "Corgi");
        assert_eq!(f.price, 0.0);
    }
}
