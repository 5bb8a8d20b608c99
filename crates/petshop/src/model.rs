//! Domain types and their mapping from decoded rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::schema::{Column, FavoriteColumn, NotificationColumn, PetColumn};
use crate::value::{Record, Value};

/// Build a domain value from a decoded row.
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> StoreResult<Self>;
}

static NULL: Value = Value::Null;

fn field(record: &Record, column: impl Column) -> &Value {
    record.get(column.name()).unwrap_or(&NULL)
}

fn mismatch(column: impl Column, expected: &str, got: &Value) -> StoreError {
    StoreError::decode(column.name(), format!("expected {expected}, got {got:?}"))
}

fn text(record: &Record, column: impl Column) -> StoreResult<String> {
    let v = field(record, column);
    v.to_id_string().ok_or_else(|| mismatch(column, "text", v))
}

fn opt_text(record: &Record, column: impl Column) -> StoreResult<Option<String>> {
    match field(record, column) {
        Value::Null => Ok(None),
        _ => text(record, column).map(Some),
    }
}

fn int(record: &Record, column: impl Column) -> StoreResult<i64> {
    let v = field(record, column);
    v.as_i64().ok_or_else(|| mismatch(column, "integer", v))
}

fn float(record: &Record, column: impl Column) -> StoreResult<f64> {
    let v = field(record, column);
    v.as_f64().ok_or_else(|| mismatch(column, "number", v))
}

fn boolean(record: &Record, column: impl Column) -> StoreResult<bool> {
    let v = field(record, column);
    v.as_bool().ok_or_else(|| mismatch(column, "boolean", v))
}

fn timestamp(record: &Record, column: impl Column) -> StoreResult<Option<DateTime<Utc>>> {
    match field(record, column) {
        Value::Null => Ok(None),
        Value::Timestamp(t) => Ok(Some(*t)),
        Value::Date(d) => Ok(d.and_hms_opt(0, 0, 0).map(|t| t.and_utc())),
        other => Err(mismatch(column, "timestamp", other)),
    }
}

fn text_array(record: &Record, column: impl Column) -> StoreResult<Vec<String>> {
    match field(record, column) {
        Value::Null => Ok(Vec::new()),
        Value::TextArray(items) => Ok(items.clone()),
        other => Err(mismatch(column, "text[]", other)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Shop {
    pub name: String,
    pub location: String,
}

/// A pet listed in the shop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pet {
    pub id: String,
    pub name: String,
    pub breed: String,
    pub gender: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub likes: i64,
    pub shop: Shop,
    pub birth_date: Option<DateTime<Utc>>,
    pub reference_number: String,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Filled in by the service layer, not stored on the row.
    pub reservation_count: i64,
}

impl FromRecord for Pet {
    fn from_record(r: &Record) -> StoreResult<Self> {
        use PetColumn as C;
        Ok(Pet {
            id: text(r, C::Id)?,
            name: text(r, C::Name)?,
            breed: text(r, C::Breed)?,
            gender: text(r, C::Gender)?,
            price: float(r, C::Price)?,
            image_url: opt_text(r, C::ImageUrl)?,
            likes: int(r, C::Likes)?,
            shop: Shop {
                name: opt_text(r, C::ShopName)?.unwrap_or_default(),
                location: opt_text(r, C::ShopLocation)?.unwrap_or_default(),
            },
            birth_date: timestamp(r, C::BirthDate)?,
            reference_number: opt_text(r, C::ReferenceNumber)?.unwrap_or_default(),
            tags: text_array(r, C::Tags)?,
            created_at: timestamp(r, C::CreatedAt)?,
            updated_at: timestamp(r, C::UpdatedAt)?,
            reservation_count: 0,
        })
    }
}

/// One "user likes pet" relation row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Favorite {
    pub id: String,
    pub pet_id: String,
    pub user_id: String,
    /// Always `true` for a stored row.
    pub value: bool,
}

impl FromRecord for Favorite {
    fn from_record(r: &Record) -> StoreResult<Self> {
        use FavoriteColumn as C;
        Ok(Favorite {
            id: text(r, C::Id)?,
            pet_id: text(r, C::PetId)?,
            user_id: text(r, C::UserId)?,
            value: true,
        })
    }
}

/// Reservation request as submitted by a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewReservation {
    pub pet_id: String,
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    /// `YYYYMMDD`.
    pub reservation_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub unread: bool,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FromRecord for Notification {
    fn from_record(r: &Record) -> StoreResult<Self> {
        use NotificationColumn as C;
        Ok(Notification {
            id: int(r, C::Id)?,
            title: opt_text(r, C::Title)?.unwrap_or_default(),
            description: opt_text(r, C::Description)?.unwrap_or_default(),
            category: opt_text(r, C::Category)?.unwrap_or_default(),
            unread: boolean(r, C::Unread)?,
            created_at: timestamp(r, C::CreatedAt)?,
            updated_at: timestamp(r, C::UpdatedAt)?,
        })
    }
}

/// Request to set a user's like on a pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeRequest {
    pub pet_id: String,
    pub user_id: String,
    /// `true` to like, `false` to unlike.
    pub value: bool,
}

/// Map every record through [`FromRecord`].
pub fn from_records<T: FromRecord>(records: &[Record]) -> StoreResult<Vec<T>> {
    records.iter().map(T::from_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values;
    use chrono::NaiveDate;

    #[test]
    fn pet_from_record() {
        let record = values! {
            "id" => "p1",
            "name" => "Rex",
            "breed" => "Shiba",
            "gender" => "Male",
            "price" => 120_i64,
            "image_url" => None::<String>,
            "likes" => 3_i64,
            "shop_name" => "Ueno",
            "shop_location" => "Tokyo",
            "birth_date" => NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            "reference_number" => "R-1",
            "tags" => vec!["calm".to_string()],
        };
        let pet = Pet::from_record(&record).unwrap();
        assert_eq!(pet.price, 120.0);
        assert_eq!(pet.likes, 3);
        assert_eq!(pet.image_url, None);
        assert_eq!(pet.shop.location, "Tokyo");
        assert_eq!(pet.birth_date.unwrap().to_rfc3339(), "2024-01-02T00:00:00+00:00");
        assert_eq!(pet.tags, vec!["calm"]);
        assert_eq!(pet.created_at, None);
    }

    #[test]
    fn missing_required_column_is_a_decode_error() {
        let err = Pet::from_record(&values! { "id" => "p1" }).unwrap_err();
        assert!(matches!(err, StoreError::Decode { ref column, .. } if column == "name"));
    }

    #[test]
    fn notification_serializes_camel_case_timestamps() {
        let n = Notification::from_record(&values! {
            "id" => 4_i64,
            "title" => "Sale",
            "unread" => true,
        })
        .unwrap();
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["id"], 4);
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["description"], "");
    }

    #[test]
    fn favorite_ids_accept_uuid_columns() {
        let id = uuid::Uuid::new_v4();
        let fav = Favorite::from_record(&values! {
            "id" => id,
            "pet_id" => "p1",
            "user_id" => "u1",
        })
        .unwrap();
        assert_eq!(fav.id, id.to_string());
        assert!(fav.value);
    }
}
