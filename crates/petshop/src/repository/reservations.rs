use chrono::NaiveDate;

use crate::client::GenericClient;
use crate::error::{StoreError, StoreResult};
use crate::model::NewReservation;
use crate::schema::{Assignments, Column, ReservationColumn, Reservations, Table, eq_predicate};
use crate::store::DataStore;
use crate::values;

/// `chrono` format of [`NewReservation::reservation_date`].
pub const RESERVATION_DATE_FORMAT: &str = "%Y%m%d";

pub struct ReservationRepository<'a, C> {
    store: &'a DataStore<C>,
}

impl<'a, C: GenericClient> ReservationRepository<'a, C> {
    pub fn new(store: &'a DataStore<C>) -> Self {
        Self { store }
    }

    /// Store a reservation; the date becomes midnight UTC of that day.
    pub async fn create(&self, input: &NewReservation) -> StoreResult<()> {
        let date = NaiveDate::parse_from_str(input.reservation_date.trim(), RESERVATION_DATE_FORMAT)
            .map_err(|e| {
                StoreError::validation(format!(
                    "reservation_date {:?} is not YYYYMMDD: {e}",
                    input.reservation_date
                ))
            })?;
        let at = date
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .ok_or_else(|| StoreError::validation("reservation_date out of range"))?;

        let values = Assignments::<Reservations>::new()
            .set(ReservationColumn::PetId, input.pet_id.as_str())
            .set(ReservationColumn::UserId, input.user_id.as_str())
            .set(ReservationColumn::Email, input.email.as_str())
            .set(ReservationColumn::UserName, input.full_name.as_str())
            .set(ReservationColumn::ReservationDatetime, at)
            .into_map();
        self.store.insert(Reservations::NAME, &values).await
    }

    pub async fn count_by_pet(&self, pet_id: &str) -> StoreResult<i64> {
        self.store
            .count(
                Reservations::NAME,
                &eq_predicate(ReservationColumn::PetId),
                &values! { ReservationColumn::PetId.name() => pet_id },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::RecordingClient;

    fn reservation(date: &str) -> NewReservation {
        NewReservation {
            pet_id: "p1".into(),
            user_id: "u1".into(),
            email: "a@example.com".into(),
            full_name: "Hanako Yamada".into(),
            reservation_date: date.into(),
        }
    }

    #[tokio::test]
    async fn create_inserts_all_columns() {
        let store = DataStore::new(RecordingClient::default());
        ReservationRepository::new(&store)
            .create(&reservation("20250301"))
            .await
            .unwrap();
        let seen = store.client().seen.lock().unwrap();
        assert_eq!(
            seen[0].0,
            "INSERT INTO reservations (email, pet_id, reservation_datetime, user_id, user_name) \
             VALUES ($1, $2, $3, $4, $5)"
        );
        assert_eq!(seen[0].1, 5);
    }

    #[tokio::test]
    async fn bad_date_is_rejected_before_any_statement() {
        let store = DataStore::new(RecordingClient::default());
        let err = ReservationRepository::new(&store)
            .create(&reservation("2025-03-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.client().statements().is_empty());
    }
}
