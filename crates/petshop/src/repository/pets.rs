use chrono::Utc;

use crate::client::GenericClient;
use crate::error::StoreResult;
use crate::filter::{self, PetFilter};
use crate::model::{Pet, from_records};
use crate::schema::{Assignments, Column, PetColumn, Pets, Table, eq_predicate};
use crate::store::DataStore;
use crate::values;

pub struct PetRepository<'a, C> {
    store: &'a DataStore<C>,
}

impl<'a, C: GenericClient> PetRepository<'a, C> {
    pub fn new(store: &'a DataStore<C>) -> Self {
        Self { store }
    }

    /// Pets matching `filter`; `None` lists every pet.
    pub async fn find(&self, filter: Option<&PetFilter>) -> StoreResult<Vec<Pet>> {
        let compiled = filter::compile(filter);
        tracing::debug!(predicates = compiled.predicates.len(), "finding pets");
        let records = self
            .store
            .select_where(Pets::NAME, &compiled.where_clause(), &compiled.bound)
            .await?;
        from_records(&records)
    }

    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<Pet>> {
        let f = PetFilter {
            id: id.to_string(),
            ..Default::default()
        };
        let pets = self.find(Some(&f)).await?;
        Ok(pets.into_iter().find(|p| p.id == id))
    }

    /// Write the like counter and touch `updated_at`. Returns affected rows.
    pub async fn set_likes(&self, id: &str, likes: i64) -> StoreResult<u64> {
        let set = Assignments::<Pets>::new()
            .set(PetColumn::Likes, likes)
            .set(PetColumn::UpdatedAt, Utc::now())
            .into_map();
        self.store
            .update(
                Pets::NAME,
                &set,
                &eq_predicate(Pets::ID),
                &values! { Pets::ID.name() => id },
            )
            .await
    }
}
