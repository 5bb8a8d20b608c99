use std::collections::BTreeMap;

use crate::client::GenericClient;
use crate::error::StoreResult;
use crate::model::{Favorite, FromRecord};
use crate::schema::{Assignments, Column, FavoriteColumn, Favorites, Table, eq_predicate};
use crate::store::DataStore;
use crate::values;

/// A user's favorites keyed by pet id. Presence means "liked".
pub type FavoriteMap = BTreeMap<String, Favorite>;

pub struct FavoriteRepository<'a, C> {
    store: &'a DataStore<C>,
}

impl<'a, C: GenericClient> FavoriteRepository<'a, C> {
    pub fn new(store: &'a DataStore<C>) -> Self {
        Self { store }
    }

    pub async fn find_by_user(&self, user_id: &str) -> StoreResult<FavoriteMap> {
        let records = self
            .store
            .select_where(
                Favorites::NAME,
                &eq_predicate(FavoriteColumn::UserId),
                &values! { FavoriteColumn::UserId.name() => user_id },
            )
            .await?;

        let mut map = FavoriteMap::new();
        for record in &records {
            let fav = Favorite::from_record(record)?;
            map.insert(fav.pet_id.clone(), fav);
        }
        Ok(map)
    }

    pub async fn create(&self, pet_id: &str, user_id: &str) -> StoreResult<()> {
        let values = Assignments::<Favorites>::new()
            .set(FavoriteColumn::PetId, pet_id)
            .set(FavoriteColumn::UserId, user_id)
            .into_map();
        self.store.insert(Favorites::NAME, &values).await
    }

    /// Remove the (pet, user) relation; returns how many rows went away.
    pub async fn delete(&self, pet_id: &str, user_id: &str) -> StoreResult<u64> {
        let values = Assignments::<Favorites>::new()
            .set(FavoriteColumn::PetId, pet_id)
            .set(FavoriteColumn::UserId, user_id)
            .into_map();
        self.store.delete(Favorites::NAME, &values).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::RecordingClient;

    #[tokio::test]
    async fn create_and_delete_use_pet_and_user() {
        let store = DataStore::new(RecordingClient::default());
        let repo = FavoriteRepository::new(&store);
        repo.create("p1", "u1").await.unwrap();
        repo.delete("p1", "u1").await.unwrap();

        assert_eq!(
            store.client().statements(),
            vec![
                "INSERT INTO favorites (pet_id, user_id) VALUES ($1, $2)",
                "DELETE FROM favorites WHERE pet_id = $1 AND user_id = $2",
            ]
        );
    }

    #[tokio::test]
    async fn empty_result_is_an_empty_map() {
        let store = DataStore::new(RecordingClient::default());
        let map = FavoriteRepository::new(&store).find_by_user("u1").await.unwrap();
        assert!(map.is_empty());
        assert_eq!(
            store.client().statements(),
            vec!["SELECT * FROM favorites WHERE user_id = $1"]
        );
    }
}
