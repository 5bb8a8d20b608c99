use crate::client::GenericClient;
use crate::error::StoreResult;
use crate::model::{Notification, from_records};
use crate::schema::{Assignments, Column, NotificationColumn, Notifications, Table, eq_predicate};
use crate::store::DataStore;
use crate::values;

pub struct NotificationRepository<'a, C> {
    store: &'a DataStore<C>,
}

impl<'a, C: GenericClient> NotificationRepository<'a, C> {
    pub fn new(store: &'a DataStore<C>) -> Self {
        Self { store }
    }

    pub async fn find(&self, id: &str) -> StoreResult<Vec<Notification>> {
        let records = self
            .store
            .select_where(
                Notifications::NAME,
                &eq_predicate(Notifications::ID),
                &values! { Notifications::ID.name() => id },
            )
            .await?;
        from_records(&records)
    }

    /// Newest first.
    pub async fn find_all(&self) -> StoreResult<Vec<Notification>> {
        let records = self
            .store
            .select_all(Notifications::NAME, Notifications::DEFAULT_ORDER)
            .await?;
        from_records(&records)
    }

    pub async fn count_unread(&self) -> StoreResult<i64> {
        self.store
            .count(
                Notifications::NAME,
                &eq_predicate(NotificationColumn::Unread),
                &values! { NotificationColumn::Unread.name() => true },
            )
            .await
    }

    /// Flip every unread notification to read.
    pub async fn mark_all_read(&self) -> StoreResult<u64> {
        let set = Assignments::<Notifications>::new()
            .set(NotificationColumn::Unread, false)
            .into_map();
        self.store
            .update(
                Notifications::NAME,
                &set,
                &eq_predicate(NotificationColumn::Unread),
                &values! { NotificationColumn::Unread.name() => true },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::RecordingClient;

    #[tokio::test]
    async fn mark_all_read_keeps_set_and_where_apart() {
        let store = DataStore::new(RecordingClient::default());
        NotificationRepository::new(&store).mark_all_read().await.unwrap();
        assert_eq!(
            store.client().statements(),
            vec!["UPDATE notifications SET unread = $1 WHERE unread = $2"]
        );
    }

    #[tokio::test]
    async fn find_all_orders_newest_first() {
        let store = DataStore::new(RecordingClient::default());
        NotificationRepository::new(&store).find_all().await.unwrap();
        assert_eq!(
            store.client().statements(),
            vec!["SELECT * FROM notifications ORDER BY id DESC"]
        );
    }
}
