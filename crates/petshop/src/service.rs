//! Services: repositories composed into the operations callers invoke, with
//! failures mapped to business codes.

use deadpool_postgres::Pool;

use crate::config::ConsistencyMode;
use crate::error::StoreError;
use crate::filter::PetFilter;
use crate::messages::{AppError, MessageCode};
use crate::model::{LikeRequest, NewReservation, Notification, Pet};
use crate::repository::{NotificationRepository, PetRepository, ReservationRepository};
use crate::saga::{self, LikeError, LikeOutcome, SagaStep};
use crate::store::{DataStore, StoreOptions};

/// Decode failures are mapping errors; anything else on a read is a select error.
fn read_error(err: StoreError) -> AppError {
    let code = match err {
        StoreError::Decode { .. } => MessageCode::MappingFailed,
        _ => MessageCode::SelectFailed,
    };
    AppError::new(code, err)
}

fn write_error(err: StoreError) -> AppError {
    AppError::new(MessageCode::UpdateFailed, err)
}

async fn connect(
    pool: &Pool,
    options: &StoreOptions,
) -> Result<DataStore<deadpool_postgres::Client>, StoreError> {
    let client = pool.get().await?;
    Ok(DataStore::with_options(client, options.clone()))
}

#[derive(Clone)]
pub struct PetService {
    pool: Pool,
    options: StoreOptions,
    consistency: ConsistencyMode,
}

impl PetService {
    pub fn new(pool: Pool, options: StoreOptions, consistency: ConsistencyMode) -> Self {
        Self {
            pool,
            options,
            consistency,
        }
    }

    pub fn consistency(&self) -> ConsistencyMode {
        self.consistency
    }

    /// Pets matching `filter`, each with its reservation count.
    ///
    /// A failed count is logged and reported as zero.
    #[tracing::instrument(skip_all)]
    pub async fn list_pets(&self, filter: Option<&PetFilter>) -> Result<Vec<Pet>, AppError> {
        let store = connect(&self.pool, &self.options).await.map_err(read_error)?;
        let mut pets = PetRepository::new(&store)
            .find(filter)
            .await
            .map_err(read_error)?;

        let reservations = ReservationRepository::new(&store);
        for pet in &mut pets {
            pet.reservation_count = match reservations.count_by_pet(&pet.id).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(pet_id = %pet.id, error = %e, "reservation count failed");
                    0
                }
            };
        }
        Ok(pets)
    }

    #[tracing::instrument(skip_all, fields(user_id = %input.user_id, pet_id = %input.pet_id))]
    pub async fn create_reservation(&self, input: &NewReservation) -> Result<(), AppError> {
        let store = connect(&self.pool, &self.options).await.map_err(write_error)?;
        ReservationRepository::new(&store)
            .create(input)
            .await
            .map_err(write_error)
    }

    /// Set or clear the user's like on a pet.
    ///
    /// In transactional mode the whole toggle runs in one transaction that is
    /// rolled back on any error, including the already-liked signal.
    #[tracing::instrument(skip_all, fields(mode = %self.consistency))]
    pub async fn toggle_like(&self, req: &LikeRequest) -> Result<LikeOutcome, AppError> {
        match self.consistency {
            ConsistencyMode::BestEffort => {
                let store = connect(&self.pool, &self.options)
                    .await
                    .map_err(|e| checking_state(req, e))?;
                Ok(saga::toggle_like(&store, req, self.consistency).await?)
            }
            ConsistencyMode::Transactional => self.toggle_like_in_transaction(req).await,
        }
    }

    async fn toggle_like_in_transaction(&self, req: &LikeRequest) -> Result<LikeOutcome, AppError> {
        let mut client = self
            .pool
            .get()
            .await
            .map_err(|e| checking_state(req, e.into()))?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| checking_state(req, StoreError::from_db_error(e)))?;

        let result = {
            let store = DataStore::with_options(&tx, self.options.clone());
            saga::toggle_like(&store, req, self.consistency).await
        };

        match result {
            Ok(outcome) => {
                tx.commit()
                    .await
                    .map_err(|e| write_error(StoreError::from_db_error(e)))?;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "like toggle rollback failed");
                }
                Err(err.into())
            }
        }
    }
}

fn checking_state(req: &LikeRequest, source: StoreError) -> AppError {
    LikeError::Step {
        step: SagaStep::CheckingState,
        liked: req.value,
        source,
    }
    .into()
}

#[derive(Clone)]
pub struct NotificationService {
    pool: Pool,
    options: StoreOptions,
}

impl NotificationService {
    pub fn new(pool: Pool, options: StoreOptions) -> Self {
        Self { pool, options }
    }

    /// One notification when `id` is given, otherwise all of them newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, id: Option<&str>) -> Result<Vec<Notification>, AppError> {
        let store = connect(&self.pool, &self.options).await.map_err(read_error)?;
        let repo = NotificationRepository::new(&store);
        match id {
            Some(id) => repo.find(id).await,
            None => repo.find_all().await,
        }
        .map_err(read_error)
    }

    pub async fn unread_count(&self) -> Result<i64, AppError> {
        let store = connect(&self.pool, &self.options).await.map_err(read_error)?;
        NotificationRepository::new(&store)
            .count_unread()
            .await
            .map_err(read_error)
    }

    /// Returns how many notifications were flipped.
    pub async fn mark_read(&self) -> Result<u64, AppError> {
        let store = connect(&self.pool, &self.options).await.map_err(write_error)?;
        NotificationRepository::new(&store)
            .mark_all_read()
            .await
            .map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_are_mapping_errors() {
        let err = read_error(StoreError::decode("price", "expected float8"));
        assert_eq!(err.code, MessageCode::MappingFailed);
        let err = read_error(StoreError::Timeout(std::time::Duration::from_secs(1)));
        assert_eq!(err.code, MessageCode::SelectFailed);
    }

    #[test]
    fn connection_failure_before_the_toggle_is_a_select_error() {
        let req = LikeRequest {
            pet_id: "p1".into(),
            user_id: "u1".into(),
            value: true,
        };
        let err = checking_state(&req, StoreError::Pool("exhausted".into()));
        assert_eq!(err.code, MessageCode::SelectFailed);
        assert!(!err.is_public());
    }
}
