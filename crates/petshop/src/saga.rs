//! The like toggle: keep `pets.likes` and the `favorites` relation in step.
//!
//! One invocation walks `CheckingState → Validating → UpdatingCounter →
//! SyncingRelation` strictly in order. [`toggle_like`] itself never opens a
//! transaction; the caller decides whether the store it passes in is a plain
//! connection ([`ConsistencyMode::BestEffort`]) or a transaction that is rolled
//! back on any error ([`ConsistencyMode::Transactional`]).

use std::fmt;
use std::future::Future;

use thiserror::Error;

use crate::client::GenericClient;
use crate::config::ConsistencyMode;
use crate::error::{StoreError, StoreResult};
use crate::messages::{AppError, MessageCode};
use crate::model::{LikeRequest, Pet};
use crate::repository::{FavoriteMap, FavoriteRepository, PetRepository};
use crate::store::DataStore;

/// Reads and writes the saga needs.
pub trait LikeStore: Send + Sync {
    /// The user's favorites keyed by pet id.
    fn favorites_of(&self, user_id: &str) -> impl Future<Output = StoreResult<FavoriteMap>> + Send;

    fn find_pet(&self, pet_id: &str) -> impl Future<Output = StoreResult<Option<Pet>>> + Send;

    /// Persist the counter; returns affected rows.
    fn set_likes(&self, pet_id: &str, likes: i64)
    -> impl Future<Output = StoreResult<u64>> + Send;

    fn add_favorite(&self, pet_id: &str, user_id: &str)
    -> impl Future<Output = StoreResult<()>> + Send;

    fn remove_favorite(
        &self,
        pet_id: &str,
        user_id: &str,
    ) -> impl Future<Output = StoreResult<u64>> + Send;
}

impl<C: GenericClient> LikeStore for DataStore<C> {
    async fn favorites_of(&self, user_id: &str) -> StoreResult<FavoriteMap> {
        FavoriteRepository::new(self).find_by_user(user_id).await
    }

    async fn find_pet(&self, pet_id: &str) -> StoreResult<Option<Pet>> {
        PetRepository::new(self).find_by_id(pet_id).await
    }

    async fn set_likes(&self, pet_id: &str, likes: i64) -> StoreResult<u64> {
        PetRepository::new(self).set_likes(pet_id, likes).await
    }

    async fn add_favorite(&self, pet_id: &str, user_id: &str) -> StoreResult<()> {
        FavoriteRepository::new(self).create(pet_id, user_id).await
    }

    async fn remove_favorite(&self, pet_id: &str, user_id: &str) -> StoreResult<u64> {
        FavoriteRepository::new(self).delete(pet_id, user_id).await
    }
}

/// Saga states that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    CheckingState,
    Validating,
    UpdatingCounter,
    SyncingRelation,
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SagaStep::CheckingState => "checking state",
            SagaStep::Validating => "validating",
            SagaStep::UpdatingCounter => "updating counter",
            SagaStep::SyncingRelation => "syncing relation",
        })
    }
}

#[derive(Debug, Error)]
pub enum LikeError {
    /// The requested state is already recorded. Not a failure.
    #[error("pet {pet_id} already has liked = {liked}")]
    AlreadyInState { pet_id: String, liked: bool },

    #[error("pet {0} not found")]
    ItemNotFound(String),

    /// A step failed and nothing it touched was left half-written.
    #[error("like toggle failed while {step}: {source}")]
    Step {
        step: SagaStep,
        liked: bool,
        #[source]
        source: StoreError,
    },

    /// The relation write failed after the counter was committed.
    #[error("favorite relation not synced after likes was set to {counter_likes}: {source}")]
    PartialFailure {
        counter_likes: i64,
        liked: bool,
        #[source]
        source: StoreError,
    },
}

impl LikeError {
    pub fn is_already_in_state(&self) -> bool {
        matches!(self, LikeError::AlreadyInState { .. })
    }

    /// Business code for this failure.
    pub fn message_code(&self) -> MessageCode {
        match self {
            LikeError::AlreadyInState { .. } => MessageCode::AlreadyLiked,
            LikeError::ItemNotFound(_) => MessageCode::SelectFailed,
            LikeError::Step { step, liked, .. } => match step {
                SagaStep::CheckingState | SagaStep::Validating => MessageCode::SelectFailed,
                SagaStep::UpdatingCounter => MessageCode::UpdateFailed,
                SagaStep::SyncingRelation if *liked => MessageCode::FavoriteCreateFailed,
                SagaStep::SyncingRelation => MessageCode::FavoriteDeleteFailed,
            },
            LikeError::PartialFailure { liked: true, .. } => MessageCode::FavoriteCreateFailed,
            LikeError::PartialFailure { .. } => MessageCode::FavoriteDeleteFailed,
        }
    }
}

impl From<LikeError> for AppError {
    fn from(err: LikeError) -> Self {
        let code = err.message_code();
        if err.is_already_in_state() {
            AppError::bare(code)
        } else {
            AppError::new(code, err)
        }
    }
}

/// Result of a completed toggle.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LikeOutcome {
    pub pet_id: String,
    pub user_id: String,
    pub liked: bool,
    /// Counter value written by this toggle.
    pub likes: i64,
}

/// Run the toggle against `store`.
///
/// `mode` only changes how a relation failure is reported: in best-effort mode
/// the counter write has already landed, so it is a [`LikeError::PartialFailure`].
#[tracing::instrument(skip_all, fields(user_id = %req.user_id, pet_id = %req.pet_id, liked = req.value))]
pub async fn toggle_like<S: LikeStore>(
    store: &S,
    req: &LikeRequest,
    mode: ConsistencyMode,
) -> Result<LikeOutcome, LikeError> {
    let liked = req.value;
    let step = |step: SagaStep| move |source: StoreError| LikeError::Step { step, liked, source };

    // CheckingState
    let favorites = store
        .favorites_of(&req.user_id)
        .await
        .map_err(step(SagaStep::CheckingState))?;

    // Validating
    if favorites.contains_key(&req.pet_id) == liked {
        tracing::info!("like already recorded");
        return Err(LikeError::AlreadyInState {
            pet_id: req.pet_id.clone(),
            liked,
        });
    }

    // UpdatingCounter
    let pet = store
        .find_pet(&req.pet_id)
        .await
        .map_err(step(SagaStep::UpdatingCounter))?
        .ok_or_else(|| LikeError::ItemNotFound(req.pet_id.clone()))?;
    let likes = if liked { pet.likes + 1 } else { pet.likes - 1 };
    if likes < 0 {
        tracing::warn!(likes, "like counter below zero, counter and favorites have diverged");
    }
    let affected = store
        .set_likes(&req.pet_id, likes)
        .await
        .map_err(step(SagaStep::UpdatingCounter))?;
    if affected == 0 {
        return Err(LikeError::ItemNotFound(req.pet_id.clone()));
    }

    // SyncingRelation
    let synced = if liked {
        store.add_favorite(&req.pet_id, &req.user_id).await
    } else {
        store
            .remove_favorite(&req.pet_id, &req.user_id)
            .await
            .map(|_| ())
    };
    if let Err(source) = synced {
        return Err(match mode {
            ConsistencyMode::Transactional => step(SagaStep::SyncingRelation)(source),
            ConsistencyMode::BestEffort => {
                tracing::error!(
                    counter_likes = likes,
                    error = %source,
                    "favorite relation diverged from like counter"
                );
                LikeError::PartialFailure {
                    counter_likes: likes,
                    liked,
                    source,
                }
            }
        });
    }

    tracing::debug!(likes, "like toggled");
    Ok(LikeOutcome {
        pet_id: req.pet_id.clone(),
        user_id: req.user_id.clone(),
        liked,
        likes,
    })
}
