//! Like toggle behavior against an in-memory store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use petshop::{
    AppError, ConsistencyMode, Favorite, FavoriteMap, LikeError, LikeRequest, LikeStore,
    MessageCode, Pet, SagaStep, StoreError, StoreResult, toggle_like,
};

#[derive(Default)]
struct Failures {
    read: bool,
    counter: bool,
    relation: bool,
}

#[derive(Default)]
struct MemoryStore {
    likes: Mutex<BTreeMap<String, i64>>,
    favorites: Mutex<BTreeSet<(String, String)>>,
    counter_writes: Mutex<usize>,
    fail: Failures,
}

impl MemoryStore {
    fn with_pet(id: &str, likes: i64) -> Self {
        let store = Self::default();
        store.likes.lock().unwrap().insert(id.to_string(), likes);
        store
    }

    fn likes(&self, id: &str) -> i64 {
        self.likes.lock().unwrap()[id]
    }

    fn liked(&self, pet: &str, user: &str) -> bool {
        self.favorites
            .lock()
            .unwrap()
            .contains(&(pet.to_string(), user.to_string()))
    }

    fn counter_writes(&self) -> usize {
        *self.counter_writes.lock().unwrap()
    }
}

fn broken(what: &str) -> StoreError {
    StoreError::Connection(format!("{what} unavailable"))
}

impl LikeStore for MemoryStore {
    async fn favorites_of(&self, user_id: &str) -> StoreResult<FavoriteMap> {
        if self.fail.read {
            return Err(broken("favorites"));
        }
        Ok(self
            .favorites
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, user)| user == user_id)
            .map(|(pet, user)| {
                let fav = Favorite {
                    id: format!("{pet}:{user}"),
                    pet_id: pet.clone(),
                    user_id: user.clone(),
                    value: true,
                };
                (pet.clone(), fav)
            })
            .collect())
    }

    async fn find_pet(&self, pet_id: &str) -> StoreResult<Option<Pet>> {
        Ok(self.likes.lock().unwrap().get(pet_id).map(|&likes| Pet {
            id: pet_id.to_string(),
            likes,
            ..Default::default()
        }))
    }

    async fn set_likes(&self, pet_id: &str, likes: i64) -> StoreResult<u64> {
        if self.fail.counter {
            return Err(broken("pets"));
        }
        *self.counter_writes.lock().unwrap() += 1;
        match self.likes.lock().unwrap().get_mut(pet_id) {
            Some(slot) => {
                *slot = likes;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn add_favorite(&self, pet_id: &str, user_id: &str) -> StoreResult<()> {
        if self.fail.relation {
            return Err(broken("favorites"));
        }
        self.favorites
            .lock()
            .unwrap()
            .insert((pet_id.to_string(), user_id.to_string()));
        Ok(())
    }

    async fn remove_favorite(&self, pet_id: &str, user_id: &str) -> StoreResult<u64> {
        if self.fail.relation {
            return Err(broken("favorites"));
        }
        let removed = self
            .favorites
            .lock()
            .unwrap()
            .remove(&(pet_id.to_string(), user_id.to_string()));
        Ok(removed as u64)
    }
}

fn like(pet: &str, user: &str, value: bool) -> LikeRequest {
    LikeRequest {
        pet_id: pet.into(),
        user_id: user.into(),
        value,
    }
}

#[tokio::test]
async fn like_increments_once_and_duplicate_is_informational() {
    let store = MemoryStore::with_pet("p1", 10);

    let outcome = toggle_like(&store, &like("p1", "u1", true), ConsistencyMode::default())
        .await
        .unwrap();
    assert_eq!(outcome.likes, 11);
    assert!(outcome.liked);
    assert!(store.liked("p1", "u1"));

    let err = toggle_like(&store, &like("p1", "u1", true), ConsistencyMode::default())
        .await
        .unwrap_err();
    assert!(err.is_already_in_state());
    assert_eq!(store.likes("p1"), 11);
    assert_eq!(store.counter_writes(), 1);

    let app: AppError = err.into();
    assert_eq!(app.code, MessageCode::AlreadyLiked);
    assert_eq!(app.status(), 200);
}

#[tokio::test]
async fn unlike_restores_counter_and_relation() {
    let store = MemoryStore::with_pet("p1", 10);
    toggle_like(&store, &like("p1", "u1", true), ConsistencyMode::default())
        .await
        .unwrap();

    let outcome = toggle_like(&store, &like("p1", "u1", false), ConsistencyMode::default())
        .await
        .unwrap();
    assert_eq!(outcome.likes, 10);
    assert!(!store.liked("p1", "u1"));
}

#[tokio::test]
async fn unlike_without_a_like_is_a_duplicate() {
    let store = MemoryStore::with_pet("p1", 3);
    let err = toggle_like(&store, &like("p1", "u1", false), ConsistencyMode::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LikeError::AlreadyInState { liked: false, .. }));
    assert_eq!(store.likes("p1"), 3);
}

#[tokio::test]
async fn likes_from_different_users_accumulate() {
    let store = MemoryStore::with_pet("p1", 0);
    for user in ["u1", "u2", "u3"] {
        toggle_like(&store, &like("p1", user, true), ConsistencyMode::default())
            .await
            .unwrap();
    }
    assert_eq!(store.likes("p1"), 3);
}

#[tokio::test]
async fn diverged_counter_is_decremented_as_stored() {
    let store = MemoryStore::with_pet("p1", 0);
    store
        .favorites
        .lock()
        .unwrap()
        .insert(("p1".into(), "u1".into()));

    let outcome = toggle_like(&store, &like("p1", "u1", false), ConsistencyMode::default())
        .await
        .unwrap();
    assert_eq!(outcome.likes, -1);
    assert_eq!(store.likes("p1"), -1);
    assert!(!store.liked("p1", "u1"));
}

#[tokio::test]
async fn missing_pet_is_reported_before_any_write() {
    let store = MemoryStore::default();
    let err = toggle_like(&store, &like("ghost", "u1", true), ConsistencyMode::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LikeError::ItemNotFound(ref id) if id == "ghost"));
    assert_eq!(store.counter_writes(), 0);
    assert!(!store.liked("ghost", "u1"));
}

#[tokio::test]
async fn read_failure_stops_at_checking_state() {
    let store = MemoryStore {
        fail: Failures {
            read: true,
            ..Default::default()
        },
        ..MemoryStore::with_pet("p1", 5)
    };
    let err = toggle_like(&store, &like("p1", "u1", true), ConsistencyMode::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LikeError::Step {
            step: SagaStep::CheckingState,
            ..
        }
    ));
    assert_eq!(err.message_code(), MessageCode::SelectFailed);
    assert_eq!(store.counter_writes(), 0);
}

#[tokio::test]
async fn counter_failure_leaves_relation_untouched() {
    let store = MemoryStore {
        fail: Failures {
            counter: true,
            ..Default::default()
        },
        ..MemoryStore::with_pet("p1", 5)
    };
    let err = toggle_like(&store, &like("p1", "u1", true), ConsistencyMode::BestEffort)
        .await
        .unwrap_err();
    assert_eq!(err.message_code(), MessageCode::UpdateFailed);
    assert!(!store.liked("p1", "u1"));
}

#[tokio::test]
async fn relation_failure_in_best_effort_mode_is_partial() {
    let store = MemoryStore {
        fail: Failures {
            relation: true,
            ..Default::default()
        },
        ..MemoryStore::with_pet("p1", 5)
    };
    let err = toggle_like(&store, &like("p1", "u1", true), ConsistencyMode::BestEffort)
        .await
        .unwrap_err();
    match err {
        LikeError::PartialFailure { counter_likes, .. } => assert_eq!(counter_likes, 6),
        other => panic!("expected partial failure, got {other:?}"),
    }
    // The counter write is not undone here.
    assert_eq!(store.likes("p1"), 6);
    assert!(!store.liked("p1", "u1"));
}

#[tokio::test]
async fn relation_failure_in_transactional_mode_names_the_step() {
    let store = MemoryStore {
        fail: Failures {
            relation: true,
            ..Default::default()
        },
        ..MemoryStore::with_pet("p1", 5)
    };
    let err = toggle_like(&store, &like("p1", "u1", false), ConsistencyMode::Transactional)
        .await;
    // Nothing liked yet, so unlike is a duplicate before the relation step.
    assert!(err.unwrap_err().is_already_in_state());

    store
        .favorites
        .lock()
        .unwrap()
        .insert(("p1".into(), "u1".into()));
    let err = toggle_like(&store, &like("p1", "u1", false), ConsistencyMode::Transactional)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LikeError::Step {
            step: SagaStep::SyncingRelation,
            liked: false,
            ..
        }
    ));
    assert_eq!(err.message_code(), MessageCode::FavoriteDeleteFailed);
}
