//! # petshop
//!
//! The data layer and like-toggle logic of the petshop backend.
//!
//! ## Layers
//!
//! - **DataStore**: generic select / count / insert / update / delete over a flat
//!   column map. Placeholders are written `:name` and bound positionally.
//! - **Repositories**: typed access to `pets`, `favorites`, `reservations` and
//!   `notifications`, generic over [`GenericClient`] so they run on a pooled
//!   connection or inside a transaction.
//! - **Saga**: [`toggle_like`] keeps the like counter and the favorites relation
//!   in step, transactionally by default.
//! - **Services**: repositories composed into caller-facing operations, with
//!   failures mapped to business [`MessageCode`]s.
//!
//! ```ignore
//! use petshop::{DataStore, values};
//!
//! let store = DataStore::new(&client);
//! let affected = store
//!     .update(
//!         "notifications",
//!         &values! { "unread" => false },
//!         "unread = :unread",
//!         &values! { "unread" => true },
//!     )
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod ident;
pub mod messages;
pub mod model;
pub mod monitor;
pub mod named;
pub mod params;
pub mod pool;
pub mod repository;
pub mod saga;
pub mod schema;
pub mod service;
pub mod statement;
pub mod store;
pub mod value;

pub use client::GenericClient;
pub use config::{AppConfig, ConfigError, ConsistencyMode, DbConfig, SslMode};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use filter::{CompiledFilter, Gender, PetFilter};
pub use messages::{AppError, ErrorBody, Locale, MessageCode};
pub use model::{Favorite, FromRecord, LikeRequest, NewReservation, Notification, Pet, Shop};
pub use monitor::{NoopMonitor, StatementContext, StatementOutcome, StoreMonitor, TracingMonitor};
pub use pool::{create_pool, ping};
pub use repository::{
    FavoriteMap, FavoriteRepository, NotificationRepository, PetRepository, ReservationRepository,
};
pub use saga::{LikeError, LikeOutcome, LikeStore, SagaStep, toggle_like};
pub use service::{NotificationService, PetService};
pub use store::{DataStore, StoreOptions};
pub use value::{Record, Value, ValueMap};
