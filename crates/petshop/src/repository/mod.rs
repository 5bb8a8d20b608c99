//! Per-table repositories over a [`DataStore`](crate::DataStore).
//!
//! Repositories borrow the store, so the same code runs over a pooled
//! connection or inside a transaction depending on which store is passed in.

mod favorites;
mod notifications;
mod pets;
mod reservations;

pub use favorites::{FavoriteMap, FavoriteRepository};
pub use notifications::NotificationRepository;
pub use pets::PetRepository;
pub use reservations::{RESERVATION_DATE_FORMAT, ReservationRepository};
