//! Typed table and column descriptors.
//!
//! The data store speaks in flat string-keyed maps; repositories build those
//! maps through [`Assignments`] so every key comes from a closed per-table enum.

use std::fmt;
use std::marker::PhantomData;

use crate::value::{Value, ValueMap};

/// A column of one table.
pub trait Column: Copy + fmt::Debug + Send + Sync + 'static {
    /// Backend column name.
    fn name(self) -> &'static str;
}

/// A backend table and its column set.
pub trait Table {
    type Column: Column;

    /// Backend table name.
    const NAME: &'static str;

    /// Identity column, skipped on insert.
    const ID: Self::Column;

    /// Default ordering for unconditional listings.
    const DEFAULT_ORDER: &'static str;
}

macro_rules! columns {
    (
        $(#[$meta:meta])*
        $enum:ident for $table:ident ($table_name:literal, order = $order:literal) {
            $($variant:ident => $col:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $enum {
            $($variant),+
        }

        impl $enum {
            pub const ALL: &'static [$enum] = &[$($enum::$variant),+];
        }

        impl Column for $enum {
            fn name(self) -> &'static str {
                match self {
                    $($enum::$variant => $col),+
                }
            }
        }

        impl fmt::Display for $enum {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        #[derive(Debug, Clone, Copy)]
        pub struct $table;

        impl Table for $table {
            type Column = $enum;
            const NAME: &'static str = $table_name;
            const ID: $enum = $enum::Id;
            const DEFAULT_ORDER: &'static str = $order;
        }
    };
}

columns! {
    /// Columns of `pets`.
    PetColumn for Pets ("pets", order = "id") {
        Id => "id",
        Name => "name",
        Breed => "breed",
        Gender => "gender",
        Price => "price",
        ImageUrl => "image_url",
        Likes => "likes",
        ShopName => "shop_name",
        ShopLocation => "shop_location",
        BirthDate => "birth_date",
        ReferenceNumber => "reference_number",
        Tags => "tags",
        CreatedAt => "created_at",
        UpdatedAt => "updated_at",
    }
}

columns! {
    /// Columns of `favorites`: one row per (pet, user) like.
    FavoriteColumn for Favorites ("favorites", order = "id") {
        Id => "id",
        PetId => "pet_id",
        UserId => "user_id",
    }
}

columns! {
    /// Columns of `reservations`.
    ReservationColumn for Reservations ("reservations", order = "id") {
        Id => "id",
        PetId => "pet_id",
        UserId => "user_id",
        Email => "email",
        UserName => "user_name",
        ReservationDatetime => "reservation_datetime",
    }
}

columns! {
    /// Columns of `notifications`.
    NotificationColumn for Notifications ("notifications", order = "id desc") {
        Id => "id",
        Title => "title",
        Description => "description",
        Category => "category",
        Unread => "unread",
        CreatedAt => "created_at",
        UpdatedAt => "updated_at",
    }
}

/// A typed builder for the [`ValueMap`] passed to insert/update/delete.
#[derive(Debug, Clone)]
pub struct Assignments<T: Table> {
    values: ValueMap,
    _table: PhantomData<T>,
}

impl<T: Table> Default for Assignments<T> {
    fn default() -> Self {
        Self {
            values: ValueMap::new(),
            _table: PhantomData,
        }
    }
}

impl<T: Table> Assignments<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a column. Later assignments to the same column win.
    pub fn set(mut self, column: T::Column, value: impl Into<Value>) -> Self {
        self.values.insert(column.name().to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_map(self) -> ValueMap {
        self.values
    }
}

/// Render a `column = :column` predicate for a typed column.
pub fn eq_predicate<C: Column>(column: C) -> String {
    format!("{0} = :{0}", column.name())
}
