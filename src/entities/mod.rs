// Entity Models
// Every domain row carries a stable UUID next to its integer key.
//
// Each entity has:
// - Integer primary key (local to one table)
// - UUID identity (unique across the whole database)
// - Custom ordering key where the user can reorder the list

pub mod category;
pub mod column;
pub mod distance;
pub mod payment_method;
pub mod receipt;
pub mod trip;

pub use category::Category;
pub use column::{Column, ColumnType};
pub use distance::Distance;
pub use payment_method::PaymentMethod;
pub use receipt::Receipt;
pub use trip::Trip;

use uuid::Uuid;

/// Anything addressable by a database-wide unique identifier
pub trait Keyed {
    fn uuid(&self) -> &Uuid;
}

macro_rules! impl_keyed {
    ($($entity:ty),* $(,)?) => {
        $(
            impl Keyed for $entity {
                fn uuid(&self) -> &Uuid {
                    &self.uuid
                }
            }
        )*
    };
}

impl_keyed!(Category, Column, Distance, PaymentMethod, Receipt, Trip);
