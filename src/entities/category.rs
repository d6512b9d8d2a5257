// 🏷️ Category Entity - expense category with a short accounting code
//
// "Name is what the user reads, code is what the accountant reads"

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category row
///
/// Identity: `uuid` (database-wide), `id` (table-local)
/// Values: name, code
/// Ordering: `custom_order_id`, ties broken by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,

    /// Short code exported to accounting (e.g. "DINN", "AIRP")
    pub code: String,

    pub custom_order_id: i64,
    pub uuid: Uuid,
}

impl Category {
    pub fn new(id: i64, name: &str, code: &str, custom_order_id: i64) -> Self {
        Category {
            id,
            name: name.to_string(),
            code: code.to_string(),
            custom_order_id,
            uuid: Uuid::new_v4(),
        }
    }
}

/// Categories seeded into a brand-new database, (name, code)
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("<Category>", "NUL"),
    ("Airfare", "AIRP"),
    ("Books/Periodicals", "ZBKP"),
    ("Breakfast", "BRFT"),
    ("Car Rental", "RCAR"),
    ("Cell Phone", "ZCEL"),
    ("Dinner", "DINN"),
    ("Dues/Subscriptions", "ZDUE"),
    ("Entertainment", "ENT"),
    ("Gasoline", "GAS"),
    ("Gift", "GIFT"),
    ("Hotel", "HTL"),
    ("Laundry", "LAUN"),
    ("Lunch", "LNCH"),
    ("Meals (Justified)", "ZMEO"),
    ("Other", "MISC"),
    ("Parking/Tolls", "PARK"),
    ("Postage/Shipping", "POST"),
    ("Stationery/Stations", "ZSTS"),
    ("Taxi/Bus", "TAXI"),
    ("Telephone/Fax", "TELE"),
    ("Tip", "TIP"),
    ("Train", "TRN"),
    ("Training Fees", "ZTRN"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories_are_sorted_by_name() {
        let names: Vec<&str> = DEFAULT_CATEGORIES.iter().map(|(name, _)| *name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted, "Defaults should already be in byte order");
        assert_eq!(names.len(), 24);
    }

    #[test]
    fn test_new_category_gets_fresh_uuid() {
        let a = Category::new(1, "Dinner", "DINN", 0);
        let b = Category::new(1, "Dinner", "DINN", 0);
        assert_ne!(a.uuid, b.uuid);
        assert_ne!(a, b);
    }
}
