use crate::format::Price;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Mileage travelled for a trip, priced at `rate` per unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distance {
    pub id: i64,
    pub trip_id: i64,
    pub location: String,
    pub distance: Decimal,
    pub rate: Price,
    pub date: i64,
    pub timezone: String,
    pub comment: String,
    pub uuid: Uuid,
}

impl Distance {
    pub fn total(&self) -> Price {
        Price::new(self.distance * self.rate.amount, self.rate.currency.clone())
    }
}
