use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::customer::Customer;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_number: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub canceled: bool,
    pub car_model: String,
    pub customer: Customer,
}

impl Booking {
    pub fn mark_canceled(&mut self) {
        self.canceled = true;
    }
}
