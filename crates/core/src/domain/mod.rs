pub mod booking;
pub mod customer;
