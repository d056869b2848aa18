pub mod checkout;
pub mod common;
pub mod health;
pub mod products;
