pub mod checkout;
pub mod order_ids;

pub use checkout::{format_amount, order_total, CheckoutService};
pub use order_ids::OrderIdGenerator;
