pub mod checkout;
pub mod product;

pub use checkout::{CheckoutPayload, CheckoutRequest, CheckoutResponse, CheckoutResult, OrderSummary};
pub use product::{Product, ProductView, Specification};
