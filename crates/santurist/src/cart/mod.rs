//! Shopping cart totals and order checkout.

pub mod domain;
pub mod router;
pub mod service;


pub use domain::{
    Cart, CartItem, CartOverflow, CartSummary, FeeConfig, ItemKind, Order, OrderCheckout,
    OrderStatus,
};
pub use router::cart_router;
pub use service::{CartError, CartService, CartView};
