use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{
    Cart, CartItem, CartOverflow, CartSummary, FeeConfig, Order, OrderCheckout, OrderStatus,
};
use crate::payments::{
    PaymentError, PaymentGateway, PaymentReference, PaymentStatus, PreferenceItem,
    PreferenceRequest,
};
use crate::store::{RepositoryError, Store};

/// Cart contents with the totals the checkout screen renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub cart: Cart,
    pub summary: CartSummary,
}

pub struct CartService {
    store: Store,
    gateway: Arc<dyn PaymentGateway>,
    fees: FeeConfig,
}

impl CartService {
    pub fn new(store: Store, gateway: Arc<dyn PaymentGateway>, fees: FeeConfig) -> Self {
        Self {
            store,
            gateway,
            fees,
        }
    }

    pub fn fees(&self) -> &FeeConfig {
        &self.fees
    }

    /// Unknown carts read as empty; they are only written once an item is added.
    pub fn view(&self, cart_id: &str, now: DateTime<Utc>) -> Result<CartView, CartError> {
        let cart = self.load(cart_id, now)?;
        self.render(cart)
    }

    pub fn add_item(
        &self,
        cart_id: &str,
        item: CartItem,
        now: DateTime<Utc>,
    ) -> Result<CartView, CartError> {
        if item.id.trim().is_empty() || item.name.trim().is_empty() {
            return Err(CartError::InvalidItem("item id and name are required"));
        }
        if item.quantity == 0 {
            return Err(CartError::InvalidItem("quantity must be at least 1"));
        }

        let mut cart = self.load(cart_id, now)?;
        cart.add_item(item)?;
        self.save(cart, now)
    }

    pub fn update_quantity(
        &self,
        cart_id: &str,
        item_id: &str,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<CartView, CartError> {
        let mut cart = self.load(cart_id, now)?;
        if !cart.update_quantity(item_id, quantity) {
            return Err(CartError::ItemNotFound {
                item_id: item_id.to_string(),
            });
        }
        self.save(cart, now)
    }

    pub fn remove_item(
        &self,
        cart_id: &str,
        item_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CartView, CartError> {
        let mut cart = self.load(cart_id, now)?;
        if !cart.remove_item(item_id) {
            return Err(CartError::ItemNotFound {
                item_id: item_id.to_string(),
            });
        }
        self.save(cart, now)
    }

    pub fn clear(&self, cart_id: &str, now: DateTime<Utc>) -> Result<CartView, CartError> {
        let mut cart = self.load(cart_id, now)?;
        cart.clear();
        self.save(cart, now)
    }

    /// Freeze the cart into an order and request a checkout link for its total.
    ///
    /// The cart is emptied only once the payment link exists; a gateway failure leaves it
    /// intact and marks the order `payment_failed`.
    pub async fn checkout(
        &self,
        cart_id: &str,
        payer_email: &str,
        now: DateTime<Utc>,
    ) -> Result<OrderCheckout, CartError> {
        let payer_email = payer_email.trim();
        match payer_email.split_once('@') {
            Some((user, domain)) if !user.is_empty() && domain.contains('.') => {}
            _ => return Err(CartError::InvalidEmail),
        }

        let cart = self.load(cart_id, now)?;
        if cart.items.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let summary = self.fees.summarize(&cart)?;
        let order = self.store.orders.insert(Order {
            id: Uuid::new_v4().to_string(),
            cart_id: cart.id.clone(),
            items: cart.items.clone(),
            summary,
            status: OrderStatus::PendingPayment,
            payer_email: payer_email.to_string(),
            payment: None,
            payment_id: None,
            created_at: now,
            updated_at: now,
        })?;

        let request = PreferenceRequest {
            external_reference: PaymentReference::Order(order.id.clone()),
            items: preference_items(&order),
            payer_email: order.payer_email.clone(),
        };

        match self.gateway.create_preference(&request).await {
            Ok(payment) => {
                let mut order = order;
                order.payment = Some(payment.clone());
                order.updated_at = now;
                self.store.orders.update(order.clone())?;
                self.save(Cart::empty(cart.id, now), now)?;
                info!(order_id = %order.id, total = order.summary.total, "order awaiting payment");
                Ok(OrderCheckout {
                    order_id: order.id,
                    preference_id: payment.preference_id,
                    init_point: payment.init_point,
                    total_amount: order.summary.total,
                })
            }
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "payment preference failed for order");
                let mut failed = order;
                failed.status = OrderStatus::PaymentFailed;
                failed.updated_at = now;
                self.store.orders.update(failed)?;
                Err(CartError::Payment(err))
            }
        }
    }

    pub fn get_order(&self, order_id: &str) -> Result<Order, CartError> {
        Ok(self.store.orders.require(order_id)?)
    }

    /// Only pending orders move; repeated notifications return the stored order.
    pub fn apply_payment_notification(
        &self,
        order_id: &str,
        status: PaymentStatus,
        payment_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Order, CartError> {
        let mut order = self.store.orders.require(order_id)?;
        order.status = match (order.status, status) {
            (OrderStatus::PendingPayment, PaymentStatus::Approved) => {
                order.payment_id = payment_id;
                info!(order_id, "order paid");
                OrderStatus::Paid
            }
            (OrderStatus::PendingPayment, PaymentStatus::Rejected | PaymentStatus::Cancelled) => {
                warn!(order_id, ?status, "order payment did not complete");
                OrderStatus::PaymentFailed
            }
            _ => return Ok(order),
        };
        order.updated_at = now;
        self.store.orders.update(order.clone())?;
        Ok(order)
    }

    fn load(&self, cart_id: &str, now: DateTime<Utc>) -> Result<Cart, CartError> {
        Ok(self
            .store
            .carts
            .fetch(cart_id)?
            .unwrap_or_else(|| Cart::empty(cart_id, now)))
    }

    /// Carts whose totals overflow are rejected before they are stored.
    fn save(&self, mut cart: Cart, now: DateTime<Utc>) -> Result<CartView, CartError> {
        let summary = self.fees.summarize(&cart)?;
        cart.updated_at = now;
        self.store.carts.upsert(cart.clone())?;
        Ok(CartView { cart, summary })
    }

    fn render(&self, cart: Cart) -> Result<CartView, CartError> {
        let summary = self.fees.summarize(&cart)?;
        Ok(CartView { cart, summary })
    }
}

fn preference_items(order: &Order) -> Vec<PreferenceItem> {
    let mut items: Vec<PreferenceItem> = order
        .items
        .iter()
        .map(|item| PreferenceItem {
            title: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();

    for (title, amount) in [
        ("Despacho", order.summary.delivery_fee),
        ("Tarifa de servicio", order.summary.service_fee),
    ] {
        if amount > 0 {
            items.push(PreferenceItem {
                title: title.to_string(),
                quantity: 1,
                unit_price: amount,
            });
        }
    }
    items
}

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("invalid cart item: {0}")]
    InvalidItem(&'static str),
    #[error("item {item_id} is not in the cart")]
    ItemNotFound { item_id: String },
    #[error("cannot check out an empty cart")]
    EmptyCart,
    #[error("payer email must be a valid address")]
    InvalidEmail,
    #[error(transparent)]
    Overflow(#[from] CartOverflow),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
