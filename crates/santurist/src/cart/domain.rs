use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payments::PaymentLink;
use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Food,
    Marketplace,
    Tour,
    Lodging,
}

/// One line in the cart. Items with the same id are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub kind: ItemKind,
    pub name: String,
    /// CLP per unit.
    pub unit_price: u64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl CartItem {
    pub fn line_total(&self) -> Result<u64, CartOverflow> {
        self.unit_price
            .checked_mul(u64::from(self.quantity))
            .ok_or(CartOverflow)
    }
}

/// Quantities or amounts that no longer fit the cart's integer totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cart quantities or amounts are too large")]
pub struct CartOverflow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Cart {
    const COLLECTION: &'static str = "carts";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Cart {
    pub fn empty(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
            updated_at: now,
        }
    }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartOverflow> {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or(CartOverflow)?;
            }
            None => self.items.push(item),
        }
        Ok(())
    }

    /// Sets an item's quantity, removing it at zero. Returns false for unknown items.
    pub fn update_quantity(&mut self, item_id: &str, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove_item(item_id);
        }
        match self.items.iter_mut().find(|item| item.id == item_id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn remove_item(&mut self, item_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn item_count(&self) -> Result<u32, CartOverflow> {
        self.items
            .iter()
            .try_fold(0u32, |count, item| count.checked_add(item.quantity))
            .ok_or(CartOverflow)
    }

    pub fn subtotal(&self) -> Result<u64, CartOverflow> {
        self.items.iter().try_fold(0u64, |total, item| {
            total.checked_add(item.line_total()?).ok_or(CartOverflow)
        })
    }

    pub fn has_food(&self) -> bool {
        self.items.iter().any(|item| item.kind == ItemKind::Food)
    }
}

/// Fees layered on top of the cart subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeConfig {
    pub delivery_fee: u64,
    pub delivery_enabled: bool,
    pub service_fee_percent: u32,
    pub free_delivery_threshold: Option<u64>,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            delivery_fee: 2_500,
            delivery_enabled: false,
            service_fee_percent: 12,
            free_delivery_threshold: None,
        }
    }
}

impl FeeConfig {
    /// Delivery is only charged for food below the free-delivery threshold.
    pub fn delivery_for(&self, cart: &Cart, subtotal: u64) -> u64 {
        let below_threshold = self
            .free_delivery_threshold
            .map_or(true, |threshold| subtotal < threshold);

        if self.delivery_enabled && cart.has_food() && below_threshold {
            self.delivery_fee
        } else {
            0
        }
    }

    /// Rounds half up to the nearest peso.
    pub fn service_fee_for(&self, subtotal: u64) -> Result<u64, CartOverflow> {
        let fee = (u128::from(subtotal) * u128::from(self.service_fee_percent) + 50) / 100;
        u64::try_from(fee).map_err(|_| CartOverflow)
    }

    pub fn summarize(&self, cart: &Cart) -> Result<CartSummary, CartOverflow> {
        let subtotal = cart.subtotal()?;
        let delivery_fee = self.delivery_for(cart, subtotal);
        let service_fee = self.service_fee_for(subtotal)?;
        let total = subtotal
            .checked_add(delivery_fee)
            .and_then(|total| total.checked_add(service_fee))
            .ok_or(CartOverflow)?;
        Ok(CartSummary {
            item_count: cart.item_count()?,
            subtotal,
            delivery_fee,
            service_fee,
            total,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    pub item_count: u32,
    pub subtotal: u64,
    pub delivery_fee: u64,
    pub service_fee: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    PaymentFailed,
}

impl OrderStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::PaymentFailed => "payment_failed",
        }
    }
}

/// Frozen copy of a cart at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub cart_id: String,
    pub items: Vec<CartItem>,
    pub summary: CartSummary,
    pub status: OrderStatus,
    pub payer_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderCheckout {
    pub order_id: String,
    pub preference_id: String,
    pub init_point: String,
    pub total_amount: u64,
}
