//! Cart orchestrator.
//!
//! Holds the cart snapshot the UI renders and serializes mutations: at
//! most one mutation per line item is in flight at a time, and a failed
//! mutation leaves the last good snapshot in place. The header badge is
//! recomputed from the authoritative snapshot after every success.

use std::collections::HashSet;

use bookstall_core::{DiscountCodeId, LineItemId, ProductId};
use tracing::{debug, warn};

use crate::commerce::types::{Cart, DiscountCodeReference};
use crate::commerce::{CartUpdateAction, CommerceError};
use crate::controllers::Notice;
use crate::state::AppState;

/// The cart page state machine.
pub struct CartController {
    state: AppState,
    cart: Option<Cart>,
    busy: HashSet<LineItemId>,
    notice: Option<Notice>,
}

impl CartController {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            cart: None,
            busy: HashSet::new(),
            notice: None,
        }
    }

    /// The last good cart snapshot.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        self.cart.as_ref()
    }

    /// Whether a mutation for this line item is in flight.
    #[must_use]
    pub fn is_busy(&self, line_item_id: &LineItemId) -> bool {
        self.busy.contains(line_item_id)
    }

    /// Take the pending notice, clearing it.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Fetch (or lazily create) the active cart.
    pub async fn load(&mut self) {
        let result = self.state.cart().active_cart().await;
        match result {
            Ok(cart) => self.accept(cart),
            Err(e) => {
                warn!(error = %e, "Failed to load cart");
                self.notice = Some(Notice::error("Could not load your cart"));
            }
        }
    }

    /// Add a product to the cart.
    pub async fn add_to_cart(&mut self, product_id: ProductId, quantity: u32) {
        let action = CartUpdateAction::AddLineItem {
            product_id,
            quantity,
        };
        if self.mutate(vec![action]).await {
            self.notice = Some(Notice::info("Added to cart"));
        }
    }

    /// Raise a line item's quantity by one.
    pub async fn increment(&mut self, line_item_id: LineItemId) {
        let Some(quantity) = self.quantity_of(&line_item_id) else {
            return;
        };
        self.mutate_line(line_item_id.clone(), CartUpdateAction::ChangeLineItemQuantity {
            line_item_id,
            quantity: quantity + 1,
        })
        .await;
    }

    /// Lower a line item's quantity by one, removing it at one.
    pub async fn decrement(&mut self, line_item_id: LineItemId) {
        let Some(quantity) = self.quantity_of(&line_item_id) else {
            return;
        };
        let action = if quantity <= 1 {
            CartUpdateAction::RemoveLineItem {
                line_item_id: line_item_id.clone(),
                quantity: None,
            }
        } else {
            CartUpdateAction::ChangeLineItemQuantity {
                line_item_id: line_item_id.clone(),
                quantity: quantity - 1,
            }
        };
        self.mutate_line(line_item_id, action).await;
    }

    /// Remove a line item entirely.
    pub async fn remove(&mut self, line_item_id: LineItemId) {
        self.mutate_line(line_item_id.clone(), CartUpdateAction::RemoveLineItem {
            line_item_id,
            quantity: None,
        })
        .await;
    }

    /// Empty the cart.
    pub async fn clear(&mut self) {
        let result = self.state.cart().clear().await;
        match result {
            Ok(cart) => {
                self.accept(cart);
                self.notice = Some(Notice::info("Cart cleared"));
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear cart");
                self.notice = Some(Notice::error("Could not clear your cart"));
            }
        }
    }

    /// Apply a discount code.
    pub async fn apply_promo(&mut self, code: String) {
        let action = CartUpdateAction::AddDiscountCode { code };
        let result = self.state.cart().mutate(vec![action]).await;
        match result {
            Ok(cart) => {
                self.accept(cart);
                self.notice = Some(Notice::info("Discount applied"));
            }
            Err(CommerceError::Api { codes, .. })
                if codes.iter().any(|c| c == "DiscountCodeNonApplicable") =>
            {
                self.notice = Some(Notice::error("This code is not valid"));
            }
            Err(e) => {
                warn!(error = %e, "Failed to apply discount code");
                self.notice = Some(Notice::error("Could not apply the code"));
            }
        }
    }

    /// Remove an applied discount code.
    pub async fn remove_promo(&mut self, id: DiscountCodeId) {
        let action = CartUpdateAction::RemoveDiscountCode {
            discount_code: DiscountCodeReference::new(id),
        };
        if self.mutate(vec![action]).await {
            self.notice = Some(Notice::info("Discount removed"));
        }
    }

    fn quantity_of(&self, line_item_id: &LineItemId) -> Option<u32> {
        self.cart
            .as_ref()?
            .line_items
            .iter()
            .find(|item| &item.id == line_item_id)
            .map(|item| item.quantity)
    }

    /// Run a line-scoped mutation under the per-line in-flight guard.
    async fn mutate_line(&mut self, line_item_id: LineItemId, action: CartUpdateAction) {
        if !self.busy.insert(line_item_id.clone()) {
            debug!(line_item_id = %line_item_id, "Mutation already in flight, ignoring");
            return;
        }
        self.mutate(vec![action]).await;
        self.busy.remove(&line_item_id);
    }

    /// Run a mutation; returns whether it succeeded.
    async fn mutate(&mut self, actions: Vec<CartUpdateAction>) -> bool {
        let result = self.state.cart().mutate(actions).await;
        match result {
            Ok(cart) => {
                self.accept(cart);
                true
            }
            Err(e) => {
                warn!(error = %e, "Cart mutation failed");
                self.notice = Some(Notice::error("Could not update your cart"));
                false
            }
        }
    }

    /// Adopt an authoritative snapshot and recompute the badge.
    fn accept(&mut self, cart: Cart) {
        self.state.badge().set(u64::from(cart.total_quantity()));
        self.cart = Some(cart);
    }
}
