//! Cart client.
//!
//! Every mutation posts `{version, actions}` against the active cart and
//! returns the authoritative post-mutation snapshot. Callers never apply
//! two mutations concurrently; the in-flight guard lives in the cart
//! orchestrator. On a version conflict the client refetches the active
//! cart and replays the action list once before giving up.

use async_trait::async_trait;
use bookstall_core::{CurrencyCode, DiscountCodeId, LineItemId, ProductId, Version};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::commerce::http::CommerceHttp;
use crate::commerce::types::{Cart, DiscountCodeReference};
use crate::commerce::{CommerceError, MUTATION_ATTEMPTS, retry_on_conflict};

/// A single cart mutation in the platform's action vocabulary.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CartUpdateAction {
    #[serde(rename_all = "camelCase")]
    AddLineItem { product_id: ProductId, quantity: u32 },
    #[serde(rename_all = "camelCase")]
    ChangeLineItemQuantity {
        line_item_id: LineItemId,
        quantity: u32,
    },
    #[serde(rename_all = "camelCase")]
    RemoveLineItem {
        line_item_id: LineItemId,
        #[serde(skip_serializing_if = "Option::is_none")]
        quantity: Option<u32>,
    },
    AddDiscountCode { code: String },
    #[serde(rename_all = "camelCase")]
    RemoveDiscountCode { discount_code: DiscountCodeReference },
    Recalculate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartDraft {
    currency: CurrencyCode,
}

#[derive(Serialize)]
struct CartUpdate<'a> {
    version: Version,
    actions: &'a [CartUpdateAction],
}

/// Seam between the cart orchestrator and the remote cart endpoints.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Fetch the active cart, creating an empty one when none exists.
    async fn active_cart(&self) -> Result<Cart, CommerceError>;

    /// Apply an action list to the active cart and return the new
    /// snapshot. Handles version lookup and the bounded conflict retry.
    async fn mutate(&self, actions: Vec<CartUpdateAction>) -> Result<Cart, CommerceError>;

    /// Remove every line item in one bulk action list. An already-empty
    /// cart is returned unchanged.
    async fn clear(&self) -> Result<Cart, CommerceError>;
}

/// Client for the my-cart endpoints.
#[derive(Clone)]
pub struct CartClient {
    http: CommerceHttp,
}

impl CartClient {
    /// Create a new cart client on shared HTTP plumbing.
    #[must_use]
    pub const fn new(http: CommerceHttp) -> Self {
        Self { http }
    }

    /// Create a new empty cart in the store currency.
    async fn create(&self) -> Result<Cart, CommerceError> {
        let draft = CartDraft {
            currency: self.http.config().currency,
        };
        self.http.post_json("me/carts", &draft).await
    }

    /// Post an action list keyed to the given version.
    async fn update(
        &self,
        cart: &Cart,
        actions: &[CartUpdateAction],
    ) -> Result<Cart, CommerceError> {
        let body = CartUpdate {
            version: cart.version,
            actions,
        };
        self.http
            .post_json(&format!("me/carts/{}", cart.id), &body)
            .await
    }

}

#[async_trait]
impl CartApi for CartClient {
    #[instrument(skip(self))]
    async fn active_cart(&self) -> Result<Cart, CommerceError> {
        match self.http.get_json::<Cart>("me/active-cart", &[]).await {
            Err(CommerceError::NotFound(_)) => {
                debug!("No active cart, creating one");
                self.create().await
            }
            other => other,
        }
    }

    #[instrument(skip(self, actions))]
    async fn mutate(&self, actions: Vec<CartUpdateAction>) -> Result<Cart, CommerceError> {
        let actions = &actions;
        retry_on_conflict(MUTATION_ATTEMPTS, move |_attempt| async move {
            let cart = self.active_cart().await?;
            self.update(&cart, actions).await
        })
        .await
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<Cart, CommerceError> {
        retry_on_conflict(MUTATION_ATTEMPTS, move |_attempt| async move {
            let cart = self.active_cart().await?;
            if cart.is_empty() {
                return Ok(cart);
            }
            // Rebuild the removals from the fresh snapshot each attempt so
            // a conflicting change never leaves dangling line item ids
            let actions: Vec<CartUpdateAction> = cart
                .line_items
                .iter()
                .map(|item| CartUpdateAction::RemoveLineItem {
                    line_item_id: item.id.clone(),
                    quantity: None,
                })
                .collect();
            self.update(&cart, &actions).await
        })
        .await
    }
}
