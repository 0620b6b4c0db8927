//! Wire types for the commerce platform API.
//!
//! Every record here is remote-owned: the storefront deserializes
//! snapshots, never mutates them in place, and replaces them wholesale
//! after each mutation response.

use bookstall_core::{
    AddressId, CartId, CategoryId, CustomerId, DiscountCodeId, Email, LineItemId, LocalizedString,
    Money, ProductId, Version,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// Paging
// =============================================================================

/// A page of results from a query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedQueryResult<T> {
    pub limit: u32,
    pub offset: u32,
    /// Number of results in this page.
    pub count: u32,
    /// Total matches across all pages, when the platform reports it.
    #[serde(default)]
    pub total: Option<u64>,
    pub results: Vec<T>,
}

impl<T> PagedQueryResult<T> {
    /// An empty page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            limit: 0,
            offset: 0,
            count: 0,
            total: Some(0),
            results: Vec::new(),
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product-projection read model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductProjection {
    pub id: ProductId,
    pub name: LocalizedString,
    #[serde(default)]
    pub description: Option<LocalizedString>,
    pub slug: LocalizedString,
    pub master_variant: ProductVariant,
    #[serde(default)]
    pub categories: Vec<CategoryReference>,
}

impl ProductProjection {
    /// The current unit price: discounted when present, base otherwise.
    #[must_use]
    pub fn effective_price(&self) -> Option<Money> {
        self.master_variant
            .prices
            .first()
            .map(PriceEntry::effective)
    }
}

/// The default purchasable configuration of a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub prices: Vec<PriceEntry>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl ProductVariant {
    /// Look up an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    /// An attribute value as a string, when it is one.
    #[must_use]
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(serde_json::Value::as_str)
    }

    /// An attribute value as an integer, when it is one.
    #[must_use]
    pub fn attribute_i64(&self, name: &str) -> Option<i64> {
        self.attribute(name).and_then(serde_json::Value::as_i64)
    }
}

/// A base price with an optional discounted amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    pub value: Money,
    #[serde(default)]
    pub discounted: Option<DiscountedPrice>,
}

impl PriceEntry {
    /// Discounted amount when present, base amount otherwise.
    #[must_use]
    pub fn effective(&self) -> Money {
        self.discounted
            .as_ref()
            .map_or(self.value, |d| d.value)
    }
}

/// A server-computed discounted price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountedPrice {
    pub value: Money,
}

/// A product image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// A free-form variant attribute (author, page count, cover, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: serde_json::Value,
}

/// A category record with an optional parent pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: LocalizedString,
    #[serde(default)]
    pub parent: Option<CategoryReference>,
}

/// A typed reference to a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReference {
    pub id: CategoryId,
}

// =============================================================================
// Cart
// =============================================================================

/// A cart snapshot. Mutations require [`Cart::version`] and return a new
/// snapshot; the storefront never diffs or merges carts locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub version: Version,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub total_price: Money,
    #[serde(default)]
    pub discount_codes: Vec<DiscountCodeInfo>,
}

impl Cart {
    /// Sum of line-item quantities (the header badge count).
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.line_items
            .iter()
            .map(|item| item.quantity)
            .sum()
    }

    /// Whether the cart holds no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}

/// One product-and-quantity entry within a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub name: LocalizedString,
    pub quantity: u32,
    pub price: PriceEntry,
    pub total_price: Money,
}

impl LineItem {
    /// Line total from the unit price: (discounted-or-base) x quantity.
    #[must_use]
    pub fn computed_total(&self) -> Option<Money> {
        self.price.effective().checked_mul(i64::from(self.quantity))
    }
}

/// A discount code applied to a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCodeInfo {
    pub discount_code: DiscountCodeReference,
}

/// A typed reference to a discount code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCodeReference {
    pub type_id: String,
    pub id: DiscountCodeId,
}

impl DiscountCodeReference {
    /// Build the reference shape the platform expects in actions.
    #[must_use]
    pub fn new(id: DiscountCodeId) -> Self {
        Self {
            type_id: "discount-code".to_string(),
            id,
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer record. Version-guarded like [`Cart`].
///
/// Shipping/billing association and defaults live on the customer as
/// id-lists and id-scalars, not on the address itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub version: Version,
    pub email: Email,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub shipping_address_ids: Vec<AddressId>,
    #[serde(default)]
    pub billing_address_ids: Vec<AddressId>,
    #[serde(default)]
    pub default_shipping_address_id: Option<AddressId>,
    #[serde(default)]
    pub default_billing_address_id: Option<AddressId>,
}

impl Customer {
    /// Look up an address by id.
    #[must_use]
    pub fn address(&self, id: &AddressId) -> Option<&Address> {
        self.addresses.iter().find(|a| a.id.as_ref() == Some(id))
    }

    /// Whether the address id is in the shipping list.
    #[must_use]
    pub fn is_shipping(&self, id: &AddressId) -> bool {
        self.shipping_address_ids.contains(id)
    }

    /// Whether the address id is in the billing list.
    #[must_use]
    pub fn is_billing(&self, id: &AddressId) -> bool {
        self.billing_address_ids.contains(id)
    }
}

/// A postal address stored on a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Present on stored addresses, absent on drafts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AddressId>,
    pub street_name: String,
    pub postal_code: String,
    pub city: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

/// The result of a sign-in or sign-up call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSignInResult {
    pub customer: Customer,
    /// The active cart after any anonymous-cart merge.
    #[serde(default)]
    pub cart: Option<Cart>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookstall_core::CurrencyCode;

    use super::*;

    fn price(cents: i64) -> PriceEntry {
        PriceEntry {
            value: Money::from_cents(cents, CurrencyCode::EUR),
            discounted: None,
        }
    }

    #[test]
    fn test_effective_price_prefers_discount() {
        let mut entry = price(2000);
        assert_eq!(entry.effective().cent_amount, 2000);
        entry.discounted = Some(DiscountedPrice {
            value: Money::from_cents(1500, CurrencyCode::EUR),
        });
        assert_eq!(entry.effective().cent_amount, 1500);
    }

    #[test]
    fn test_cart_total_quantity() {
        let cart: Cart = serde_json::from_value(serde_json::json!({
            "id": "cart-1",
            "version": 3,
            "lineItems": [
                {
                    "id": "li-1",
                    "productId": "p-1",
                    "name": {"en": "Dune"},
                    "quantity": 2,
                    "price": {"value": {"centAmount": 1200, "currencyCode": "EUR"}},
                    "totalPrice": {"centAmount": 2400, "currencyCode": "EUR"}
                },
                {
                    "id": "li-2",
                    "productId": "p-2",
                    "name": {"en": "Solaris"},
                    "quantity": 1,
                    "price": {"value": {"centAmount": 900, "currencyCode": "EUR"}},
                    "totalPrice": {"centAmount": 900, "currencyCode": "EUR"}
                }
            ],
            "totalPrice": {"centAmount": 3300, "currencyCode": "EUR"}
        }))
        .unwrap();

        assert_eq!(cart.total_quantity(), 3);
        assert!(!cart.is_empty());
        assert_eq!(
            cart.line_items[0].computed_total().unwrap().cent_amount,
            2400
        );
    }

    #[test]
    fn test_variant_attribute_lookup() {
        let variant: ProductVariant = serde_json::from_value(serde_json::json!({
            "sku": "BOOK-001",
            "attributes": [
                {"name": "author", "value": "Frank Herbert"},
                {"name": "pages", "value": 412}
            ]
        }))
        .unwrap();

        assert_eq!(variant.attribute_str("author"), Some("Frank Herbert"));
        assert_eq!(variant.attribute_i64("pages"), Some(412));
        assert!(variant.attribute("publisher").is_none());
    }

    #[test]
    fn test_customer_membership_helpers() {
        let customer: Customer = serde_json::from_value(serde_json::json!({
            "id": "c-1",
            "version": 5,
            "email": "reader@example.com",
            "addresses": [
                {"id": "a-1", "streetName": "Main St 1", "postalCode": "123456", "city": "Berlin", "country": "DE"}
            ],
            "shippingAddressIds": ["a-1"],
            "billingAddressIds": [],
            "defaultShippingAddressId": "a-1"
        }))
        .unwrap();

        let id = AddressId::new("a-1");
        assert!(customer.is_shipping(&id));
        assert!(!customer.is_billing(&id));
        assert_eq!(
            customer.default_shipping_address_id.as_ref(),
            Some(&id)
        );
        assert!(customer.address(&id).is_some());
    }

    #[test]
    fn test_discount_code_reference_shape() {
        let reference = DiscountCodeReference::new(DiscountCodeId::new("dc-1"));
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["typeId"], "discount-code");
        assert_eq!(json["id"], "dc-1");
    }
}
