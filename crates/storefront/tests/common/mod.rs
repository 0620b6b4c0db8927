//! In-memory fake of the commerce platform for integration tests.
//!
//! Implements the three API seams over shared mutable state. Versioned
//! resources advance by exactly one per successful mutation, mirroring
//! the platform's optimistic concurrency contract.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bookstall_core::{AddressId, CurrencyCode, CustomerId, Email, Money, Version};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use bookstall_storefront::commerce::types::{
    Address, Cart, Category, Customer, PagedQueryResult, ProductProjection,
};
use bookstall_storefront::commerce::{
    AddressAssignment, CartApi, CartUpdateAction, CatalogApi, CommerceError, CustomerApi,
    CustomerDraft, CustomerUpdateAction, ProductSearchRequest, ProfileUpdate, SignInOutcome,
    SortKey, plan_address_assignment,
};
use bookstall_storefront::session::MemorySessionStorage;
use bookstall_storefront::{AppState, CommerceConfig};

/// Discount code the fake accepts (10% off).
pub const VALID_PROMO: &str = "SAVE10";

#[derive(Default)]
struct FakeState {
    products: Vec<ProductProjection>,
    categories: Vec<Category>,
    cart: Option<Cart>,
    customers: HashMap<String, (String, Customer)>,
    refresh_tokens: HashMap<String, String>,
    signed_in: Option<String>,
    next_id: u64,
    /// When set, every cart mutation fails with this many remote errors.
    fail_cart_mutations: bool,
    /// When set, searches fail.
    fail_search: bool,
}

#[derive(Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<FakeState>>,
}

fn remote_down() -> CommerceError {
    CommerceError::Api {
        status: 502,
        message: "upstream unavailable".to_string(),
        codes: Vec::new(),
    }
}

impl FakePlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    fn fresh_id(state: &mut FakeState, prefix: &str) -> String {
        state.next_id += 1;
        format!("{prefix}-{}", state.next_id)
    }

    pub fn seed_product(&self, id: &str, name: &str, author: &str, cents: i64, category: &str) {
        let product: ProductProjection = serde_json::from_value(json!({
            "id": id,
            "name": {"en": name},
            "slug": {"en": id},
            "masterVariant": {
                "sku": format!("SKU-{id}"),
                "prices": [{"value": {"centAmount": cents, "currencyCode": "EUR"}}],
                "attributes": [{"name": "author", "value": author}]
            },
            "categories": [{"id": category}]
        }))
        .expect("valid product fixture");
        self.lock().products.push(product);
    }

    pub fn seed_category(&self, id: &str, name: &str, parent: Option<&str>) {
        let category: Category = serde_json::from_value(json!({
            "id": id,
            "name": {"en": name},
            "parent": parent.map(|p| json!({"id": p})),
        }))
        .expect("valid category fixture");
        self.lock().categories.push(category);
    }

    pub fn seed_customer(&self, email: &str, password: &str) {
        let customer: Customer = serde_json::from_value(json!({
            "id": format!("cust-{email}"),
            "version": 1,
            "email": email,
        }))
        .expect("valid customer fixture");
        self.lock()
            .customers
            .insert(email.to_string(), (password.to_string(), customer));
    }

    pub fn set_fail_cart_mutations(&self, fail: bool) {
        self.lock().fail_cart_mutations = fail;
    }

    pub fn set_fail_search(&self, fail: bool) {
        self.lock().fail_search = fail;
    }

    /// The raw cart version, for concurrency assertions.
    #[must_use]
    pub fn cart_version(&self) -> Option<u64> {
        self.lock().cart.as_ref().map(|c| c.version.get())
    }

    /// The stored customer record for an email.
    #[must_use]
    pub fn customer_record(&self, email: &str) -> Option<Customer> {
        self.lock().customers.get(email).map(|(_, c)| c.clone())
    }

    fn empty_cart(state: &mut FakeState) -> Cart {
        let id = Self::fresh_id(state, "cart");
        serde_json::from_value(json!({
            "id": id,
            "version": 1,
            "lineItems": [],
            "totalPrice": {"centAmount": 0, "currencyCode": "EUR"},
            "discountCodes": []
        }))
        .expect("valid empty cart")
    }

    fn recompute_total(cart: &mut Cart) {
        let subtotal: i64 = cart
            .line_items
            .iter()
            .map(|item| item.total_price.cent_amount)
            .sum();
        let total = if cart.discount_codes.is_empty() {
            subtotal
        } else {
            subtotal - subtotal / 10
        };
        cart.total_price = Money::from_cents(total, CurrencyCode::EUR);
    }

    fn apply_cart_action(
        state: &mut FakeState,
        cart: &mut Cart,
        action: &CartUpdateAction,
    ) -> Result<(), CommerceError> {
        match action {
            CartUpdateAction::AddLineItem {
                product_id,
                quantity,
            } => {
                let product = state
                    .products
                    .iter()
                    .find(|p| &p.id == product_id)
                    .ok_or_else(|| CommerceError::NotFound(product_id.to_string()))?;
                let unit = product
                    .effective_price()
                    .ok_or_else(|| CommerceError::NotFound("price".to_string()))?;
                if let Some(existing) = cart
                    .line_items
                    .iter_mut()
                    .find(|item| &item.product_id == product_id)
                {
                    existing.quantity += quantity;
                    existing.total_price =
                        Money::from_cents(unit.cent_amount * i64::from(existing.quantity), unit.currency_code);
                } else {
                    let name = serde_json::to_value(&product.name).expect("name");
                    let line_id = Self::fresh_id(state, "li");
                    let item = serde_json::from_value(json!({
                        "id": line_id,
                        "productId": product_id,
                        "name": name,
                        "quantity": quantity,
                        "price": {"value": {"centAmount": unit.cent_amount, "currencyCode": "EUR"}},
                        "totalPrice": {"centAmount": unit.cent_amount * i64::from(*quantity), "currencyCode": "EUR"}
                    }))
                    .expect("valid line item");
                    cart.line_items.push(item);
                }
                Ok(())
            }
            CartUpdateAction::ChangeLineItemQuantity {
                line_item_id,
                quantity,
            } => {
                let item = cart
                    .line_items
                    .iter_mut()
                    .find(|item| &item.id == line_item_id)
                    .ok_or_else(|| CommerceError::NotFound(line_item_id.to_string()))?;
                item.quantity = *quantity;
                let unit = item.price.effective();
                item.total_price =
                    Money::from_cents(unit.cent_amount * i64::from(*quantity), unit.currency_code);
                Ok(())
            }
            CartUpdateAction::RemoveLineItem { line_item_id, .. } => {
                cart.line_items.retain(|item| &item.id != line_item_id);
                Ok(())
            }
            CartUpdateAction::AddDiscountCode { code } => {
                if code != VALID_PROMO {
                    return Err(CommerceError::Api {
                        status: 400,
                        message: "discount code not applicable".to_string(),
                        codes: vec!["DiscountCodeNonApplicable".to_string()],
                    });
                }
                let info = serde_json::from_value(json!({
                    "discountCode": {"typeId": "discount-code", "id": code}
                }))
                .expect("valid discount info");
                cart.discount_codes.push(info);
                Ok(())
            }
            CartUpdateAction::RemoveDiscountCode { discount_code } => {
                cart.discount_codes
                    .retain(|info| info.discount_code.id != discount_code.id);
                Ok(())
            }
            CartUpdateAction::Recalculate => Ok(()),
        }
    }

    fn apply_customer_action(
        state: &mut FakeState,
        customer: &mut Customer,
        action: &CustomerUpdateAction,
    ) {
        match action {
            CustomerUpdateAction::SetFirstName { first_name } => {
                customer.first_name = Some(first_name.clone());
            }
            CustomerUpdateAction::SetLastName { last_name } => {
                customer.last_name = Some(last_name.clone());
            }
            CustomerUpdateAction::SetDateOfBirth { date_of_birth } => {
                customer.date_of_birth = Some(*date_of_birth);
            }
            CustomerUpdateAction::ChangeEmail { email } => {
                customer.email = email.clone();
            }
            CustomerUpdateAction::AddAddress { address } => {
                let mut stored = address.clone();
                stored.id = Some(AddressId::new(Self::fresh_id(state, "addr")));
                customer.addresses.push(stored);
            }
            CustomerUpdateAction::ChangeAddress {
                address_id,
                address,
            } => {
                if let Some(slot) = customer
                    .addresses
                    .iter_mut()
                    .find(|a| a.id.as_ref() == Some(address_id))
                {
                    let mut updated = address.clone();
                    updated.id = Some(address_id.clone());
                    *slot = updated;
                }
            }
            CustomerUpdateAction::RemoveAddress { address_id } => {
                customer.addresses.retain(|a| a.id.as_ref() != Some(address_id));
                customer.shipping_address_ids.retain(|id| id != address_id);
                customer.billing_address_ids.retain(|id| id != address_id);
                if customer.default_shipping_address_id.as_ref() == Some(address_id) {
                    customer.default_shipping_address_id = None;
                }
                if customer.default_billing_address_id.as_ref() == Some(address_id) {
                    customer.default_billing_address_id = None;
                }
            }
            CustomerUpdateAction::AddShippingAddressId { address_id } => {
                customer.shipping_address_ids.push(address_id.clone());
            }
            CustomerUpdateAction::RemoveShippingAddressId { address_id } => {
                customer.shipping_address_ids.retain(|id| id != address_id);
                if customer.default_shipping_address_id.as_ref() == Some(address_id) {
                    customer.default_shipping_address_id = None;
                }
            }
            CustomerUpdateAction::AddBillingAddressId { address_id } => {
                customer.billing_address_ids.push(address_id.clone());
            }
            CustomerUpdateAction::RemoveBillingAddressId { address_id } => {
                customer.billing_address_ids.retain(|id| id != address_id);
                if customer.default_billing_address_id.as_ref() == Some(address_id) {
                    customer.default_billing_address_id = None;
                }
            }
            CustomerUpdateAction::SetDefaultShippingAddress { address_id } => {
                customer.default_shipping_address_id = address_id.clone();
            }
            CustomerUpdateAction::SetDefaultBillingAddress { address_id } => {
                customer.default_billing_address_id = address_id.clone();
            }
        }
    }

    fn apply_to_signed_in(
        &self,
        actions: &[CustomerUpdateAction],
    ) -> Result<Customer, CommerceError> {
        let mut state = self.lock();
        let email = state
            .signed_in
            .clone()
            .ok_or_else(|| CommerceError::Auth("not signed in".to_string()))?;
        let (_, mut customer) = state
            .customers
            .get(&email)
            .cloned()
            .ok_or_else(|| CommerceError::NotFound(email.clone()))?;
        for action in actions {
            Self::apply_customer_action(&mut state, &mut customer, action);
        }
        customer.version = customer.version.next();
        let password = state.customers[&email].0.clone();
        state
            .customers
            .insert(email, (password, customer.clone()));
        Ok(customer)
    }
}

#[async_trait]
impl CatalogApi for FakePlatform {
    async fn search(
        &self,
        request: &ProductSearchRequest,
    ) -> Result<PagedQueryResult<ProductProjection>, CommerceError> {
        let state = self.lock();
        if state.fail_search {
            return Err(remote_down());
        }

        let mut matches: Vec<ProductProjection> = state
            .products
            .iter()
            .filter(|p| {
                request.category_id.as_ref().is_none_or(|wanted| {
                    p.categories.iter().any(|c| &c.id == wanted)
                })
            })
            .filter(|p| {
                request.search_query.as_deref().is_none_or(|q| {
                    p.name
                        .for_store()
                        .to_lowercase()
                        .contains(&q.to_lowercase())
                })
            })
            .filter(|p| {
                request.authors.is_empty()
                    || p.master_variant
                        .attribute_str("author")
                        .is_some_and(|a| request.authors.iter().any(|wanted| wanted == a))
            })
            .filter(|p| {
                request.price_range.is_none_or(|range| {
                    p.effective_price().is_some_and(|price| {
                        range.min.is_none_or(|min| price.cent_amount >= min * 100)
                            && range.max.is_none_or(|max| price.cent_amount <= max * 100)
                    })
                })
            })
            .cloned()
            .collect();

        match request.sort.unwrap_or_default() {
            SortKey::NameAsc => {
                matches.sort_by(|a, b| a.name.for_store().cmp(b.name.for_store()));
            }
            SortKey::NameDesc => {
                matches.sort_by(|a, b| b.name.for_store().cmp(a.name.for_store()));
            }
            SortKey::PriceAsc => matches.sort_by_key(|p| {
                p.effective_price().map_or(i64::MAX, |m| m.cent_amount)
            }),
            SortKey::PriceDesc => {
                matches.sort_by_key(|p| {
                    p.effective_price().map_or(i64::MAX, |m| m.cent_amount)
                });
                matches.reverse();
            }
        }

        let total = matches.len() as u64;
        let limit = request.limit.unwrap_or(20);
        let page: Vec<ProductProjection> = matches
            .into_iter()
            .skip(request.offset as usize)
            .take(limit as usize)
            .collect();
        Ok(PagedQueryResult {
            limit,
            offset: request.offset,
            count: page.len() as u32,
            total: Some(total),
            results: page,
        })
    }

    async fn categories(&self) -> Result<Vec<Category>, CommerceError> {
        Ok(self.lock().categories.clone())
    }

    async fn product_by_slug(&self, slug: &str) -> Result<ProductProjection, CommerceError> {
        self.lock()
            .products
            .iter()
            .find(|p| p.slug.for_store() == slug)
            .cloned()
            .ok_or_else(|| CommerceError::NotFound(format!("product with slug {slug}")))
    }
}

#[async_trait]
impl CartApi for FakePlatform {
    async fn active_cart(&self) -> Result<Cart, CommerceError> {
        let mut state = self.lock();
        if state.cart.is_none() {
            let cart = Self::empty_cart(&mut state);
            state.cart = Some(cart);
        }
        Ok(state.cart.clone().expect("cart just ensured"))
    }

    async fn mutate(&self, actions: Vec<CartUpdateAction>) -> Result<Cart, CommerceError> {
        let mut state = self.lock();
        if state.fail_cart_mutations {
            return Err(remote_down());
        }
        let mut cart = match state.cart.clone() {
            Some(cart) => cart,
            None => Self::empty_cart(&mut state),
        };
        for action in &actions {
            Self::apply_cart_action(&mut state, &mut cart, action)?;
        }
        Self::recompute_total(&mut cart);
        // One version step per successful update call, however many actions
        cart.version = cart.version.next();
        state.cart = Some(cart.clone());
        Ok(cart)
    }

    async fn clear(&self) -> Result<Cart, CommerceError> {
        let current = self.active_cart().await?;
        if current.is_empty() {
            return Ok(current);
        }
        let removals = current
            .line_items
            .iter()
            .map(|item| CartUpdateAction::RemoveLineItem {
                line_item_id: item.id.clone(),
                quantity: None,
            })
            .collect();
        self.mutate(removals).await
    }
}

#[async_trait]
impl CustomerApi for FakePlatform {
    async fn login(
        &self,
        email: &Email,
        password: SecretString,
    ) -> Result<SignInOutcome, CommerceError> {
        let mut state = self.lock();
        let (stored_password, customer) = state
            .customers
            .get(email.as_str())
            .cloned()
            .ok_or_else(|| CommerceError::Auth("invalid credentials".to_string()))?;
        if stored_password != password.expose_secret() {
            return Err(CommerceError::Auth("invalid credentials".to_string()));
        }
        state.signed_in = Some(email.as_str().to_string());
        let token = format!("rt-{}", email.as_str());
        state
            .refresh_tokens
            .insert(token.clone(), email.as_str().to_string());
        Ok(SignInOutcome {
            customer,
            cart: state.cart.clone(),
            refresh_token: Some(SecretString::from(token)),
        })
    }

    async fn sign_up(&self, draft: CustomerDraft) -> Result<SignInOutcome, CommerceError> {
        let email = draft.email.clone();
        let password = draft.password.clone();
        {
            let mut state = self.lock();
            if state.customers.contains_key(email.as_str()) {
                return Err(CommerceError::Api {
                    status: 400,
                    message: "account already exists".to_string(),
                    codes: vec!["DuplicateField".to_string()],
                });
            }
            let mut addresses = Vec::new();
            let mut ids = Vec::new();
            for address in &draft.addresses {
                let id = AddressId::new(Self::fresh_id(&mut state, "addr"));
                let mut stored = address.clone();
                stored.id = Some(id.clone());
                addresses.push(stored);
                ids.push(id);
            }
            let pick = |indexes: &[usize]| -> Vec<AddressId> {
                indexes.iter().filter_map(|i| ids.get(*i).cloned()).collect()
            };
            let customer = Customer {
                id: CustomerId::new(Self::fresh_id(&mut state, "cust")),
                version: Version::new(1),
                email: email.clone(),
                first_name: Some(draft.first_name.clone()),
                last_name: Some(draft.last_name.clone()),
                date_of_birth: Some(draft.date_of_birth),
                addresses,
                shipping_address_ids: pick(&draft.shipping_addresses),
                billing_address_ids: pick(&draft.billing_addresses),
                default_shipping_address_id: draft
                    .default_shipping_address
                    .and_then(|i| ids.get(i).cloned()),
                default_billing_address_id: draft
                    .default_billing_address
                    .and_then(|i| ids.get(i).cloned()),
            };
            state.customers.insert(
                email.as_str().to_string(),
                (password.expose_secret().to_string(), customer),
            );
        }
        self.login(&email, password).await
    }

    async fn restore(&self, refresh_token: SecretString) -> Result<Customer, CommerceError> {
        let mut state = self.lock();
        let email = state
            .refresh_tokens
            .get(refresh_token.expose_secret())
            .cloned()
            .ok_or_else(|| CommerceError::Auth("unknown refresh token".to_string()))?;
        state.signed_in = Some(email.clone());
        Ok(state.customers[&email].1.clone())
    }

    async fn logout(&self) {
        self.lock().signed_in = None;
    }

    async fn me(&self) -> Result<Customer, CommerceError> {
        let state = self.lock();
        let email = state
            .signed_in
            .clone()
            .ok_or_else(|| CommerceError::Auth("not signed in".to_string()))?;
        Ok(state.customers[&email].1.clone())
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<Customer, CommerceError> {
        let actions = vec![
            CustomerUpdateAction::SetFirstName {
                first_name: update.first_name,
            },
            CustomerUpdateAction::SetLastName {
                last_name: update.last_name,
            },
            CustomerUpdateAction::SetDateOfBirth {
                date_of_birth: update.date_of_birth,
            },
            CustomerUpdateAction::ChangeEmail {
                email: update.email,
            },
        ];
        self.apply_to_signed_in(&actions)
    }

    async fn change_password(
        &self,
        current: SecretString,
        new: SecretString,
    ) -> Result<Customer, CommerceError> {
        let mut state = self.lock();
        let email = state
            .signed_in
            .clone()
            .ok_or_else(|| CommerceError::Auth("not signed in".to_string()))?;
        let (stored_password, mut customer) = state.customers[&email].clone();
        if stored_password != current.expose_secret() {
            return Err(CommerceError::Api {
                status: 400,
                message: "current password does not match".to_string(),
                codes: vec!["InvalidCurrentPassword".to_string()],
            });
        }
        customer.version = customer.version.next();
        state.customers.insert(
            email,
            (new.expose_secret().to_string(), customer.clone()),
        );
        // The platform invalidates the session on password change
        state.signed_in = None;
        Ok(customer)
    }

    async fn add_address(
        &self,
        address: Address,
        assignment: AddressAssignment,
    ) -> Result<Customer, CommerceError> {
        let added = self.apply_to_signed_in(&[CustomerUpdateAction::AddAddress { address }])?;
        let new_id = added
            .addresses
            .last()
            .and_then(|a| a.id.clone())
            .ok_or_else(|| CommerceError::NotFound("new address".to_string()))?;
        let actions = plan_address_assignment(&added, &new_id, &assignment);
        if actions.is_empty() {
            return Ok(added);
        }
        self.apply_to_signed_in(&actions)
    }

    async fn update_address(
        &self,
        address_id: AddressId,
        address: Address,
        assignment: AddressAssignment,
    ) -> Result<Customer, CommerceError> {
        let current = self.me().await?;
        let mut actions = vec![CustomerUpdateAction::ChangeAddress {
            address_id: address_id.clone(),
            address,
        }];
        actions.extend(plan_address_assignment(&current, &address_id, &assignment));
        self.apply_to_signed_in(&actions)
    }

    async fn delete_address(&self, address_id: AddressId) -> Result<Customer, CommerceError> {
        self.apply_to_signed_in(&[CustomerUpdateAction::RemoveAddress { address_id }])
    }
}

/// Build an [`AppState`] wired to the fake.
#[must_use]
pub fn test_state(fake: &FakePlatform) -> AppState {
    let config = CommerceConfig {
        project_key: "bookstall-test".to_string(),
        client_id: "test-client".to_string(),
        client_secret: SecretString::from("test-secret"),
        auth_url: "https://auth.invalid".to_string(),
        api_url: "https://api.invalid".to_string(),
        scopes: vec!["manage_my_orders:bookstall-test".to_string()],
        currency: CurrencyCode::EUR,
    };
    AppState::with_backends(
        config,
        Arc::new(fake.clone()),
        Arc::new(fake.clone()),
        Arc::new(fake.clone()),
        Arc::new(MemorySessionStorage::default()),
    )
}
