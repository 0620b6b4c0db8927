//! Customer and authentication client.
//!
//! Wraps login, signup, profile updates, password change and address
//! CRUD. Customer mutations are version-guarded action lists like cart
//! mutations. Logout is purely client-side: the platform has no session
//! invalidation endpoint for this flow, so logging out means dropping the
//! cached token and returning to an anonymous session.

use async_trait::async_trait;
use bookstall_core::{AddressId, Email, Version};
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};
use tracing::instrument;

use crate::commerce::http::CommerceHttp;
use crate::commerce::types::{Address, Cart, Customer, CustomerSignInResult};
use crate::commerce::{CommerceError, MUTATION_ATTEMPTS, retry_on_conflict};

/// Cart behavior on sign-in: adopt the anonymous cart into the customer's
/// session, merging with any existing customer cart.
const SIGN_IN_MODE: &str = "MergeWithExistingCustomerCart";

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// A single customer mutation in the platform's action vocabulary.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CustomerUpdateAction {
    #[serde(rename_all = "camelCase")]
    SetFirstName { first_name: String },
    #[serde(rename_all = "camelCase")]
    SetLastName { last_name: String },
    #[serde(rename_all = "camelCase")]
    SetDateOfBirth { date_of_birth: NaiveDate },
    ChangeEmail { email: Email },
    AddAddress { address: Address },
    #[serde(rename_all = "camelCase")]
    ChangeAddress {
        address_id: AddressId,
        address: Address,
    },
    #[serde(rename_all = "camelCase")]
    RemoveAddress { address_id: AddressId },
    #[serde(rename_all = "camelCase")]
    AddShippingAddressId { address_id: AddressId },
    #[serde(rename_all = "camelCase")]
    RemoveShippingAddressId { address_id: AddressId },
    #[serde(rename_all = "camelCase")]
    AddBillingAddressId { address_id: AddressId },
    #[serde(rename_all = "camelCase")]
    RemoveBillingAddressId { address_id: AddressId },
    /// Setting without an id clears the default.
    #[serde(rename_all = "camelCase")]
    SetDefaultShippingAddress {
        #[serde(skip_serializing_if = "Option::is_none")]
        address_id: Option<AddressId>,
    },
    #[serde(rename_all = "camelCase")]
    SetDefaultBillingAddress {
        #[serde(skip_serializing_if = "Option::is_none")]
        address_id: Option<AddressId>,
    },
}

/// New-customer draft for signup. Shipping/billing association and default
/// flags are wired by index into `addresses`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    pub email: Email,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub addresses: Vec<Address>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shipping_addresses: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub billing_addresses: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_shipping_address: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_billing_address: Option<usize>,
}

/// Field-level profile patch applied as an action list.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: Email,
}

impl ProfileUpdate {
    fn actions(&self) -> Vec<CustomerUpdateAction> {
        vec![
            CustomerUpdateAction::SetFirstName {
                first_name: self.first_name.clone(),
            },
            CustomerUpdateAction::SetLastName {
                last_name: self.last_name.clone(),
            },
            CustomerUpdateAction::SetDateOfBirth {
                date_of_birth: self.date_of_birth,
            },
            CustomerUpdateAction::ChangeEmail {
                email: self.email.clone(),
            },
        ]
    }
}

/// Desired shipping/billing role of one address.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressAssignment {
    pub shipping: bool,
    pub billing: bool,
    pub shipping_default: bool,
    pub billing_default: bool,
}

/// Compute the minimal action list moving an address from its current
/// shipping/billing membership and default state to the desired one.
///
/// Emitting only the delta avoids spurious version churn and keeps the
/// platform's audit history readable.
#[must_use]
pub fn plan_address_assignment(
    customer: &Customer,
    address_id: &AddressId,
    desired: &AddressAssignment,
) -> Vec<CustomerUpdateAction> {
    let mut actions = Vec::new();

    let is_shipping = customer.is_shipping(address_id);
    if desired.shipping && !is_shipping {
        actions.push(CustomerUpdateAction::AddShippingAddressId {
            address_id: address_id.clone(),
        });
    } else if !desired.shipping && is_shipping {
        actions.push(CustomerUpdateAction::RemoveShippingAddressId {
            address_id: address_id.clone(),
        });
    }

    let is_billing = customer.is_billing(address_id);
    if desired.billing && !is_billing {
        actions.push(CustomerUpdateAction::AddBillingAddressId {
            address_id: address_id.clone(),
        });
    } else if !desired.billing && is_billing {
        actions.push(CustomerUpdateAction::RemoveBillingAddressId {
            address_id: address_id.clone(),
        });
    }

    let is_shipping_default = customer.default_shipping_address_id.as_ref() == Some(address_id);
    if desired.shipping_default && !is_shipping_default {
        actions.push(CustomerUpdateAction::SetDefaultShippingAddress {
            address_id: Some(address_id.clone()),
        });
    } else if !desired.shipping_default && is_shipping_default {
        // Id-less form clears the default
        actions.push(CustomerUpdateAction::SetDefaultShippingAddress { address_id: None });
    }

    let is_billing_default = customer.default_billing_address_id.as_ref() == Some(address_id);
    if desired.billing_default && !is_billing_default {
        actions.push(CustomerUpdateAction::SetDefaultBillingAddress {
            address_id: Some(address_id.clone()),
        });
    } else if !desired.billing_default && is_billing_default {
        actions.push(CustomerUpdateAction::SetDefaultBillingAddress { address_id: None });
    }

    actions
}

/// Outcome of a sign-in or sign-up: the customer, the active cart after
/// any anonymous-cart merge, and the refresh token backing silent
/// re-login.
#[derive(Debug)]
pub struct SignInOutcome {
    pub customer: Customer,
    pub cart: Option<Cart>,
    pub refresh_token: Option<SecretString>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInBody<'a> {
    email: &'a Email,
    #[serde(serialize_with = "expose")]
    password: SecretString,
    active_cart_sign_in_mode: &'static str,
    update_product_data: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChangeBody {
    version: Version,
    #[serde(serialize_with = "expose")]
    current_password: SecretString,
    #[serde(serialize_with = "expose")]
    new_password: SecretString,
}

#[derive(Serialize)]
struct CustomerUpdate<'a> {
    version: Version,
    actions: &'a [CustomerUpdateAction],
}

/// Seam between the auth/profile flows and the remote customer endpoints.
#[async_trait]
pub trait CustomerApi: Send + Sync {
    /// Credential exchange; merges any anonymous cart into the session.
    async fn login(
        &self,
        email: &Email,
        password: SecretString,
    ) -> Result<SignInOutcome, CommerceError>;

    /// Create a customer and sign them in.
    async fn sign_up(&self, draft: CustomerDraft) -> Result<SignInOutcome, CommerceError>;

    /// Silent re-login from a cached refresh token.
    async fn restore(&self, refresh_token: SecretString) -> Result<Customer, CommerceError>;

    /// Discard the local session credentials (no remote invalidation).
    async fn logout(&self);

    /// Fetch the signed-in customer.
    async fn me(&self) -> Result<Customer, CommerceError>;

    /// Apply a field-level profile patch.
    async fn update_profile(&self, update: ProfileUpdate) -> Result<Customer, CommerceError>;

    /// Change the password. The platform invalidates the prior session;
    /// callers must re-login with the new password.
    async fn change_password(
        &self,
        current: SecretString,
        new: SecretString,
    ) -> Result<Customer, CommerceError>;

    /// Add an address and wire its shipping/billing role.
    async fn add_address(
        &self,
        address: Address,
        assignment: AddressAssignment,
    ) -> Result<Customer, CommerceError>;

    /// Update an address's fields and reconcile its role.
    async fn update_address(
        &self,
        address_id: AddressId,
        address: Address,
        assignment: AddressAssignment,
    ) -> Result<Customer, CommerceError>;

    /// Remove an address.
    async fn delete_address(&self, address_id: AddressId) -> Result<Customer, CommerceError>;
}

/// Client for the customer endpoints.
#[derive(Clone)]
pub struct CustomerClient {
    http: CommerceHttp,
}

impl CustomerClient {
    /// Create a new customer client on shared HTTP plumbing.
    #[must_use]
    pub const fn new(http: CommerceHttp) -> Self {
        Self { http }
    }

    /// Post an action list, refetching and retrying once on conflict.
    async fn update_me(
        &self,
        actions: &[CustomerUpdateAction],
    ) -> Result<Customer, CommerceError> {
        retry_on_conflict(MUTATION_ATTEMPTS, move |_attempt| async move {
            let customer: Customer = self.http.get_json("me", &[]).await?;
            let body = CustomerUpdate {
                version: customer.version,
                actions,
            };
            self.http.post_json("me", &body).await
        })
        .await
    }

    /// Merge-sign-in against `/me/login` once the token flow is switched.
    async fn sign_in(
        &self,
        email: &Email,
        password: SecretString,
    ) -> Result<CustomerSignInResult, CommerceError> {
        let body = SignInBody {
            email,
            password,
            active_cart_sign_in_mode: SIGN_IN_MODE,
            update_product_data: false,
        };
        self.http.post_json("me/login", &body).await
    }
}

#[async_trait]
impl CustomerApi for CustomerClient {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(
        &self,
        email: &Email,
        password: SecretString,
    ) -> Result<SignInOutcome, CommerceError> {
        // Switch token flows first so the merge call runs as the customer
        self.http
            .use_password_flow(email.as_str(), password.clone())
            .await?;
        let result = self.sign_in(email, password).await?;
        Ok(SignInOutcome {
            customer: result.customer,
            cart: result.cart,
            refresh_token: self.http.refresh_token().await,
        })
    }

    #[instrument(skip(self, draft), fields(email = %draft.email))]
    async fn sign_up(&self, draft: CustomerDraft) -> Result<SignInOutcome, CommerceError> {
        let email = draft.email.clone();
        let password = draft.password.clone();
        let _created: CustomerSignInResult = self.http.post_json("customers", &draft).await?;
        // Establish the customer session exactly like a regular login
        self.login(&email, password).await
    }

    #[instrument(skip(self, refresh_token))]
    async fn restore(&self, refresh_token: SecretString) -> Result<Customer, CommerceError> {
        self.http.use_refresh_flow(refresh_token).await?;
        self.me().await
    }

    async fn logout(&self) {
        self.http.reset_to_anonymous().await;
    }

    #[instrument(skip(self))]
    async fn me(&self) -> Result<Customer, CommerceError> {
        self.http.get_json("me", &[]).await
    }

    #[instrument(skip(self, update))]
    async fn update_profile(&self, update: ProfileUpdate) -> Result<Customer, CommerceError> {
        self.update_me(&update.actions()).await
    }

    #[instrument(skip(self, current, new))]
    async fn change_password(
        &self,
        current: SecretString,
        new: SecretString,
    ) -> Result<Customer, CommerceError> {
        let current = &current;
        let new = &new;
        retry_on_conflict(MUTATION_ATTEMPTS, move |_attempt| async move {
            let customer: Customer = self.http.get_json("me", &[]).await?;
            let body = PasswordChangeBody {
                version: customer.version,
                current_password: current.clone(),
                new_password: new.clone(),
            };
            self.http.post_json("me/password", &body).await
        })
        .await
    }

    #[instrument(skip(self, address, assignment))]
    async fn add_address(
        &self,
        address: Address,
        assignment: AddressAssignment,
    ) -> Result<Customer, CommerceError> {
        let added = self
            .update_me(&[CustomerUpdateAction::AddAddress { address }])
            .await?;

        // The new address is the last one on the returned snapshot
        let Some(new_id) = added.addresses.last().and_then(|a| a.id.clone()) else {
            return Err(CommerceError::Api {
                status: 500,
                message: "platform did not return the new address id".to_string(),
                codes: Vec::new(),
            });
        };

        let actions = plan_address_assignment(&added, &new_id, &assignment);
        if actions.is_empty() {
            return Ok(added);
        }
        // Reuse the version from the add response for the follow-up
        let body = CustomerUpdate {
            version: added.version,
            actions: &actions,
        };
        self.http.post_json("me", &body).await
    }

    #[instrument(skip(self, address, assignment), fields(address_id = %address_id))]
    async fn update_address(
        &self,
        address_id: AddressId,
        address: Address,
        assignment: AddressAssignment,
    ) -> Result<Customer, CommerceError> {
        // Replanned from the fresh snapshot on every attempt so the role
        // delta stays minimal
        let address_id = &address_id;
        let address = &address;
        let assignment = &assignment;
        retry_on_conflict(MUTATION_ATTEMPTS, move |_attempt| async move {
            let customer: Customer = self.http.get_json("me", &[]).await?;
            let mut actions = vec![CustomerUpdateAction::ChangeAddress {
                address_id: address_id.clone(),
                address: address.clone(),
            }];
            actions.extend(plan_address_assignment(&customer, address_id, assignment));
            let body = CustomerUpdate {
                version: customer.version,
                actions: &actions,
            };
            self.http.post_json("me", &body).await
        })
        .await
    }

    #[instrument(skip(self), fields(address_id = %address_id))]
    async fn delete_address(&self, address_id: AddressId) -> Result<Customer, CommerceError> {
        self.update_me(&[CustomerUpdateAction::RemoveAddress { address_id }])
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn customer(json: serde_json::Value) -> Customer {
        serde_json::from_value(json).unwrap()
    }

    fn base_customer() -> serde_json::Value {
        serde_json::json!({
            "id": "c-1",
            "version": 4,
            "email": "reader@example.com",
            "addresses": [
                {"id": "a-1", "streetName": "Main St 1", "postalCode": "123456", "city": "Berlin", "country": "DE"}
            ],
            "shippingAddressIds": [],
            "billingAddressIds": []
        })
    }

    #[test]
    fn test_plan_billing_only_to_shipping_default() {
        // Previously only billing, not default; desired shipping-only with
        // shipping default
        let mut json = base_customer();
        json["billingAddressIds"] = serde_json::json!(["a-1"]);
        let customer = customer(json);

        let desired = AddressAssignment {
            shipping: true,
            billing: false,
            shipping_default: true,
            billing_default: false,
        };
        let actions = plan_address_assignment(&customer, &AddressId::new("a-1"), &desired);

        let tags: Vec<String> = actions
            .iter()
            .map(|a| {
                serde_json::to_value(a).unwrap()["action"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(
            tags,
            vec![
                "addShippingAddressId",
                "removeBillingAddressId",
                "setDefaultShippingAddress"
            ]
        );
        // The default action carries the id
        let default_action = serde_json::to_value(&actions[2]).unwrap();
        assert_eq!(default_action["addressId"], "a-1");
    }

    #[test]
    fn test_plan_no_change_is_empty() {
        let mut json = base_customer();
        json["shippingAddressIds"] = serde_json::json!(["a-1"]);
        json["defaultShippingAddressId"] = serde_json::json!("a-1");
        let customer = customer(json);

        let desired = AddressAssignment {
            shipping: true,
            billing: false,
            shipping_default: true,
            billing_default: false,
        };
        let actions = plan_address_assignment(&customer, &AddressId::new("a-1"), &desired);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_plan_clearing_default_uses_idless_form() {
        let mut json = base_customer();
        json["shippingAddressIds"] = serde_json::json!(["a-1"]);
        json["defaultShippingAddressId"] = serde_json::json!("a-1");
        let customer = customer(json);

        let desired = AddressAssignment {
            shipping: true,
            ..Default::default()
        };
        let actions = plan_address_assignment(&customer, &AddressId::new("a-1"), &desired);
        assert_eq!(actions.len(), 1);
        let json = serde_json::to_value(&actions[0]).unwrap();
        assert_eq!(json["action"], "setDefaultShippingAddress");
        assert!(json.get("addressId").is_none());
    }

    #[test]
    fn test_profile_update_action_list() {
        let update = ProfileUpdate {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
            email: Email::parse("ada@example.com").unwrap(),
        };
        let actions = update.actions();
        let json = serde_json::to_value(&actions).unwrap();
        assert_eq!(json[0]["action"], "setFirstName");
        assert_eq!(json[0]["firstName"], "Ada");
        assert_eq!(json[2]["action"], "setDateOfBirth");
        assert_eq!(json[2]["dateOfBirth"], "1990-12-10");
        assert_eq!(json[3]["action"], "changeEmail");
        assert_eq!(json[3]["email"], "ada@example.com");
    }

    #[test]
    fn test_draft_wire_shape_hides_nothing_needed() {
        let draft = CustomerDraft {
            email: Email::parse("new@example.com").unwrap(),
            password: SecretString::from("Str0ngPass"),
            first_name: "New".to_string(),
            last_name: "Reader".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 2).unwrap(),
            addresses: vec![Address {
                id: None,
                street_name: "Main St 1".to_string(),
                postal_code: "123456".to_string(),
                city: "Berlin".to_string(),
                country: "DE".to_string(),
            }],
            shipping_addresses: vec![0],
            billing_addresses: vec![0],
            default_shipping_address: Some(0),
            default_billing_address: None,
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["password"], "Str0ngPass");
        assert_eq!(json["shippingAddresses"], serde_json::json!([0]));
        assert_eq!(json["defaultShippingAddress"], 0);
        assert!(json.get("defaultBillingAddress").is_none());
        // Drafts must not carry an id field
        assert!(json["addresses"][0].get("id").is_none());
    }
}
