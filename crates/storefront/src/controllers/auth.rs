//! Authentication orchestrator.
//!
//! Drives login, registration, logout and the silent re-login attempted
//! at startup. A successful sign-in persists the session marker (email
//! plus refresh token); a failed silent re-login quietly falls back to an
//! anonymous session rather than surfacing an error.

use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::commerce::types::Customer;
use crate::commerce::{CustomerDraft, SignInOutcome};
use crate::controllers::Notice;
use crate::error::Result;
use crate::state::AppState;
use crate::validation::{LoginForm, RegisterForm, ValidRegistration};

/// The auth state machine.
pub struct AuthController {
    state: AppState,
    customer: Option<Customer>,
    notice: Option<Notice>,
}

impl AuthController {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            customer: None,
            notice: None,
        }
    }

    /// The signed-in customer, if any.
    #[must_use]
    pub const fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    /// Take the pending notice, clearing it.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Validate credentials and sign in. The anonymous cart, if any, is
    /// merged into the customer's cart by the platform.
    ///
    /// # Errors
    ///
    /// Returns validation failures or the sign-in error.
    pub async fn login(&mut self, form: &LoginForm) -> Result<()> {
        let credentials = form.validate()?;
        let result = self
            .state
            .customers()
            .login(&credentials.email, credentials.password)
            .await;
        match result {
            Ok(outcome) => {
                info!("Customer signed in");
                self.adopt(outcome);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.notice = Some(Notice::error("Email or password is incorrect"));
                Err(e.into())
            }
        }
    }

    /// Validate the registration form, create the customer and sign them
    /// in.
    ///
    /// # Errors
    ///
    /// Returns validation failures or the sign-up error.
    pub async fn register(&mut self, form: &RegisterForm) -> Result<()> {
        let valid = form.validate()?;
        let draft = Self::draft_from(valid);
        let result = self.state.customers().sign_up(draft).await;
        match result {
            Ok(outcome) => {
                info!("Customer registered");
                self.adopt(outcome);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.notice = Some(Notice::error("Could not create your account"));
                Err(e.into())
            }
        }
    }

    /// Attempt a silent re-login from the persisted session marker.
    /// Returns whether a customer session was restored.
    pub async fn restore(&mut self) -> bool {
        let Some(marker) = self.state.session().hydrate() else {
            return false;
        };
        let Some(token) = marker.refresh_token else {
            self.state.session().clear();
            return false;
        };

        let result = self
            .state
            .customers()
            .restore(SecretString::from(token.clone()))
            .await;
        match result {
            Ok(customer) => {
                debug!("Session restored");
                self.state
                    .session()
                    .set_login(customer.email.clone(), Some(&SecretString::from(token)));
                self.customer = Some(customer);
                true
            }
            Err(e) => {
                // Stale token: drop the marker and stay anonymous
                debug!(error = %e, "Silent re-login failed");
                self.state.session().clear();
                self.state.customers().logout().await;
                false
            }
        }
    }

    /// Sign out: drop the remote session credentials and every local
    /// trace of the customer.
    pub async fn logout(&mut self) {
        self.state.customers().logout().await;
        self.state.session().clear();
        self.state.badge().set(0);
        self.customer = None;
        info!("Customer signed out");
    }

    fn adopt(&mut self, outcome: SignInOutcome) {
        self.state
            .session()
            .set_login(outcome.customer.email.clone(), outcome.refresh_token.as_ref());
        if let Some(cart) = &outcome.cart {
            self.state.badge().set(u64::from(cart.total_quantity()));
        }
        self.customer = Some(outcome.customer);
    }

    /// Wire the registration form into a customer draft. The single form
    /// address is referenced by index for its shipping/billing roles.
    fn draft_from(valid: ValidRegistration) -> CustomerDraft {
        let address = valid.address;
        CustomerDraft {
            email: valid.email,
            password: valid.password,
            first_name: valid.first_name,
            last_name: valid.last_name,
            date_of_birth: valid.date_of_birth,
            addresses: vec![crate::commerce::types::Address {
                id: None,
                street_name: address.street_name,
                postal_code: address.postal_code,
                city: address.city,
                country: address.country,
            }],
            shipping_addresses: address.shipping.then_some(0).into_iter().collect(),
            billing_addresses: address.billing.then_some(0).into_iter().collect(),
            default_shipping_address: address.shipping_default.then_some(0),
            default_billing_address: address.billing_default.then_some(0),
        }
    }
}
