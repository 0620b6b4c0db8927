//! Profile orchestrator.
//!
//! Account page flows: personal details, password change and the address
//! book. Every mutation returns a full customer snapshot which replaces
//! the one held here; a failure keeps the previous snapshot visible.

use bookstall_core::AddressId;
use secrecy::SecretString;
use tracing::{info, warn};

use crate::commerce::types::{Address, Customer};
use crate::commerce::{AddressAssignment, ProfileUpdate};
use crate::controllers::Notice;
use crate::error::Result;
use crate::state::AppState;
use crate::validation::{AddressForm, PasswordForm, ProfileForm, ValidAddress};

/// The account page state machine.
pub struct ProfileController {
    state: AppState,
    customer: Option<Customer>,
    notice: Option<Notice>,
}

impl ProfileController {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            customer: None,
            notice: None,
        }
    }

    /// The customer snapshot the account page renders.
    #[must_use]
    pub const fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    /// Take the pending notice, clearing it.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Fetch the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns the remote error; the previous snapshot is kept.
    pub async fn load(&mut self) -> Result<()> {
        let result = self.state.customers().me().await;
        match result {
            Ok(customer) => {
                self.customer = Some(customer);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to load profile");
                self.notice = Some(Notice::error("Could not load your profile"));
                Err(e.into())
            }
        }
    }

    /// Validate and apply a personal-details edit.
    ///
    /// # Errors
    ///
    /// Returns validation failures or the remote error.
    pub async fn update_profile(&mut self, form: &ProfileForm) -> Result<()> {
        let valid = form.validate()?;
        let update = ProfileUpdate {
            first_name: valid.first_name,
            last_name: valid.last_name,
            date_of_birth: valid.date_of_birth,
            email: valid.email,
        };
        let result = self.state.customers().update_profile(update).await;
        self.apply(result, "Profile updated", "Could not update your profile")
    }

    /// Validate and apply a password change, then re-establish the
    /// session with the new password. The platform invalidates the old
    /// token on success.
    ///
    /// # Errors
    ///
    /// Returns validation failures or the remote error.
    pub async fn change_password(&mut self, form: &PasswordForm) -> Result<()> {
        let valid = form.validate()?;
        let new_password = SecretString::from(form.new_password.clone());
        let changed = self
            .state
            .customers()
            .change_password(valid.current, valid.new)
            .await;
        let customer = match changed {
            Ok(customer) => customer,
            Err(e) => {
                warn!(error = %e, "Password change failed");
                self.notice = Some(Notice::error("Could not change your password"));
                return Err(e.into());
            }
        };

        let relogin = self
            .state
            .customers()
            .login(&customer.email, new_password)
            .await;
        match relogin {
            Ok(outcome) => {
                self.state.session().set_login(
                    outcome.customer.email.clone(),
                    outcome.refresh_token.as_ref(),
                );
                self.customer = Some(outcome.customer);
                info!("Password changed");
                self.notice = Some(Notice::info("Password changed"));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Re-login after password change failed");
                self.notice = Some(Notice::error("Password changed, please sign in again"));
                Err(e.into())
            }
        }
    }

    /// Validate and add a new address with its shipping/billing role.
    ///
    /// # Errors
    ///
    /// Returns validation failures or the remote error.
    pub async fn add_address(&mut self, form: &AddressForm) -> Result<()> {
        let valid = form.validate()?;
        let (address, assignment) = split(valid);
        let result = self.state.customers().add_address(address, assignment).await;
        self.apply(result, "Address added", "Could not add the address")
    }

    /// Validate and update an existing address, reconciling its role.
    ///
    /// # Errors
    ///
    /// Returns validation failures or the remote error.
    pub async fn update_address(&mut self, id: AddressId, form: &AddressForm) -> Result<()> {
        let valid = form.validate()?;
        let (address, assignment) = split(valid);
        let result = self
            .state
            .customers()
            .update_address(id, address, assignment)
            .await;
        self.apply(result, "Address updated", "Could not update the address")
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// Returns the remote error.
    pub async fn delete_address(&mut self, id: AddressId) -> Result<()> {
        let result = self.state.customers().delete_address(id).await;
        self.apply(result, "Address removed", "Could not remove the address")
    }

    fn apply(
        &mut self,
        result: std::result::Result<Customer, crate::commerce::CommerceError>,
        success: &str,
        failure: &str,
    ) -> Result<()> {
        match result {
            Ok(customer) => {
                self.customer = Some(customer);
                self.notice = Some(Notice::info(success));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Profile mutation failed");
                self.notice = Some(Notice::error(failure));
                Err(e.into())
            }
        }
    }
}

/// Separate validated address fields from the desired role.
fn split(valid: ValidAddress) -> (Address, AddressAssignment) {
    (
        Address {
            id: None,
            street_name: valid.street_name,
            postal_code: valid.postal_code,
            city: valid.city,
            country: valid.country,
        },
        AddressAssignment {
            shipping: valid.shipping,
            billing: valid.billing,
            shipping_default: valid.shipping_default,
            billing_default: valid.billing_default,
        },
    )
}
