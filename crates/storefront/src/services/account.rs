//! Buyer profile reads and address updates.

use tracing::instrument;

use mercato_core::CustomerId;

use crate::backend::{AddressPatch, BackendClient, BackendError, DeliveryAddress, Profile, tables};

/// Read-through profile queries plus the one profile write the app makes.
pub struct AccountService<'a> {
    backend: &'a BackendClient,
}

impl<'a> AccountService<'a> {
    /// Create an account service over the shared backend client.
    #[must_use]
    pub const fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    /// The customer's profile row, if one exists.
    ///
    /// A missing row is not an error; profiles are created lazily by the
    /// backend and a fresh account may not have one yet.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteRead` if the query fails.
    #[instrument(skip(self), fields(customer = %customer))]
    pub async fn profile(&self, customer: &CustomerId) -> Result<Option<Profile>, BackendError> {
        self.backend
            .from(tables::USERS)
            .select("*")
            .eq("id", customer)
            .fetch_optional()
            .await
    }

    /// Overwrite the customer's stored delivery address.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteWrite` if the update is rejected.
    #[instrument(skip(self, address), fields(customer = %customer))]
    pub async fn update_address(
        &self,
        customer: &CustomerId,
        address: &DeliveryAddress,
    ) -> Result<(), BackendError> {
        self.backend
            .from(tables::USERS)
            .update(AddressPatch::from(address))
            .eq("id", customer)
            .execute()
            .await
    }
}
