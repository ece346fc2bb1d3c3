//! Client reads and writes

use crate::cache::namespace::{Resource, View};
use crate::cache::strategy::CacheStrategy;
use crate::cache::types::Page;
use crate::invalidation::{Mutation, SubCollection, UnitOfWork};
use crate::schema::repository::ClientRepository;
use crate::schema::types::{Client, ClientUpdate, NewClient};
use crate::service::{ServiceError, ServiceResult};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct ClientService {
    clients: Arc<dyn ClientRepository>,
    cache: CacheStrategy,
}

impl ClientService {
    pub fn new(clients: Arc<dyn ClientRepository>, cache: CacheStrategy) -> Self {
        Self { clients, cache }
    }

    pub async fn get_client(&self, id: i64) -> ServiceResult<Client> {
        self.cache
            .entity(Resource::Client, id, || self.load_client(id))
            .await
    }

    pub async fn get_clients_page(&self, page: i64, size: i64) -> ServiceResult<Page<Client>> {
        self.cache
            .page(View::Clients, page, size, None, |request| async move {
                self.clients
                    .clients_page(request)
                    .await
                    .map_err(ServiceError::from)
            })
            .await
    }

    /// Create a client with its embedded profile, orders and coupons
    pub async fn add_client(
        &self,
        mut uow: Option<&mut UnitOfWork>,
        new_client: NewClient,
    ) -> ServiceResult<Client> {
        let client = self.clients.insert_client(new_client).await?;

        let mut mutation = Mutation::client_added(client.id);
        if client.profile.is_some() {
            mutation = mutation.touching(SubCollection::Profile);
        }
        if !client.orders.is_empty() {
            mutation = mutation.touching(SubCollection::Orders);
        }
        if !client.coupons.is_empty() {
            mutation = mutation.touching(SubCollection::Coupons);
        }

        self.cache
            .write_through_after_commit(
                uow.as_deref_mut(),
                Resource::Client,
                client.id,
                client.clone(),
            )
            .await;
        self.cache.invalidate(uow, &mutation).await;

        Ok(client)
    }

    /// Update name and email, and replace whichever sub-collections `update`
    /// carries
    pub async fn update_client(
        &self,
        uow: Option<&mut UnitOfWork>,
        id: i64,
        update: ClientUpdate,
    ) -> ServiceResult<Client> {
        let before = self.load_client(id).await?;
        let updated = self
            .clients
            .update_client(id, &update)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Client, id))?;

        let mut mutation = Mutation::client_updated(id);
        if update.profile.is_some() {
            mutation = mutation.touching(SubCollection::Profile);
            if let Some(profile) = &before.profile {
                mutation = mutation.evicting_profile(profile.id);
            }
        }
        if update.orders.is_some() {
            mutation = before
                .order_ids()
                .fold(mutation.touching(SubCollection::Orders), Mutation::evicting_order);
        }
        if update.coupons.is_some() {
            mutation = before
                .coupon_ids()
                .fold(mutation.touching(SubCollection::Coupons), Mutation::evicting_coupon);
        }

        debug!("Client {} updated, touching {:?}", id, mutation.touched);
        self.cache.invalidate(uow, &mutation).await;
        Ok(updated)
    }

    /// Delete a client together with its profile, orders and coupon links
    pub async fn delete_client(&self, uow: Option<&mut UnitOfWork>, id: i64) -> ServiceResult<()> {
        let removed = self
            .clients
            .delete_client(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Client, id))?;

        // Only sub-collections the client actually owned are touched
        let mut mutation = Mutation::client_deleted(id);
        if let Some(profile) = &removed.profile {
            mutation = mutation
                .touching(SubCollection::Profile)
                .evicting_profile(profile.id);
        }
        if !removed.orders.is_empty() {
            mutation = removed
                .order_ids()
                .fold(mutation.touching(SubCollection::Orders), Mutation::evicting_order);
        }
        if !removed.coupons.is_empty() {
            mutation = removed
                .coupon_ids()
                .fold(mutation.touching(SubCollection::Coupons), Mutation::evicting_coupon);
        }

        self.cache.invalidate(uow, &mutation).await;
        Ok(())
    }

    async fn load_client(&self, id: i64) -> ServiceResult<Client> {
        self.clients
            .find_client(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Client, id))
    }
}
