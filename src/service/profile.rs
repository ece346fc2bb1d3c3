//! Profile reads and updates

use crate::cache::namespace::{Resource, View};
use crate::cache::strategy::CacheStrategy;
use crate::cache::types::Page;
use crate::invalidation::{Action, Mutation, UnitOfWork};
use crate::schema::repository::{ClientRepository, ProfileRepository};
use crate::schema::types::{Profile, ProfileData};
use crate::service::{ServiceError, ServiceResult};
use std::sync::Arc;

#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
    clients: Arc<dyn ClientRepository>,
    cache: CacheStrategy,
}

impl ProfileService {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        clients: Arc<dyn ClientRepository>,
        cache: CacheStrategy,
    ) -> Self {
        Self {
            profiles,
            clients,
            cache,
        }
    }

    pub async fn get_profile(&self, id: i64) -> ServiceResult<Profile> {
        self.cache
            .entity(Resource::Profile, id, || self.load_profile(id))
            .await
    }

    pub async fn get_profiles_page(&self, page: i64, size: i64) -> ServiceResult<Page<Profile>> {
        self.cache
            .page(View::Profiles, page, size, None, |request| async move {
                self.profiles
                    .profiles_page(request)
                    .await
                    .map_err(ServiceError::from)
            })
            .await
    }

    /// Replace the address and phone of a client's profile
    ///
    /// Fails with a bad request when the client exists but has no profile.
    pub async fn update_profile(
        &self,
        uow: Option<&mut UnitOfWork>,
        client_id: i64,
        data: ProfileData,
    ) -> ServiceResult<Profile> {
        if !self.clients.client_exists(client_id).await? {
            return Err(ServiceError::not_found(Resource::Client, client_id));
        }

        let current = self
            .profiles
            .profile_of_client(client_id)
            .await?
            .ok_or_else(|| ServiceError::BadRequest("Client hasn't a profile".to_string()))?;

        let profile = self
            .profiles
            .save_profile(current.id, data)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Profile, current.id))?;

        self.cache
            .invalidate(uow, &Mutation::profile(Action::Updated, profile.id, client_id))
            .await;
        Ok(profile)
    }

    async fn load_profile(&self, id: i64) -> ServiceResult<Profile> {
        self.profiles
            .find_profile(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Profile, id))
    }
}
