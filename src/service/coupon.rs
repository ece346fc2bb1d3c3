//! Coupon reads and writes
//!
//! Coupons are shared between clients, so every coupon write evicts each
//! linked client's cached aggregate.

use crate::cache::keys::PageFilter;
use crate::cache::namespace::{ClientScope, Resource, View};
use crate::cache::strategy::CacheStrategy;
use crate::cache::types::Page;
use crate::invalidation::{Action, Mutation, UnitOfWork};
use crate::schema::repository::{ClientRepository, CouponRepository};
use crate::schema::types::{Coupon, NewCoupon};
use crate::service::{ServiceError, ServiceResult};
use std::sync::Arc;

#[derive(Clone)]
pub struct CouponService {
    coupons: Arc<dyn CouponRepository>,
    clients: Arc<dyn ClientRepository>,
    cache: CacheStrategy,
}

impl CouponService {
    pub fn new(
        coupons: Arc<dyn CouponRepository>,
        clients: Arc<dyn ClientRepository>,
        cache: CacheStrategy,
    ) -> Self {
        Self {
            coupons,
            clients,
            cache,
        }
    }

    pub async fn get_coupon(&self, id: i64) -> ServiceResult<Coupon> {
        self.cache
            .entity(Resource::Coupon, id, || self.load_coupon(id))
            .await
    }

    pub async fn get_coupons_page(&self, page: i64, size: i64) -> ServiceResult<Page<Coupon>> {
        self.cache
            .page(View::Coupons, page, size, None, |request| async move {
                self.coupons
                    .coupons_page(request)
                    .await
                    .map_err(ServiceError::from)
            })
            .await
    }

    pub async fn get_coupons_page_by_client(
        &self,
        client_id: i64,
        page: i64,
        size: i64,
    ) -> ServiceResult<Page<Coupon>> {
        let scope = ClientScope::new(client_id);
        self.cache
            .page(
                View::CouponsByClient,
                page,
                size,
                Some(&scope as &dyn PageFilter),
                |request| async move {
                    self.require_client(client_id).await?;
                    self.coupons
                        .coupons_page_by_client(client_id, request)
                        .await
                        .map_err(ServiceError::from)
                },
            )
            .await
    }

    pub async fn add_coupon_to_client(
        &self,
        mut uow: Option<&mut UnitOfWork>,
        client_id: i64,
        new_coupon: NewCoupon,
    ) -> ServiceResult<Coupon> {
        self.require_client(client_id).await?;
        let coupon = self.coupons.insert_coupon(client_id, new_coupon).await?;

        self.cache
            .write_through_after_commit(
                uow.as_deref_mut(),
                Resource::Coupon,
                coupon.id,
                coupon.clone(),
            )
            .await;
        let mutation = Mutation::coupon(Action::Added, coupon.id, coupon.client_ids.clone());
        self.cache.invalidate(uow, &mutation).await;

        Ok(coupon)
    }

    pub async fn update_coupon(
        &self,
        uow: Option<&mut UnitOfWork>,
        id: i64,
        changes: NewCoupon,
    ) -> ServiceResult<Coupon> {
        let coupon = self
            .coupons
            .save_coupon(id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Coupon, id))?;

        let mutation = Mutation::coupon(Action::Updated, id, coupon.client_ids.clone());
        self.cache.invalidate(uow, &mutation).await;
        Ok(coupon)
    }

    pub async fn delete_coupon(&self, uow: Option<&mut UnitOfWork>, id: i64) -> ServiceResult<()> {
        let coupon = self
            .coupons
            .delete_coupon(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Coupon, id))?;

        let mutation = Mutation::coupon(Action::Deleted, id, coupon.client_ids);
        self.cache.invalidate(uow, &mutation).await;
        Ok(())
    }

    async fn load_coupon(&self, id: i64) -> ServiceResult<Coupon> {
        self.coupons
            .find_coupon(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Coupon, id))
    }

    async fn require_client(&self, client_id: i64) -> ServiceResult<()> {
        if self.clients.client_exists(client_id).await? {
            Ok(())
        } else {
            Err(ServiceError::not_found(Resource::Client, client_id))
        }
    }
}
