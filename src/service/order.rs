//! Order reads, filtered searches and writes

use crate::cache::keys::PageFilter;
use crate::cache::namespace::{ClientScope, Resource, View};
use crate::cache::strategy::CacheStrategy;
use crate::cache::types::{Page, PageRequest};
use crate::invalidation::{Action, Mutation, UnitOfWork};
use crate::schema::repository::{ClientRepository, OrderRepository};
use crate::schema::types::{NewOrder, Order, OrderFilter};
use crate::service::{ServiceError, ServiceResult};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    clients: Arc<dyn ClientRepository>,
    cache: CacheStrategy,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        clients: Arc<dyn ClientRepository>,
        cache: CacheStrategy,
    ) -> Self {
        Self {
            orders,
            clients,
            cache,
        }
    }

    pub async fn get_order(&self, id: i64) -> ServiceResult<Order> {
        self.cache
            .entity(Resource::Order, id, || self.load_order(id))
            .await
    }

    pub async fn get_orders_page(&self, page: i64, size: i64) -> ServiceResult<Page<Order>> {
        self.cache
            .page(View::Orders, page, size, None, |request| async move {
                self.orders
                    .orders_page(request)
                    .await
                    .map_err(ServiceError::from)
            })
            .await
    }

    /// Orders of one client
    ///
    /// The client's existence is checked only when the page is not cached.
    pub async fn get_orders_page_by_client(
        &self,
        client_id: i64,
        page: i64,
        size: i64,
    ) -> ServiceResult<Page<Order>> {
        let scope = ClientScope::new(client_id);
        self.cache
            .page(
                View::OrdersByClient,
                page,
                size,
                Some(&scope as &dyn PageFilter),
                |request| async move {
                    self.require_client(client_id).await?;
                    self.orders
                        .orders_page_by_client(client_id, request)
                        .await
                        .map_err(ServiceError::from)
                },
            )
            .await
    }

    /// Orders matching `filter`, newest first
    ///
    /// Status-only filters are served from the `orders:byStatus` view; any
    /// other combination always reads the repository.
    pub async fn get_orders_by_filter(
        &self,
        filter: &OrderFilter,
        page: i64,
        size: i64,
    ) -> ServiceResult<Page<Order>> {
        if !filter.is_status_only() {
            debug!("Uncached order search: {}", filter.signature());
            return self.search(filter, self.cache.clamp(page, size)).await;
        }

        self.cache
            .page(
                View::OrdersByStatus,
                page,
                size,
                Some(filter as &dyn PageFilter),
                |request| self.search(filter, request),
            )
            .await
    }

    pub async fn add_order_to_client(
        &self,
        mut uow: Option<&mut UnitOfWork>,
        client_id: i64,
        new_order: NewOrder,
    ) -> ServiceResult<Order> {
        self.require_client(client_id).await?;
        let order = self.orders.insert_order(client_id, new_order).await?;

        self.cache
            .write_through_after_commit(
                uow.as_deref_mut(),
                Resource::Order,
                order.id,
                order.clone(),
            )
            .await;
        self.cache
            .invalidate(uow, &Mutation::order(Action::Added, order.id, client_id))
            .await;

        Ok(order)
    }

    pub async fn update_order(
        &self,
        uow: Option<&mut UnitOfWork>,
        id: i64,
        changes: NewOrder,
    ) -> ServiceResult<Order> {
        let order = self
            .orders
            .save_order(id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Order, id))?;

        self.cache
            .invalidate(uow, &Mutation::order(Action::Updated, id, order.client_id))
            .await;
        Ok(order)
    }

    pub async fn delete_order(&self, uow: Option<&mut UnitOfWork>, id: i64) -> ServiceResult<()> {
        let order = self
            .orders
            .delete_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Order, id))?;

        self.cache
            .invalidate(uow, &Mutation::order(Action::Deleted, id, order.client_id))
            .await;
        Ok(())
    }

    async fn load_order(&self, id: i64) -> ServiceResult<Order> {
        self.orders
            .find_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Order, id))
    }

    async fn search(&self, filter: &OrderFilter, request: PageRequest) -> ServiceResult<Page<Order>> {
        Ok(self.orders.orders_by_filter(filter, request).await?)
    }

    async fn require_client(&self, client_id: i64) -> ServiceResult<()> {
        if self.clients.client_exists(client_id).await? {
            Ok(())
        } else {
            Err(ServiceError::not_found(Resource::Client, client_id))
        }
    }
}
