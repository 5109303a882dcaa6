use std::sync::Arc;

use userserv_auth::{AccessGuard, Caller};
use userserv_core::{NewPrincipal, Principal, PrincipalId, PrincipalPatch, PrincipalView};
use userserv_storage::DynRecordStore;

use super::{principal_keys, require_identity};
use crate::cache::{CacheCoordinator, CacheKey};
use crate::error::{ServiceError, ServiceResult};

/// Principal operations over the record store and the cache.
#[derive(Clone)]
pub struct PrincipalService {
    store: DynRecordStore,
    cache: Arc<CacheCoordinator>,
}

impl PrincipalService {
    pub fn new(store: DynRecordStore, cache: Arc<CacheCoordinator>) -> Self {
        Self { store, cache }
    }

    /// Creates the caller's own principal record.
    ///
    /// The identifier is the caller's. Nothing is cached; the first read
    /// populates the cache.
    #[tracing::instrument(skip(self, new))]
    pub async fn create(&self, caller: &Caller, new: NewPrincipal) -> ServiceResult<PrincipalView> {
        let id = require_identity(caller)?;

        if self.store.principal_email_exists(&new.email).await? {
            return Err(ServiceError::conflict("email", new.email));
        }

        let principal = self
            .store
            .insert_principal(&Principal::from_new(id, new))
            .await?;

        tracing::info!(principal_id = %id, "Principal created");
        Ok(PrincipalView::new(principal, Vec::new()))
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, caller: &Caller, id: PrincipalId) -> ServiceResult<PrincipalView> {
        ServiceError::check(AccessGuard::authorize(caller, id))?;

        let key = CacheKey::principal_id(id);
        if let Some(view) = self.cache.get::<PrincipalView>(&key).await {
            return Ok(view);
        }

        let principal = self
            .store
            .find_principal(id)
            .await?
            .ok_or_else(ServiceError::user_not_found)?;
        let view = self.view_of(principal).await?;

        self.cache.put(&key, &view).await;
        Ok(view)
    }

    /// Looks a principal up by email. Only the owner may read it.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_email(&self, caller: &Caller, email: &str) -> ServiceResult<PrincipalView> {
        require_identity(caller)?;

        let key = CacheKey::principal_email(email);
        if let Some(view) = self.cache.get::<PrincipalView>(&key).await {
            ServiceError::check(AccessGuard::authorize(caller, view.id))?;
            return Ok(view);
        }

        let principal = self
            .store
            .find_principal_by_email(email)
            .await?
            .ok_or_else(ServiceError::user_not_found)?;
        ServiceError::check(AccessGuard::authorize(caller, principal.id))?;
        let view = self.view_of(principal).await?;

        self.cache.put(&key, &view).await;
        Ok(view)
    }

    /// Batch lookup. Bypasses the cache; records the caller does not own are
    /// dropped from the result.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn find_by_ids(
        &self,
        caller: &Caller,
        ids: &[PrincipalId],
    ) -> ServiceResult<Vec<PrincipalView>> {
        require_identity(caller)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let principals = self.store.find_principals(ids).await?;
        let owned = AccessGuard::retain_owned(caller, principals, |p| p.id);

        let mut views = Vec::with_capacity(owned.len());
        for principal in owned {
            views.push(self.view_of(principal).await?);
        }
        Ok(views)
    }

    /// Applies `patch` to the caller's own record.
    ///
    /// Evicts the entry under the old email (and the new one, if the email
    /// changed) and replaces the entry under the id.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(
        &self,
        caller: &Caller,
        id: PrincipalId,
        patch: PrincipalPatch,
    ) -> ServiceResult<PrincipalView> {
        ServiceError::check(AccessGuard::authorize(caller, id))?;

        let current = self
            .store
            .find_principal(id)
            .await?
            .ok_or_else(ServiceError::user_not_found)?;

        if let Some(email) = current.email_change(&patch) {
            if self.store.principal_email_exists(email).await? {
                return Err(ServiceError::conflict("email", email));
            }
        }

        let updated = self.store.update_principal(&current.patched(&patch)).await?;

        let mut stale = vec![CacheKey::principal_email(&current.email)];
        if updated.email != current.email {
            stale.push(CacheKey::principal_email(&updated.email));
        }
        self.cache.evict_many(&stale).await;

        let id_key = CacheKey::principal_id(id);
        let view = match self.view_of(updated).await {
            Ok(view) => view,
            Err(e) => {
                // The row changed; whatever sits under the id is stale now
                self.cache.evict(&id_key).await;
                return Err(e);
            }
        };
        self.cache.put(&id_key, &view).await;

        tracing::info!(principal_id = %id, "Principal updated");
        Ok(view)
    }

    /// Deletes the caller's own record together with every card it owns.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, caller: &Caller, id: PrincipalId) -> ServiceResult<()> {
        ServiceError::check(AccessGuard::authorize(caller, id))?;

        let deleted = self.store.delete_principal(id).await?;

        let mut stale = Vec::with_capacity(deleted.cards.len() + 2);
        stale.extend(principal_keys(&deleted.principal));
        stale.extend(deleted.cards.iter().map(|card| CacheKey::card(*card)));
        self.cache.evict_many(&stale).await;

        tracing::info!(
            principal_id = %id,
            cards = deleted.cards.len(),
            "Principal deleted"
        );
        Ok(())
    }

    async fn view_of(&self, principal: Principal) -> ServiceResult<PrincipalView> {
        let cards = self.store.find_cards_by_owner(principal.id).await?;
        Ok(PrincipalView::new(principal, cards))
    }
}
