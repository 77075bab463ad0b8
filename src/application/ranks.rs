use std::sync::Arc;

use tracing::instrument;

use crate::application::error::AppError;
use crate::application::repos::{IdentitiesRepo, PermissionsRepo};
use crate::domain::ranks::{RankEntry, combine_ranks, verify_rank};
use crate::domain::types::Rank;

#[derive(Clone)]
pub struct RankService {
    permissions: Arc<dyn PermissionsRepo>,
    identities: Arc<dyn IdentitiesRepo>,
}

impl RankService {
    pub fn new(permissions: Arc<dyn PermissionsRepo>, identities: Arc<dyn IdentitiesRepo>) -> Self {
        Self {
            permissions,
            identities,
        }
    }

    /// Users holding `rank`, in permission-row order.
    #[instrument(skip(self))]
    pub async fn members(&self, rank: Rank) -> Result<Vec<RankEntry>, AppError> {
        let (identities, permissions) = futures::try_join!(
            self.identities.list_identities(),
            self.permissions.list_permissions()
        )?;
        Ok(combine_ranks(
            rank,
            verify_rank(&identities, &permissions, rank),
        ))
    }

    /// Every ranked user, grouped by tier from owner down.
    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<Vec<RankEntry>, AppError> {
        let (identities, permissions) = futures::try_join!(
            self.identities.list_identities(),
            self.permissions.list_permissions()
        )?;
        Ok(Rank::ALL
            .into_iter()
            .flat_map(|rank| combine_ranks(rank, verify_rank(&identities, &permissions, rank)))
            .collect())
    }
}
