//! Permission-rank aggregation over identity and permission rows.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::domain::entities::{IdentityRecord, PermissionRecord};
use crate::domain::types::{Rank, UserId};

/// A user holding some rank, before the rank label is attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankMember {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub rank: Rank,
}

/// Members holding `rank`, in permission-row order.
///
/// Permission rows that point at a missing identity are skipped.
pub fn verify_rank(
    identities: &[IdentityRecord],
    permissions: &[PermissionRecord],
    rank: Rank,
) -> Vec<RankMember> {
    let by_id: HashMap<&UserId, &IdentityRecord> =
        identities.iter().map(|identity| (&identity.id, identity)).collect();

    let mut dangling = 0usize;
    let members: Vec<RankMember> = permissions
        .iter()
        .filter(|row| row.rank == rank)
        .filter_map(|row| match by_id.get(&row.user_id) {
            Some(identity) => Some(RankMember {
                id: identity.id.clone(),
                name: identity.display_name.clone(),
            }),
            None => {
                dangling += 1;
                None
            }
        })
        .collect();

    if dangling > 0 {
        debug!(rank = %rank, dangling, "Skipped permission rows without an identity");
    }

    members
}

pub fn combine_ranks(rank: Rank, members: Vec<RankMember>) -> Vec<RankEntry> {
    members
        .into_iter()
        .map(|member| RankEntry {
            user_id: member.id,
            display_name: member.name,
            rank,
        })
        .collect()
}
