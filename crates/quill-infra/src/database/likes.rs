//! Like toggling and per-viewer like lookups.

use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use quill_core::domain::{Like, LikeToggle};
use quill_core::error::RepoError;
use quill_core::ports::LikeRepository;

use super::entity::like::{self, Entity as LikeEntity};
use super::errors::map_db_err;
use super::postgres_repo::PostgresLikeRepository;

#[async_trait]
impl LikeRepository for PostgresLikeRepository {
    /// One transaction, two single-statement mutations guarded by the
    /// `(user_id, post_id)` primary key:
    ///
    /// 1. delete the pair; a removed row means the post is now unliked;
    /// 2. otherwise insert it with `ON CONFLICT DO NOTHING`;
    ///
    /// then count the post's likes inside the same transaction.
    async fn toggle(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeToggle, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let removed = LikeEntity::delete_many()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::PostId.eq(post_id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?
            .rows_affected;

        let liked = if removed > 0 {
            false
        } else {
            let row: like::ActiveModel = Like::new(user_id, post_id).into();
            LikeEntity::insert(row)
                .on_conflict(
                    OnConflict::columns([like::Column::UserId, like::Column::PostId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(map_db_err)?;
            true
        };

        let like_count = LikeEntity::find()
            .filter(like::Column::PostId.eq(post_id))
            .count(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::debug!(%user_id, %post_id, liked, like_count, "Like toggled");
        Ok(LikeToggle { liked, like_count })
    }

    async fn liked_post_ids(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, RepoError> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let liked: Vec<Uuid> = LikeEntity::find()
            .select_only()
            .column(like::Column::PostId)
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::PostId.is_in(post_ids.iter().copied()))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(liked.into_iter().collect())
    }
}
