//! The follow graph: directed edges from a follower to an author.
//!
//! Membership is always read from the current table, so a follow or
//! unfollow is visible to the very next feed request.

use std::collections::HashSet;

use sea_orm::{sea_query::OnConflict, DatabaseConnection};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    entity::{now_timestamp, prelude::*},
    ids::{FollowId, UserId},
};

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("user not found")]
    UserNotFound,

    #[error("not following this author")]
    NotFollowing,
}

impl FollowError {
    /// Both lookup failures map to "not found" for the caller.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FollowError::UserNotFound | FollowError::NotFollowing)
    }
}

#[derive(Clone)]
pub struct FollowGraph {
    db: DatabaseConnection,
}

impl FollowGraph {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Whether `user` follows `author`.
    pub async fn follows(&self, user: UserId, author: UserId) -> Result<bool, FollowError> {
        let edge = Follow::find()
            .filter(FollowColumn::AuthorId.eq(author))
            .filter(FollowColumn::UserId.eq(user))
            .one(&self.db)
            .await?;

        Ok(edge.is_some())
    }

    /// Make `user` follow `author`.
    ///
    /// Following yourself or an author you already follow does nothing.
    /// Returns whether a new edge was created. Concurrent calls for the same
    /// pair leave exactly one edge.
    pub async fn follow(&self, user: UserId, author: UserId) -> Result<bool, FollowError> {
        if user == author {
            debug!(%user, "ignoring self follow");
            return Ok(false);
        }

        self.require_user(user).await?;
        self.require_user(author).await?;

        let edge = FollowActiveModel {
            id: Set(FollowId::new()),
            author_id: Set(author),
            user_id: Set(user),
            created_at: Set(now_timestamp()),
        };

        let inserted = Follow::insert(edge)
            .on_conflict(
                OnConflict::columns([FollowColumn::AuthorId, FollowColumn::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        let created = inserted > 0;
        if created {
            info!(%user, %author, "follow created");
        } else {
            debug!(%user, %author, "already following");
        }
        Ok(created)
    }

    /// Remove the edge `user` → `author`.
    ///
    /// Fails with [`FollowError::NotFollowing`] when there is no such edge;
    /// of two concurrent calls exactly one succeeds.
    pub async fn unfollow(&self, user: UserId, author: UserId) -> Result<(), FollowError> {
        let result = Follow::delete_many()
            .filter(FollowColumn::AuthorId.eq(author))
            .filter(FollowColumn::UserId.eq(user))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(FollowError::NotFollowing);
        }

        info!(%user, %author, "follow removed");
        Ok(())
    }

    /// Authors `user` follows.
    pub async fn followed_authors(&self, user: UserId) -> Result<HashSet<UserId>, FollowError> {
        let edges = Follow::find()
            .filter(FollowColumn::UserId.eq(user))
            .all(&self.db)
            .await?;

        Ok(edges.into_iter().map(|edge| edge.author_id).collect())
    }

    /// Users following `author`.
    pub async fn followers(&self, author: UserId) -> Result<HashSet<UserId>, FollowError> {
        let edges = Follow::find()
            .filter(FollowColumn::AuthorId.eq(author))
            .all(&self.db)
            .await?;

        Ok(edges.into_iter().map(|edge| edge.user_id).collect())
    }

    pub async fn following_count(&self, user: UserId) -> Result<u64, FollowError> {
        let count = Follow::find()
            .filter(FollowColumn::UserId.eq(user))
            .count(&self.db)
            .await?;

        Ok(count)
    }

    pub async fn follower_count(&self, author: UserId) -> Result<u64, FollowError> {
        let count = Follow::find()
            .filter(FollowColumn::AuthorId.eq(author))
            .count(&self.db)
            .await?;

        Ok(count)
    }

    /// [`FollowGraph::follow`] with the author looked up by username.
    pub async fn follow_by_username(
        &self,
        user: UserId,
        author_username: &str,
    ) -> Result<bool, FollowError> {
        let author = self.user_id_by_username(author_username).await?;
        self.follow(user, author).await
    }

    /// [`FollowGraph::unfollow`] with the author looked up by username.
    pub async fn unfollow_by_username(
        &self,
        user: UserId,
        author_username: &str,
    ) -> Result<(), FollowError> {
        let author = self.user_id_by_username(author_username).await?;
        self.unfollow(user, author).await
    }

    async fn user_id_by_username(&self, username: &str) -> Result<UserId, FollowError> {
        User::find()
            .filter(UserColumn::Username.eq(username))
            .one(&self.db)
            .await?
            .map(|user| user.id)
            .ok_or(FollowError::UserNotFound)
    }

    async fn require_user(&self, user: UserId) -> Result<(), FollowError> {
        User::find_by_id(user)
            .one(&self.db)
            .await?
            .map(|_| ())
            .ok_or(FollowError::UserNotFound)
    }
}
