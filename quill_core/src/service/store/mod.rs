//! Durable records for users, groups, posts, comments and follow edges.
//!
//! Every listing query returns a concrete, eagerly loaded `Vec` in display
//! order: newest first by `created_at`, ties broken by the newer id.
//! Deletes clean up their dependents explicitly: removing a group detaches
//! its posts, removing a post removes its comments, and removing a user
//! removes everything they own plus every follow edge touching them.

use sea_orm::DatabaseConnection;
use serde::Serialize;
use thiserror::Error;

use crate::{
    entity::prelude::*,
    ids::{CommentId, GroupId, PostId, UserId},
};

mod comments;
mod groups;
mod posts;
mod users;

pub use posts::{NewPost, PostUpdate};

/// Longest comment body accepted, in characters.
pub const COMMENT_MAX_CHARS: usize = 400;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("forbidden: not the author")]
    Forbidden,
}

/// A post as shown in a feed, with its author and group resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSummary {
    pub id: PostId,
    pub author_id: UserId,
    pub author_username: String,
    pub group: Option<GroupRef>,
    pub text: String,
    pub image: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRef {
    pub id: GroupId,
    pub slug: String,
    pub title: String,
}

impl From<GroupModel> for GroupRef {
    fn from(group: GroupModel) -> Self {
        Self {
            id: group.id,
            slug: group.slug,
            title: group.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentSummary {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub author_username: String,
    pub text: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct EntityStore {
    db: DatabaseConnection,
}

impl EntityStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn require_text(field: &str, text: &str) -> Result<(), StoreError> {
    if text.trim().is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
