use std::collections::{HashMap, HashSet};

use sea_orm::{ConnectionTrait, Select};
use tracing::info;

use super::{require_text, EntityStore, GroupRef, PostSummary, StoreError};
use crate::{
    entity::{now_timestamp, prelude::*},
    ids::{GroupId, PostId, UserId},
};

/// Fields of a post being published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPost {
    pub text: String,
    pub group: Option<GroupId>,
    pub image: Option<String>,
}

impl NewPost {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn in_group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Changes to an existing post. `None` leaves a field untouched; the inner
/// `Option` of `group`/`image` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostUpdate {
    pub text: Option<String>,
    pub group: Option<Option<GroupId>>,
    pub image: Option<Option<String>>,
}

impl EntityStore {
    pub async fn create_post(
        &self,
        author_id: UserId,
        new_post: NewPost,
    ) -> Result<PostModel, StoreError> {
        require_text("text", &new_post.text)?;
        self.get_user(author_id).await?;
        if let Some(group_id) = new_post.group {
            self.get_group(group_id).await?;
        }

        let post = PostActiveModel {
            id: Set(PostId::new()),
            author_id: Set(author_id),
            group_id: Set(new_post.group),
            text: Set(new_post.text),
            image: Set(new_post.image),
            created_at: Set(now_timestamp()),
        };

        let post = Post::insert(post).exec_with_returning(&self.db).await?;
        info!(post_id = %post.id, %author_id, "post created");
        Ok(post)
    }

    pub async fn get_post(&self, post_id: PostId) -> Result<PostModel, StoreError> {
        Post::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound("post"))
    }

    /// Update a post (only by author). `created_at` never changes.
    pub async fn update_post(
        &self,
        post_id: PostId,
        editor: UserId,
        update: PostUpdate,
    ) -> Result<PostModel, StoreError> {
        let post = self.get_post(post_id).await?;
        if post.author_id != editor {
            return Err(StoreError::Forbidden);
        }

        let mut post_active: PostActiveModel = post.into();

        if let Some(text) = update.text {
            require_text("text", &text)?;
            post_active.text = Set(text);
        }

        if let Some(group) = update.group {
            if let Some(group_id) = group {
                self.get_group(group_id).await?;
            }
            post_active.group_id = Set(group);
        }

        if let Some(image) = update.image {
            post_active.image = Set(image);
        }

        let updated = post_active.update(&self.db).await?;
        info!(%post_id, "post updated");
        Ok(updated)
    }

    /// Delete a post (only by author) and its comments.
    pub async fn delete_post(&self, post_id: PostId, editor: UserId) -> Result<(), StoreError> {
        let post = self.get_post(post_id).await?;
        if post.author_id != editor {
            return Err(StoreError::Forbidden);
        }

        let txn = self.db.begin().await?;

        let comments = Comment::delete_many()
            .filter(CommentColumn::PostId.eq(post_id))
            .exec(&txn)
            .await?;
        Post::delete_by_id(post_id).exec(&txn).await?;

        txn.commit().await?;
        info!(%post_id, comments = comments.rows_affected, "post deleted");
        Ok(())
    }

    /// Every post, newest first.
    pub async fn all_posts(&self) -> Result<Vec<PostSummary>, StoreError> {
        summarize(&self.db, Post::find()).await
    }

    /// Posts written by any of `authors`, newest first.
    pub async fn posts_by_author_set(
        &self,
        authors: &HashSet<UserId>,
    ) -> Result<Vec<PostSummary>, StoreError> {
        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let select = Post::find().filter(PostColumn::AuthorId.is_in(authors.iter().copied()));
        summarize(&self.db, select).await
    }

    pub async fn posts_by_author(&self, author_id: UserId) -> Result<Vec<PostSummary>, StoreError> {
        let select = Post::find().filter(PostColumn::AuthorId.eq(author_id));
        summarize(&self.db, select).await
    }

    pub async fn posts_in_group(&self, group_id: GroupId) -> Result<Vec<PostSummary>, StoreError> {
        let select = Post::find().filter(PostColumn::GroupId.eq(group_id));
        summarize(&self.db, select).await
    }

    pub async fn count_posts_by_author(&self, author_id: UserId) -> Result<u64, StoreError> {
        let count = Post::find()
            .filter(PostColumn::AuthorId.eq(author_id))
            .count(&self.db)
            .await?;

        Ok(count)
    }

    pub async fn post_summary(&self, post_id: PostId) -> Result<PostSummary, StoreError> {
        let select = Post::find().filter(PostColumn::Id.eq(post_id));
        summarize(&self.db, select)
            .await?
            .pop()
            .ok_or(StoreError::NotFound("post"))
    }
}

/// Runs `select` in feed order and resolves authors and groups.
async fn summarize<C>(db: &C, select: Select<Post>) -> Result<Vec<PostSummary>, StoreError>
where
    C: ConnectionTrait,
{
    let rows = select
        .order_by_desc(PostColumn::CreatedAt)
        .order_by_desc(PostColumn::Id)
        .find_also_related(User)
        .all(db)
        .await?;

    let group_ids: HashSet<GroupId> = rows.iter().filter_map(|(post, _)| post.group_id).collect();
    let groups: HashMap<GroupId, GroupRef> = if group_ids.is_empty() {
        HashMap::new()
    } else {
        Group::find()
            .filter(GroupColumn::Id.is_in(group_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|group| (group.id, GroupRef::from(group)))
            .collect()
    };

    rows.into_iter()
        .map(|(post, author)| {
            let author = author.ok_or(StoreError::NotFound("user"))?;
            Ok(PostSummary {
                id: post.id,
                author_id: post.author_id,
                author_username: author.username,
                group: post.group_id.and_then(|id| groups.get(&id).cloned()),
                text: post.text,
                image: post.image,
                created_at: post.created_at,
            })
        })
        .collect()
}
