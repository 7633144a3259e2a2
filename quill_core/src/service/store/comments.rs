use tracing::info;

use super::{require_text, CommentSummary, EntityStore, StoreError, COMMENT_MAX_CHARS};
use crate::{
    entity::{now_timestamp, prelude::*},
    ids::{CommentId, PostId, UserId},
};

impl EntityStore {
    pub async fn create_comment(
        &self,
        post_id: PostId,
        author_id: UserId,
        text: &str,
    ) -> Result<CommentModel, StoreError> {
        require_text("comment", text)?;
        if text.chars().count() > COMMENT_MAX_CHARS {
            return Err(StoreError::Validation(format!(
                "comment must be at most {COMMENT_MAX_CHARS} characters"
            )));
        }

        self.get_post(post_id).await?;
        self.get_user(author_id).await?;

        let comment = CommentActiveModel {
            id: Set(CommentId::new()),
            post_id: Set(post_id),
            author_id: Set(author_id),
            text: Set(text.to_string()),
            created_at: Set(now_timestamp()),
        };

        let comment = Comment::insert(comment)
            .exec_with_returning(&self.db)
            .await?;
        info!(comment_id = %comment.id, %post_id, %author_id, "comment created");
        Ok(comment)
    }

    /// Comments on a post, newest first.
    pub async fn comments_for_post(
        &self,
        post_id: PostId,
    ) -> Result<Vec<CommentSummary>, StoreError> {
        let rows = Comment::find()
            .filter(CommentColumn::PostId.eq(post_id))
            .order_by_desc(CommentColumn::CreatedAt)
            .order_by_desc(CommentColumn::Id)
            .find_also_related(User)
            .all(&self.db)
            .await?;

        rows.into_iter()
            .map(|(comment, author)| {
                let author = author.ok_or(StoreError::NotFound("user"))?;
                Ok(CommentSummary {
                    id: comment.id,
                    post_id: comment.post_id,
                    author_id: comment.author_id,
                    author_username: author.username,
                    text: comment.text,
                    created_at: comment.created_at,
                })
            })
            .collect()
    }
}
