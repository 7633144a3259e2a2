use sea_orm::Condition;
use tracing::info;

use super::{require_text, EntityStore, StoreError};
use crate::{
    entity::{now_timestamp, prelude::*},
    ids::UserId,
};

impl EntityStore {
    /// Register a user. Called by the auth layer; usernames are unique.
    pub async fn create_user(&self, username: &str) -> Result<UserModel, StoreError> {
        require_text("username", username)?;

        let taken = User::find()
            .filter(UserColumn::Username.eq(username))
            .one(&self.db)
            .await?
            .is_some();

        if taken {
            return Err(StoreError::Validation(format!(
                "username {username} is already taken"
            )));
        }

        let user = UserActiveModel {
            id: Set(UserId::new()),
            username: Set(username.to_string()),
            created_at: Set(now_timestamp()),
        };

        let user = User::insert(user).exec_with_returning(&self.db).await?;
        info!(user_id = %user.id, username, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<UserModel, StoreError> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound("user"))
    }

    pub async fn user_by_username(&self, username: &str) -> Result<UserModel, StoreError> {
        User::find()
            .filter(UserColumn::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound("user"))
    }

    /// Delete a user together with their posts, every comment on those posts,
    /// their own comments and all follow edges in either direction.
    pub async fn delete_user(&self, user_id: UserId) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;

        if User::find_by_id(user_id).one(&txn).await?.is_none() {
            return Err(StoreError::NotFound("user"));
        }

        let post_ids: Vec<_> = Post::find()
            .filter(PostColumn::AuthorId.eq(user_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|post| post.id)
            .collect();

        let comments = Comment::delete_many()
            .filter(
                Condition::any()
                    .add(CommentColumn::AuthorId.eq(user_id))
                    .add(CommentColumn::PostId.is_in(post_ids)),
            )
            .exec(&txn)
            .await?;

        let posts = Post::delete_many()
            .filter(PostColumn::AuthorId.eq(user_id))
            .exec(&txn)
            .await?;

        let follows = Follow::delete_many()
            .filter(
                Condition::any()
                    .add(FollowColumn::AuthorId.eq(user_id))
                    .add(FollowColumn::UserId.eq(user_id)),
            )
            .exec(&txn)
            .await?;

        User::delete_by_id(user_id).exec(&txn).await?;

        txn.commit().await?;
        info!(
            %user_id,
            posts = posts.rows_affected,
            comments = comments.rows_affected,
            follows = follows.rows_affected,
            "user deleted"
        );
        Ok(())
    }
}
