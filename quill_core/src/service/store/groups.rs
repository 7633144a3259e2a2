use sea_orm::{sea_query::Expr, Value};
use tracing::info;

use super::{require_text, EntityStore, StoreError};
use crate::{entity::prelude::*, ids::GroupId};

fn valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl EntityStore {
    pub async fn create_group(
        &self,
        title: &str,
        slug: &str,
        description: &str,
    ) -> Result<GroupModel, StoreError> {
        require_text("title", title)?;
        if title.chars().count() > 200 {
            return Err(StoreError::Validation(
                "title must be at most 200 characters".to_string(),
            ));
        }
        if !valid_slug(slug) {
            return Err(StoreError::Validation(format!("invalid slug {slug:?}")));
        }

        let taken = Group::find()
            .filter(GroupColumn::Slug.eq(slug))
            .one(&self.db)
            .await?
            .is_some();

        if taken {
            return Err(StoreError::Validation(format!(
                "slug {slug} is already taken"
            )));
        }

        let group = GroupActiveModel {
            id: Set(GroupId::new()),
            title: Set(title.to_string()),
            slug: Set(slug.to_string()),
            description: Set(description.to_string()),
        };

        let group = Group::insert(group).exec_with_returning(&self.db).await?;
        info!(group_id = %group.id, slug, "group created");
        Ok(group)
    }

    pub async fn get_group(&self, group_id: GroupId) -> Result<GroupModel, StoreError> {
        Group::find_by_id(group_id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound("group"))
    }

    pub async fn group_by_slug(&self, slug: &str) -> Result<GroupModel, StoreError> {
        Group::find()
            .filter(GroupColumn::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound("group"))
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupModel>, StoreError> {
        Ok(Group::find()
            .order_by_asc(GroupColumn::Title)
            .all(&self.db)
            .await?)
    }

    /// Delete a group. Its posts stay, without a group.
    pub async fn delete_group(&self, group_id: GroupId) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;

        if Group::find_by_id(group_id).one(&txn).await?.is_none() {
            return Err(StoreError::NotFound("group"));
        }

        let detached = Post::update_many()
            .col_expr(PostColumn::GroupId, Expr::value(Value::Uuid(None)))
            .filter(PostColumn::GroupId.eq(group_id))
            .exec(&txn)
            .await?;

        Group::delete_by_id(group_id).exec(&txn).await?;

        txn.commit().await?;
        info!(%group_id, detached_posts = detached.rows_affected, "group deleted");
        Ok(())
    }
}
