// SeaORM entities for the blog tables. Schema lives in `models::migrator`.

use chrono::{SecondsFormat, Utc};

pub mod comment;
pub mod follow;
pub mod group;
pub mod post;
pub mod user;

#[cfg(test)]
mod tests;

/// Current time as a fixed width RFC 3339 string.
///
/// Microsecond precision with a `Z` suffix keeps every value the same length,
/// so ordering the text column orders by time.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub mod prelude {
    pub use super::comment::{
        ActiveModel as CommentActiveModel, Column as CommentColumn, Entity as Comment,
        Model as CommentModel,
    };
    pub use super::follow::{
        ActiveModel as FollowActiveModel, Column as FollowColumn, Entity as Follow,
        Model as FollowModel,
    };
    pub use super::group::{
        ActiveModel as GroupActiveModel, Column as GroupColumn, Entity as Group,
        Model as GroupModel,
    };
    pub use super::post::{
        ActiveModel as PostActiveModel, Column as PostColumn, Entity as Post,
        Model as PostModel,
    };
    pub use super::user::{
        ActiveModel as UserActiveModel, Column as UserColumn, Entity as User,
        Model as UserModel,
    };

    pub use sea_orm::{
        ActiveModelTrait,
        ColumnTrait,
        ConnectionTrait,

        Database,
        DatabaseConnection,
        DatabaseTransaction,
        DbErr,

        EntityTrait,
        PaginatorTrait,
        QueryFilter,
        QueryOrder,
        QuerySelect,
        Set,
        TransactionTrait,
    };
}
