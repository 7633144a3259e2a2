#[cfg(test)]
mod entity_tests {
    use crate::entity::{now_timestamp, prelude::*};
    use crate::ids::*;
    use crate::test_utils::setup_test_db;

    async fn insert_user(db: &DatabaseConnection, username: &str) -> UserId {
        let user_id = UserId::new();
        let user = UserActiveModel {
            id: Set(user_id),
            username: Set(username.to_string()),
            created_at: Set(now_timestamp()),
        };
        User::insert(user).exec(db).await.unwrap();
        user_id
    }

    async fn insert_post(db: &DatabaseConnection, author: UserId, group: Option<GroupId>) -> PostId {
        let post_id = PostId::new();
        let post = PostActiveModel {
            id: Set(post_id),
            author_id: Set(author),
            group_id: Set(group),
            text: Set("hello".to_string()),
            image: Set(None),
            created_at: Set(now_timestamp()),
        };
        Post::insert(post).exec(db).await.unwrap();
        post_id
    }

    fn follow_edge(user: UserId, author: UserId) -> FollowActiveModel {
        FollowActiveModel {
            id: Set(FollowId::new()),
            author_id: Set(author),
            user_id: Set(user),
            created_at: Set(now_timestamp()),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let db = setup_test_db().await;
        let user_id = insert_user(&db, "alice").await;

        let found = User::find_by_id(user_id)
            .one(&db)
            .await
            .expect("Failed to query user");

        assert!(found.is_some());
        let found = found.unwrap();
        assert_eq!(found.username, "alice");
        assert_eq!(found.created_at.len(), now_timestamp().len());
    }

    #[tokio::test]
    async fn test_username_unique_constraint() {
        let db = setup_test_db().await;
        insert_user(&db, "alice").await;

        let duplicate = UserActiveModel {
            id: Set(UserId::new()),
            username: Set("alice".to_string()),
            created_at: Set(now_timestamp()),
        };
        let result = User::insert(duplicate).exec(&db).await;

        assert!(result.is_err(), "Should fail due to unique username");
    }

    #[tokio::test]
    async fn test_group_slug_unique_constraint() {
        let db = setup_test_db().await;

        for title in ["Cats", "More cats"] {
            let group = GroupActiveModel {
                id: Set(GroupId::new()),
                title: Set(title.to_string()),
                slug: Set("cats".to_string()),
                description: Set(String::new()),
            };
            let result = Group::insert(group).exec(&db).await;
            if title == "Cats" {
                assert!(result.is_ok());
            } else {
                assert!(result.is_err(), "Should fail due to unique slug");
            }
        }
    }

    #[tokio::test]
    async fn test_post_with_author_relation() {
        let db = setup_test_db().await;
        let author = insert_user(&db, "alice").await;
        insert_post(&db, author, None).await;

        let rows = Post::find().find_also_related(User).all(&db).await.unwrap();

        assert_eq!(rows.len(), 1);
        let (post, user) = &rows[0];
        assert_eq!(post.author_id, author);
        assert_eq!(user.as_ref().map(|u| u.username.as_str()), Some("alice"));
    }

    #[tokio::test]
    async fn test_follow_pair_unique_constraint() {
        let db = setup_test_db().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;

        Follow::insert(follow_edge(alice, bob)).exec(&db).await.unwrap();

        let duplicate = Follow::insert(follow_edge(alice, bob)).exec(&db).await;
        assert!(duplicate.is_err(), "Should fail due to unique follow pair");

        // reverse direction is a different edge
        Follow::insert(follow_edge(bob, alice)).exec(&db).await.unwrap();
        assert_eq!(Follow::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_foreign_keys_restrict_delete() {
        let db = setup_test_db().await;
        let author = insert_user(&db, "alice").await;
        insert_post(&db, author, None).await;

        let result = User::delete_by_id(author).exec(&db).await;
        assert!(result.is_err(), "Should fail while the user still has posts");

        let orphan = PostActiveModel {
            id: Set(PostId::new()),
            author_id: Set(UserId::new()),
            group_id: Set(None),
            text: Set("orphan".to_string()),
            image: Set(None),
            created_at: Set(now_timestamp()),
        };
        assert!(Post::insert(orphan).exec(&db).await.is_err());
    }

    #[tokio::test]
    async fn test_filter_posts_by_group() {
        let db = setup_test_db().await;
        let author = insert_user(&db, "alice").await;

        let group_id = GroupId::new();
        let group = GroupActiveModel {
            id: Set(group_id),
            title: Set("Cats".to_string()),
            slug: Set("cats".to_string()),
            description: Set(String::new()),
        };
        Group::insert(group).exec(&db).await.unwrap();

        let in_group = insert_post(&db, author, Some(group_id)).await;
        insert_post(&db, author, None).await;

        let posts = Post::find()
            .filter(PostColumn::GroupId.eq(group_id))
            .all(&db)
            .await
            .unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, in_group);
    }
}
