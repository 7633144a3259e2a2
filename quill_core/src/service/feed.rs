//! Feed composition: which posts a viewer sees on which page.
//!
//! Every feed is computed from the current store and follow graph at request
//! time. The rendered global feed is the one exception: it is served from the
//! fragment cache for `index_cache_ttl`, so posts published inside that
//! window stay invisible there until the entry expires or is invalidated.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::follows::{FollowError, FollowGraph};
use super::store::{
    CommentSummary, EntityStore, NewPost, PostSummary, PostUpdate, StoreError,
};
use crate::{
    cache::{FragmentCache, FragmentKey},
    config::FeedConfig,
    entity::prelude::*,
    ids::{PostId, UserId},
    pagination::{paginate, Page, PageRequest},
    render::{RenderError, Renderer},
};

/// Fragment name the rendered global feed is cached under.
pub const INDEX_FRAGMENT: &str = "index_page";

pub const INDEX_TEMPLATE: &str = "index.html";
pub const FOLLOW_TEMPLATE: &str = "follow.html";
pub const GROUP_TEMPLATE: &str = "group.html";
pub const PROFILE_TEMPLATE: &str = "profile.html";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Follow(#[from] FollowError),

    #[error("authentication required")]
    PermissionRequired,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden: not the author")]
    Forbidden,

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl FeedError {
    /// Whether the surrounding layer should answer "not found".
    pub fn is_not_found(&self) -> bool {
        match self {
            FeedError::NotFound(_) | FeedError::Store(StoreError::NotFound(_)) => true,
            FeedError::Follow(error) => error.is_not_found(),
            _ => false,
        }
    }
}

/// Who is asking, as established by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Authenticated(UserId),
}

impl Viewer {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(user_id) => Some(*user_id),
        }
    }

    fn require(&self) -> Result<UserId, FeedError> {
        self.user_id().ok_or(FeedError::PermissionRequired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    pub page_size: usize,
    pub index_cache_ttl: Duration,
}

impl From<&FeedConfig> for FeedSettings {
    fn from(config: &FeedConfig) -> Self {
        Self {
            page_size: config.page_size,
            index_cache_ttl: config.index_cache_ttl(),
        }
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self::from(&FeedConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupFeed {
    pub group: GroupModel,
    pub page: Page<PostSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileFeed {
    pub author: UserModel,
    pub post_count: u64,
    /// Whether the viewer follows this author.
    pub following: bool,
    pub page: Page<PostSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetail {
    pub post: PostSummary,
    pub author_post_count: u64,
    pub comments: Vec<CommentSummary>,
}

#[derive(Clone)]
pub struct FeedService {
    store: EntityStore,
    graph: FollowGraph,
    cache: FragmentCache,
    renderer: Arc<dyn Renderer>,
    settings: FeedSettings,
}

impl FeedService {
    pub fn new(
        store: EntityStore,
        graph: FollowGraph,
        cache: FragmentCache,
        renderer: Arc<dyn Renderer>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            store,
            graph,
            cache,
            renderer,
            settings,
        }
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    // ---------------------------------------------------------------
    // Feeds
    // ---------------------------------------------------------------

    /// All posts, newest first.
    pub async fn global_feed(&self, page: PageRequest) -> Result<Page<PostSummary>, FeedError> {
        let posts = self.store.all_posts().await?;
        Ok(paginate(posts, self.settings.page_size, page))
    }

    /// Posts by the authors the viewer follows, newest first.
    ///
    /// Anonymous viewers get [`FeedError::PermissionRequired`]; following
    /// nobody yields an empty page.
    #[instrument(skip(self))]
    pub async fn followed_feed(
        &self,
        viewer: Viewer,
        page: PageRequest,
    ) -> Result<Page<PostSummary>, FeedError> {
        let user = viewer.require()?;
        let authors = self.graph.followed_authors(user).await?;
        debug!(authors = authors.len(), "composing followed feed");

        let posts = self.store.posts_by_author_set(&authors).await?;
        Ok(paginate(posts, self.settings.page_size, page))
    }

    pub async fn group_feed(&self, slug: &str, page: PageRequest) -> Result<GroupFeed, FeedError> {
        let group = self.store.group_by_slug(slug).await?;
        let posts = self.store.posts_in_group(group.id).await?;

        Ok(GroupFeed {
            group,
            page: paginate(posts, self.settings.page_size, page),
        })
    }

    pub async fn profile_feed(
        &self,
        viewer: Viewer,
        username: &str,
        page: PageRequest,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self.store.user_by_username(username).await?;
        let posts = self.store.posts_by_author(author.id).await?;
        let post_count = posts.len() as u64;

        let following = match viewer.user_id() {
            Some(user) => self.graph.follows(user, author.id).await?,
            None => false,
        };

        Ok(ProfileFeed {
            author,
            post_count,
            following,
            page: paginate(posts, self.settings.page_size, page),
        })
    }

    /// A single post addressed by its author's username and id.
    pub async fn post_detail(
        &self,
        username: &str,
        post_id: PostId,
    ) -> Result<PostDetail, FeedError> {
        let post = self.post_by_author(username, post_id).await?;
        let author_post_count = self.store.count_posts_by_author(post.author_id).await?;
        let comments = self.store.comments_for_post(post.id).await?;

        Ok(PostDetail {
            post: self.store.post_summary(post.id).await?,
            author_post_count,
            comments,
        })
    }

    // ---------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------

    /// Publish a post as the viewer.
    ///
    /// The cached global feed is left alone; the post shows up there once the
    /// cached page expires.
    pub async fn publish_post(
        &self,
        viewer: Viewer,
        new_post: NewPost,
    ) -> Result<PostModel, FeedError> {
        let author = viewer.require()?;
        Ok(self.store.create_post(author, new_post).await?)
    }

    pub async fn edit_post(
        &self,
        viewer: Viewer,
        username: &str,
        post_id: PostId,
        update: PostUpdate,
    ) -> Result<PostModel, FeedError> {
        let editor = viewer.require()?;
        let post = self.post_by_author(username, post_id).await?;

        match self.store.update_post(post.id, editor, update).await {
            Err(StoreError::Forbidden) => Err(FeedError::Forbidden),
            result => Ok(result?),
        }
    }

    pub async fn add_comment(
        &self,
        viewer: Viewer,
        username: &str,
        post_id: PostId,
        text: &str,
    ) -> Result<CommentModel, FeedError> {
        let author = viewer.require()?;
        let post = self.post_by_author(username, post_id).await?;
        Ok(self.store.create_comment(post.id, author, text).await?)
    }

    /// Follow `username` as the viewer. Self follows and repeats are no-ops.
    pub async fn follow_author(&self, viewer: Viewer, username: &str) -> Result<bool, FeedError> {
        let user = viewer.require()?;
        Ok(self.graph.follow_by_username(user, username).await?)
    }

    pub async fn unfollow_author(&self, viewer: Viewer, username: &str) -> Result<(), FeedError> {
        let user = viewer.require()?;
        Ok(self.graph.unfollow_by_username(user, username).await?)
    }

    // ---------------------------------------------------------------
    // Rendering
    // ---------------------------------------------------------------

    /// Rendered global feed page, served from the fragment cache.
    pub async fn render_global_feed(&self, page: PageRequest) -> Result<Bytes, FeedError> {
        let key = FragmentKey::new(INDEX_FRAGMENT).vary_on(page.number());

        self.cache
            .get_or_compute(&key, self.settings.index_cache_ttl, || async {
                let page = self.global_feed(page).await?;
                self.render_page(INDEX_TEMPLATE, &page, json!({}))
            })
            .await
    }

    pub async fn render_followed_feed(
        &self,
        viewer: Viewer,
        page: PageRequest,
    ) -> Result<Bytes, FeedError> {
        let page = self.followed_feed(viewer, page).await?;
        self.render_page(FOLLOW_TEMPLATE, &page, json!({}))
    }

    pub async fn render_group_feed(
        &self,
        slug: &str,
        page: PageRequest,
    ) -> Result<Bytes, FeedError> {
        let feed = self.group_feed(slug, page).await?;
        self.render_page(GROUP_TEMPLATE, &feed.page, json!({ "group": feed.group }))
    }

    pub async fn render_profile_feed(
        &self,
        viewer: Viewer,
        username: &str,
        page: PageRequest,
    ) -> Result<Bytes, FeedError> {
        let feed = self.profile_feed(viewer, username, page).await?;
        self.render_page(
            PROFILE_TEMPLATE,
            &feed.page,
            json!({
                "author": feed.author,
                "post_count": feed.post_count,
                "following": feed.following,
            }),
        )
    }

    /// Drop every cached page of the global feed.
    pub async fn invalidate_global_feed(&self) {
        self.cache.invalidate_fragment(INDEX_FRAGMENT).await;
        info!("global feed cache invalidated");
    }

    /// Drop one cached page of the global feed.
    pub async fn invalidate_global_feed_page(&self, page: PageRequest) {
        let key = FragmentKey::new(INDEX_FRAGMENT).vary_on(page.number());
        self.cache.invalidate(&key).await;
    }

    fn render_page(
        &self,
        template: &str,
        page: &Page<PostSummary>,
        extra: serde_json::Value,
    ) -> Result<Bytes, FeedError> {
        let mut context = json!({
            "page": page,
            "paginator": page.summary(),
        });
        if let (Some(context), serde_json::Value::Object(extra)) = (context.as_object_mut(), extra)
        {
            context.extend(extra);
        }

        Ok(self.renderer.render(template, &context)?)
    }

    async fn post_by_author(&self, username: &str, post_id: PostId) -> Result<PostModel, FeedError> {
        let author = self.store.user_by_username(username).await?;
        let post = self.store.get_post(post_id).await?;

        if post.author_id != author.id {
            return Err(FeedError::NotFound("post"));
        }
        Ok(post)
    }
}
