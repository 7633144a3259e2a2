use std::sync::Arc;
use std::time::Duration;

use quill_core::{
    cache::{FragmentCache, MemoryCache},
    models,
    pagination::{Page, PageRequest},
    render::JsonRenderer,
    service::{
        feed::{FeedService, FeedSettings, Viewer},
        follows::FollowGraph,
        store::{EntityStore, NewPost, PostSummary},
    },
};

struct Harness {
    store: EntityStore,
    graph: FollowGraph,
    feed: FeedService,
}

async fn harness(settings: FeedSettings) -> Harness {
    let db = models::connect("sqlite::memory:").await.unwrap();
    models::migrate_up(&db).await.unwrap();

    let store = EntityStore::new(db.clone());
    let graph = FollowGraph::new(db);
    let feed = FeedService::new(
        store.clone(),
        graph.clone(),
        FragmentCache::new(Arc::new(MemoryCache::new(128))),
        Arc::new(JsonRenderer),
        settings,
    );

    Harness { store, graph, feed }
}

async fn viewer(harness: &Harness, username: &str) -> Viewer {
    let user = harness.store.create_user(username).await.unwrap();
    Viewer::Authenticated(user.id)
}

fn texts(page: &Page<PostSummary>) -> Vec<&str> {
    page.items.iter().map(|p| p.text.as_str()).collect()
}

#[tokio::test]
async fn alice_following_nobody_sees_empty_feed() {
    let h = harness(FeedSettings::default()).await;
    let alice = viewer(&h, "alice").await;
    let bob = viewer(&h, "bob").await;
    h.feed.publish_post(bob, NewPost::text("hello")).await.unwrap();

    let page = h.feed.followed_feed(alice, PageRequest::first()).await.unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 0);
    assert_eq!(page.num_pages, 1);
}

#[tokio::test]
async fn alice_sees_bobs_post_after_following() {
    let h = harness(FeedSettings::default()).await;
    let alice = viewer(&h, "alice").await;
    let bob = viewer(&h, "bob").await;

    h.feed.follow_author(alice, "bob").await.unwrap();
    h.feed.publish_post(bob, NewPost::text("hello")).await.unwrap();

    let page = h.feed.followed_feed(alice, PageRequest::first()).await.unwrap();
    assert_eq!(texts(&page), vec!["hello"]);
}

#[tokio::test]
async fn eleven_posts_span_two_pages() {
    let h = harness(FeedSettings::default()).await;
    let alice = viewer(&h, "alice").await;
    for i in 0..11 {
        h.feed
            .publish_post(alice, NewPost::text(format!("post {i}")))
            .await
            .unwrap();
    }

    let first = h.feed.global_feed(PageRequest::first()).await.unwrap();
    assert_eq!(first.items.len(), 10);
    assert!(first.has_next);
    assert!(!first.has_prev);

    let second = h.feed.global_feed(PageRequest::from(2usize)).await.unwrap();
    assert_eq!(texts(&second), vec!["post 0"]);
    assert!(!second.has_next);
    assert!(second.has_prev);

    let last = h.feed.global_feed(PageRequest::parse(Some("last"))).await.unwrap();
    assert_eq!(last, second);
    let zero = h.feed.global_feed(PageRequest::parse(Some("0"))).await.unwrap();
    assert_eq!(zero, first);
}

#[tokio::test]
async fn cached_global_feed_is_stale_until_invalidated() {
    let h = harness(FeedSettings::default()).await;
    let alice = viewer(&h, "alice").await;
    h.feed.publish_post(alice, NewPost::text("first")).await.unwrap();

    let before = h.feed.render_global_feed(PageRequest::first()).await.unwrap();
    h.feed.publish_post(alice, NewPost::text("second")).await.unwrap();
    let during = h.feed.render_global_feed(PageRequest::first()).await.unwrap();
    assert_eq!(before, during);

    h.feed.invalidate_global_feed_page(PageRequest::first()).await;
    let after = h.feed.render_global_feed(PageRequest::first()).await.unwrap();
    assert_ne!(during, after);
    assert!(String::from_utf8_lossy(&after).contains("second"));
}

#[tokio::test]
async fn cached_global_feed_refreshes_after_ttl() {
    let h = harness(FeedSettings {
        index_cache_ttl: Duration::from_millis(50),
        ..FeedSettings::default()
    })
    .await;
    let alice = viewer(&h, "alice").await;
    h.feed.publish_post(alice, NewPost::text("first")).await.unwrap();

    let before = h.feed.render_global_feed(PageRequest::first()).await.unwrap();
    h.feed.publish_post(alice, NewPost::text("second")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;

    let after = h.feed.render_global_feed(PageRequest::first()).await.unwrap();
    assert_ne!(before, after);
    assert!(String::from_utf8_lossy(&after).contains("second"));
}

#[tokio::test]
async fn unfollow_hides_later_posts() {
    let h = harness(FeedSettings::default()).await;
    let alice = viewer(&h, "alice").await;
    let bob = viewer(&h, "bob").await;

    h.feed.follow_author(alice, "bob").await.unwrap();
    h.feed.publish_post(bob, NewPost::text("before")).await.unwrap();
    let page = h.feed.followed_feed(alice, PageRequest::first()).await.unwrap();
    assert_eq!(texts(&page), vec!["before"]);

    h.feed.unfollow_author(alice, "bob").await.unwrap();
    h.feed.publish_post(bob, NewPost::text("after")).await.unwrap();

    let page = h.feed.followed_feed(alice, PageRequest::first()).await.unwrap();
    assert!(!texts(&page).contains(&"after"));
}

#[tokio::test]
async fn deleting_an_author_removes_them_from_feeds() {
    let h = harness(FeedSettings::default()).await;
    let alice = viewer(&h, "alice").await;
    let bob = viewer(&h, "bob").await;

    h.feed.follow_author(alice, "bob").await.unwrap();
    h.feed.publish_post(bob, NewPost::text("bye")).await.unwrap();

    let bob_id = bob.user_id().unwrap();
    h.store.delete_user(bob_id).await.unwrap();

    let page = h.feed.followed_feed(alice, PageRequest::first()).await.unwrap();
    assert!(page.items.is_empty());
    assert!(h.graph.followed_authors(alice.user_id().unwrap()).await.unwrap().is_empty());
    assert_eq!(h.store.all_posts().await.unwrap().len(), 0);
}
