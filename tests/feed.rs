use quilld::{
	db::PersistenceHandle,
	feed::{load_feed, FeedSelection},
	test::*,
};


#[ctor::ctor]
fn initialize() { env_logger::init(); }

#[tokio::test]
async fn test_pagination_clamping() {
	let api = load_test_api("feed_pagination.sqlite").await;
	let alice = api.db.create_user("alice").await.unwrap();
	for i in 0..12i64 {
		insert_post_at(&api.db, alice.id, &format!("post {}", i), None, 1000 + i).await;
	}

	let page1 = load_feed(&api.db, FeedSelection::All, 1).await.unwrap();
	assert_eq!(page1.number, 1);
	assert_eq!(page1.total_pages, 2);
	assert_eq!(page1.posts.len(), 10);
	assert!(page1.has_next);
	assert!(!page1.has_previous);
	// Newest first; the first element of the page is index 0.
	assert_eq!(page1.posts[0].text, "post 11");
	assert_eq!(page1.posts[9].text, "post 2");

	let page2 = load_feed(&api.db, FeedSelection::All, 2).await.unwrap();
	assert_eq!(page2.posts.len(), 2);
	assert_eq!(page2.posts[0].text, "post 1");
	assert_eq!(page2.posts[1].text, "post 0");
	assert!(!page2.has_next);
	assert!(page2.has_previous);

	// Requesting a page beyond the last one returns the last page.
	let page3 = load_feed(&api.db, FeedSelection::All, 3).await.unwrap();
	assert_eq!(page3.number, 2);
	assert_eq!(
		page3.posts.iter().map(|p| p.id).collect::<Vec<_>>(),
		page2.posts.iter().map(|p| p.id).collect::<Vec<_>>()
	);

	// Page 0 clamps up to the first page.
	let page0 = load_feed(&api.db, FeedSelection::All, 0).await.unwrap();
	assert_eq!(page0.number, 1);
}

#[tokio::test]
async fn test_empty_feeds() {
	let api = load_test_api("feed_empty.sqlite").await;
	let alice = api.db.create_user("alice").await.unwrap();
	let group = api
		.create_group("Test group", "test-slug", "A group without posts")
		.await
		.unwrap();

	// A group without posts gives an empty page, not an error.
	let page = load_feed(&api.db, FeedSelection::Group(group.id), 1)
		.await
		.unwrap();
	assert!(page.posts.is_empty());
	assert_eq!(page.number, 1);
	assert_eq!(page.total_pages, 1);
	assert!(!page.has_next);
	assert!(!page.has_previous);

	// Same for a user that doesn't follow anyone.
	let page = load_feed(&api.db, FeedSelection::FollowedBy(alice.id), 1)
		.await
		.unwrap();
	assert!(page.posts.is_empty());
}

#[tokio::test]
async fn test_group_feed_filters() {
	let api = load_test_api("feed_group.sqlite").await;
	let alice = api.db.create_user("alice").await.unwrap();
	let group = api
		.create_group("Test group", "test-slug", "")
		.await
		.unwrap();
	let other = api
		.create_group("Other group", "other-slug", "")
		.await
		.unwrap();

	insert_post_at(&api.db, alice.id, "in the group", Some(group.id), 1000).await;
	insert_post_at(&api.db, alice.id, "in the other group", Some(other.id), 1001).await;
	insert_post_at(&api.db, alice.id, "ungrouped", None, 1002).await;

	let page = load_feed(&api.db, FeedSelection::Group(group.id), 1)
		.await
		.unwrap();
	assert_eq!(page.posts.len(), 1);
	assert_eq!(page.posts[0].text, "in the group");
	let tag = page.posts[0].group.as_ref().unwrap();
	assert_eq!(tag.slug, "test-slug");
	assert_eq!(tag.title, "Test group");
}

#[tokio::test]
async fn test_following_feed() {
	let api = load_test_api("feed_following.sqlite").await;
	let alice = api.db.create_user("alice").await.unwrap();
	let bob = api.db.create_user("bob").await.unwrap();
	let carol = api.db.create_user("carol").await.unwrap();
	let dave = api.db.create_user("dave").await.unwrap();

	insert_post_at(&api.db, bob.id, "bob 1", None, 1000).await;
	insert_post_at(&api.db, carol.id, "carol 1", None, 1001).await;
	insert_post_at(&api.db, bob.id, "bob 2", None, 1002).await;

	api.follow(alice.id, bob.id).await.unwrap();

	// Alice's feed holds exactly the posts of the authors she follows.
	let page = load_feed(&api.db, FeedSelection::FollowedBy(alice.id), 1)
		.await
		.unwrap();
	let texts: Vec<&str> = page.posts.iter().map(|p| p.text.as_str()).collect();
	assert_eq!(texts, vec!["bob 2", "bob 1"]);

	// An unrelated user sees nothing.
	let page = load_feed(&api.db, FeedSelection::FollowedBy(dave.id), 1)
		.await
		.unwrap();
	assert!(page.posts.is_empty());

	// Unfollowing empties the feed again.
	api.unfollow(alice.id, bob.id).await.unwrap();
	let page = load_feed(&api.db, FeedSelection::FollowedBy(alice.id), 1)
		.await
		.unwrap();
	assert!(page.posts.is_empty());
}

#[tokio::test]
async fn test_profile_feed() {
	let api = load_test_api("feed_profile.sqlite").await;
	let alice = api.db.create_user("alice").await.unwrap();
	let bob = api.db.create_user("bob").await.unwrap();

	insert_post_at(&api.db, alice.id, "by alice", None, 1000).await;
	insert_post_at(&api.db, bob.id, "by bob", None, 1001).await;

	let page = load_feed(&api.db, FeedSelection::Author(alice.id), 1)
		.await
		.unwrap();
	assert_eq!(page.posts.len(), 1);
	assert_eq!(page.posts[0].text, "by alice");
	assert_eq!(page.posts[0].author_name, "alice");
}

#[tokio::test]
async fn test_equal_timestamps_keep_a_stable_order() {
	let api = load_test_api("feed_tiebreak.sqlite").await;
	let alice = api.db.create_user("alice").await.unwrap();
	for i in 0..5i64 {
		insert_post_at(&api.db, alice.id, &format!("post {}", i), None, 1000).await;
	}

	let first = load_feed(&api.db, FeedSelection::All, 1).await.unwrap();
	let ids: Vec<i64> = first.posts.iter().map(|p| p.id).collect();
	// Ties on pub_date fall back to the row id, newest insertion first.
	let mut sorted = ids.clone();
	sorted.sort_by(|a, b| b.cmp(a));
	assert_eq!(ids, sorted);

	for _ in 0..3 {
		let again = load_feed(&api.db, FeedSelection::All, 1).await.unwrap();
		let again_ids: Vec<i64> = again.posts.iter().map(|p| p.id).collect();
		assert_eq!(ids, again_ids);
	}
}
