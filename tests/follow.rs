use quilld::{db::PersistenceHandle, test::*};


#[ctor::ctor]
fn initialize() { env_logger::init(); }

#[tokio::test]
async fn test_follow_is_idempotent() {
	let api = load_test_api("follow_idempotent.sqlite").await;
	let alice = api.db.create_user("alice").await.unwrap();
	let bob = api.db.create_user("bob").await.unwrap();

	assert!(api.follow(alice.id, bob.id).await.unwrap());
	// The second call hits the unique index and changes nothing.
	assert!(!api.follow(alice.id, bob.id).await.unwrap());

	assert_eq!(api.db.follower_count(bob.id).await.unwrap(), 1);
	assert!(api.is_following(alice.id, bob.id).await.unwrap());
}

#[tokio::test]
async fn test_unfollow_is_idempotent() {
	let api = load_test_api("follow_unfollow.sqlite").await;
	let alice = api.db.create_user("alice").await.unwrap();
	let bob = api.db.create_user("bob").await.unwrap();

	// Unfollowing without a prior follow changes nothing.
	assert!(!api.unfollow(alice.id, bob.id).await.unwrap());
	assert_eq!(api.db.follower_count(bob.id).await.unwrap(), 0);

	assert!(api.follow(alice.id, bob.id).await.unwrap());
	assert!(api.unfollow(alice.id, bob.id).await.unwrap());
	assert!(!api.unfollow(alice.id, bob.id).await.unwrap());

	assert_eq!(api.db.follower_count(bob.id).await.unwrap(), 0);
	assert!(!api.is_following(alice.id, bob.id).await.unwrap());
}

#[tokio::test]
async fn test_self_follow_is_refused() {
	let api = load_test_api("follow_self.sqlite").await;
	let alice = api.db.create_user("alice").await.unwrap();

	assert!(!api.follow(alice.id, alice.id).await.unwrap());
	assert_eq!(api.db.follower_count(alice.id).await.unwrap(), 0);
	assert_eq!(api.db.following_count(alice.id).await.unwrap(), 0);
	assert!(!api.is_following(alice.id, alice.id).await.unwrap());
}

#[tokio::test]
async fn test_followed_authors() {
	let api = load_test_api("follow_authors.sqlite").await;
	let alice = api.db.create_user("alice").await.unwrap();
	let bob = api.db.create_user("bob").await.unwrap();
	let carol = api.db.create_user("carol").await.unwrap();

	api.follow(alice.id, bob.id).await.unwrap();
	api.follow(alice.id, carol.id).await.unwrap();

	let mut authors = api.db.followed_authors(alice.id).await.unwrap();
	authors.sort();
	let mut expected = vec![bob.id, carol.id];
	expected.sort();
	assert_eq!(authors, expected);

	assert_eq!(api.db.following_count(alice.id).await.unwrap(), 2);
	assert_eq!(api.db.follower_count(bob.id).await.unwrap(), 1);
	// The edges point one way only.
	assert!(!api.is_following(bob.id, alice.id).await.unwrap());
}
