use axum::{
	body::Body,
	http::{Request, StatusCode},
	Router,
};
use quilld::{db::PersistenceHandle, test::*, web};
use tower::ServiceExt;


#[ctor::ctor]
fn initialize() { env_logger::init(); }

async fn get(app: &Router, uri: &str, session: Option<&str>) -> axum::response::Response {
	let mut builder = Request::builder().uri(uri);
	if let Some(token) = session {
		builder = builder.header("Cookie", format!("session={}", token));
	}
	app.clone()
		.oneshot(builder.body(Body::empty()).unwrap())
		.await
		.unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
	response
		.headers()
		.get("Location")
		.expect("missing Location header")
		.to_str()
		.unwrap()
}

#[tokio::test]
async fn test_group_page() {
	let g = load_test_global("web_group.sqlite").await;
	let app = web::router(g.clone());
	let alice = g.api.db.create_user("alice").await.unwrap();
	let group = g
		.api
		.create_group("Test group", "test-slug", "A group for testing")
		.await
		.unwrap();
	insert_post_at(&g.api.db, alice.id, "hello group", Some(group.id), 1000).await;
	insert_post_at(&g.api.db, alice.id, "not in the group", None, 1001).await;

	let response = get(&app, "/group/test-slug", None).await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_string(response).await;
	assert!(body.contains("hello group"));
	assert!(!body.contains("not in the group"));

	let response = get(&app, "/group/other-slug", None).await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_profile() {
	let g = load_test_global("web_profile_404.sqlite").await;
	let app = web::router(g);

	let response = get(&app, "/nobody", None).await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_follow_page_requires_login() {
	let g = load_test_global("web_follow_login.sqlite").await;
	let app = web::router(g);

	let response = get(&app, "/follow", None).await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), "/login?next=/follow");
}

#[tokio::test]
async fn test_follow_flow() {
	let g = load_test_global("web_follow_flow.sqlite").await;
	let app = web::router(g.clone());
	let bob = g.api.db.create_user("bob").await.unwrap();
	insert_post_at(&g.api.db, bob.id, "a post by bob", None, 1000).await;
	let (alice, token) = g.api.login("alice").await.unwrap();

	// Before following, alice's feed is empty.
	let response = get(&app, "/follow", Some(&token)).await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_string(response).await;
	assert!(body.contains("No posts here yet."));

	let response = get(&app, "/bob/follow", Some(&token)).await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), "/bob");
	assert!(g.api.is_following(alice.id, bob.id).await.unwrap());

	let response = get(&app, "/follow", Some(&token)).await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_string(response).await;
	assert!(body.contains("a post by bob"));

	let response = get(&app, "/bob/unfollow", Some(&token)).await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert!(!g.api.is_following(alice.id, bob.id).await.unwrap());
}

#[tokio::test]
async fn test_post_page() {
	let g = load_test_global("web_post.sqlite").await;
	let app = web::router(g.clone());
	let bob = g.api.db.create_user("bob").await.unwrap();
	let record = insert_post_at(&g.api.db, bob.id, "a readable post", None, 1000).await;

	let response = get(&app, &format!("/bob/{}", record.id), None).await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_string(response).await;
	assert!(body.contains("a readable post"));

	let response = get(&app, "/bob/999", None).await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_author_cannot_edit() {
	let g = load_test_global("web_edit.sqlite").await;
	let app = web::router(g.clone());
	let bob = g.api.db.create_user("bob").await.unwrap();
	let record = insert_post_at(&g.api.db, bob.id, "bob's post", None, 1000).await;
	let (_, token) = g.api.login("alice").await.unwrap();

	// Someone else's post can be looked at, not edited.
	let response = get(&app, &format!("/bob/{}/edit", record.id), Some(&token)).await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), format!("/bob/{}", record.id));

	let (_, bob_token) = g.api.login("bob").await.unwrap();
	let response = get(&app, &format!("/bob/{}/edit", record.id), Some(&bob_token)).await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_string(response).await;
	assert!(body.contains("bob&#x27;s post") || body.contains("bob's post"));
}

#[tokio::test]
async fn test_index_pagination_links() {
	let g = load_test_global("web_index.sqlite").await;
	let app = web::router(g.clone());
	let alice = g.api.db.create_user("alice").await.unwrap();
	for i in 0..12i64 {
		insert_post_at(&g.api.db, alice.id, &format!("post number {}", i), None, 1000 + i).await;
	}

	let response = get(&app, "/", None).await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_string(response).await;
	assert!(body.contains("post number 11"));
	assert!(!body.contains("post number 0</p>"));
	assert!(body.contains("?page=2"));

	let response = get(&app, "/?page=2", None).await;
	let body = body_string(response).await;
	assert!(body.contains("post number 0"));
	assert!(body.contains("Page 2 of 2"));
}

#[tokio::test]
async fn test_login_and_logout() {
	let g = load_test_global("web_login.sqlite").await;
	let app = web::router(g.clone());

	let response = app
		.clone()
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/login")
				.header("Content-Type", "application/x-www-form-urlencoded")
				.body(Body::from("username=alice&next=/follow"))
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), "/follow");
	let cookie = response
		.headers()
		.get("Set-Cookie")
		.unwrap()
		.to_str()
		.unwrap()
		.to_string();
	assert!(cookie.starts_with("session="));
	let token = cookie
		.trim_start_matches("session=")
		.split(';')
		.next()
		.unwrap()
		.to_string();

	// The session cookie authenticates subsequent requests.
	let response = get(&app, "/follow", Some(&token)).await;
	assert_eq!(response.status(), StatusCode::OK);

	let response = get(&app, "/logout", Some(&token)).await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	let response = get(&app, "/follow", Some(&token)).await;
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), "/login?next=/follow");
}

#[tokio::test]
async fn test_rss_feed() {
	let g = load_test_global("web_rss.sqlite").await;
	let app = web::router(g.clone());
	let alice = g.api.db.create_user("alice").await.unwrap();
	insert_post_at(&g.api.db, alice.id, "syndicated post", None, 1000).await;

	let response = get(&app, "/rss", None).await;
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		response.headers().get("Content-Type").unwrap(),
		"application/rss+xml"
	);
	let body = body_string(response).await;
	assert!(body.contains("syndicated post"));
	assert!(body.contains("Post by alice"));
}
