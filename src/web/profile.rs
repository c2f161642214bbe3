use std::sync::Arc;

use axum::{extract::*, response::Response};
use serde::Serialize;

use super::{common::*, Global, Viewer};
use crate::{
	db::PersistenceHandle,
	entity::user,
	feed::{load_feed, FeedSelection},
};


#[derive(Serialize)]
struct AuthorData {
	username: String,
	post_count: u64,
	follower_count: u64,
	following_count: u64,
}


async fn resolve_author(g: &Global, username: &str) -> Result<user::Model, Response> {
	match g.api.db.find_user(username).await {
		Ok(Some(author)) => Ok(author),
		Ok(None) => Err(not_found_error_response("Unknown user")),
		Err(e) => Err(server_error_response(e, "unable to load user")),
	}
}

pub async fn profile_page(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
	Path(username): Path<String>, Query(query): Query<PaginationQuery>,
) -> Response {
	let author = match resolve_author(&g, &username).await {
		Ok(author) => author,
		Err(e) => return e,
	};

	let page_number = query.page.unwrap_or(1);
	let page = match load_feed(&g.api.db, FeedSelection::Author(author.id), page_number).await {
		Ok(p) => p,
		Err(e) => return server_error_response(e, "unable to fetch profile feed"),
	};

	let post_count = match g.api.db.post_count(author.id).await {
		Ok(c) => c,
		Err(e) => return server_error_response(e, "unable to load profile counts"),
	};
	let follower_count = match g.api.db.follower_count(author.id).await {
		Ok(c) => c,
		Err(e) => return server_error_response(e, "unable to load profile counts"),
	};
	let following_count = match g.api.db.following_count(author.id).await {
		Ok(c) => c,
		Err(e) => return server_error_response(e, "unable to load profile counts"),
	};

	// Only show the follow/unfollow affordance to logged-in visitors that
	// aren't the author themselves.
	let (is_self, is_following) = match &viewer.0 {
		None => (false, false),
		Some(account) if account.id == author.id => (true, false),
		Some(account) => match g.api.is_following(account.id, author.id).await {
			Ok(f) => (false, f),
			Err(e) => return server_error_response(e, "unable to fetch follow status"),
		},
	};

	let mut context = viewer_context(&viewer);
	context.insert(
		"author",
		&AuthorData {
			username: author.username,
			post_count,
			follower_count,
			following_count,
		},
	);
	context.insert("is_self", &is_self);
	context.insert("is_following", &is_following);
	context.insert("page", &into_feed_page_display(page));
	context.insert("base_url", &format!("/{}", username));
	g.render("profile.html.tera", context).await
}

pub async fn follow(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
	Path(username): Path<String>,
) -> Response {
	let account = match require_login(&viewer, &format!("/{}/follow", username)) {
		Ok(account) => account,
		Err(e) => return e,
	};
	let author = match resolve_author(&g, &username).await {
		Ok(author) => author,
		Err(e) => return e,
	};

	match g.api.follow(account.id, author.id).await {
		Ok(_) => redirect_response(&format!("/{}", username)),
		Err(e) => server_error_response(e, "unable to follow this author"),
	}
}

pub async fn unfollow(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
	Path(username): Path<String>,
) -> Response {
	let account = match require_login(&viewer, &format!("/{}/unfollow", username)) {
		Ok(account) => account,
		Err(e) => return e,
	};
	let author = match resolve_author(&g, &username).await {
		Ok(author) => author,
		Err(e) => return e,
	};

	match g.api.unfollow(account.id, author.id).await {
		Ok(_) => redirect_response(&format!("/{}", username)),
		Err(e) => server_error_response(e, "unable to unfollow this author"),
	}
}
