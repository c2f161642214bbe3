use std::sync::Arc;

use axum::{extract::*, response::Response, routing::get, Router};
use serde::Serialize;

use super::{common::*, Global, Viewer};
use crate::{
	db::PersistenceHandle,
	feed::{load_feed, FeedSelection},
};


#[derive(Serialize)]
struct GroupData {
	title: String,
	slug: String,
	description: String,
}


pub fn router(_g: Arc<Global>) -> Router<Arc<Global>> {
	Router::new().route("/:slug", get(group_posts))
}

async fn group_posts(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
	Path(slug): Path<String>, Query(query): Query<PaginationQuery>,
) -> Response {
	let group = match g.api.db.find_group(&slug).await {
		Ok(Some(group)) => group,
		Ok(None) => return not_found_error_response("Unknown group"),
		Err(e) => return server_error_response(e, "unable to load group"),
	};

	let page_number = query.page.unwrap_or(1);
	let page = match load_feed(&g.api.db, FeedSelection::Group(group.id), page_number).await {
		Ok(p) => p,
		Err(e) => return server_error_response(e, "unable to fetch group feed"),
	};

	let mut context = viewer_context(&viewer);
	context.insert(
		"group",
		&GroupData {
			title: group.title,
			slug: group.slug.clone(),
			description: group.description,
		},
	);
	context.insert("page", &into_feed_page_display(page));
	context.insert("base_url", &format!("/group/{}", group.slug));
	g.render("group.html.tera", context).await
}
