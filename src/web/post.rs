use std::sync::Arc;

use axum::{body::Body, extract::*, response::Response};
use chrono::*;
use log::*;
use ::serde::{Deserialize, Serialize};

use super::{common::*, Global, Viewer};
use crate::{
	db::{FileData, PersistenceHandle},
	entity::{post, user},
	feed::FeedGroupInfo,
};


#[derive(Serialize)]
struct PostPageData {
	id: i64,
	text: String,
	author_name: String,
	group: Option<FeedGroupInfo>,
	image_id: Option<i64>,
	created: String,
	time_ago: String,
}

#[derive(Serialize)]
struct GroupOption {
	id: i64,
	title: String,
}

#[derive(Deserialize)]
pub struct CommentForm {
	text: String,
}

#[derive(Serialize)]
struct CommentDisplay {
	author_name: String,
	text: String,
	created: String,
}

struct PostFormData {
	text: String,
	group_id: Option<i64>,
	image: Option<FileData>,
}


async fn into_post_page_data(
	g: &Global, record: post::Model, author: &user::Model,
) -> Result<PostPageData, Response> {
	let group = match record.group_id {
		None => None,
		Some(group_id) => match g.api.db.fetch_group(group_id).await {
			Ok(r) => r.map(|group| FeedGroupInfo {
				slug: group.slug,
				title: group.title,
			}),
			Err(e) => return Err(server_error_response(e, "unable to load group")),
		},
	};

	let created = Utc.timestamp_millis_opt(record.pub_date).unwrap();
	let time_ago = human_readable_duration(&Utc::now().signed_duration_since(created));
	Ok(PostPageData {
		id: record.id,
		text: record.text,
		author_name: author.username.clone(),
		group,
		image_id: record.image_id,
		created: format!("{}", created.format("%Y-%m-%d %H:%M:%S")),
		time_ago,
	})
}

/// Collects the fields of the post form. An image field without data or
/// content type is treated as "no image uploaded".
async fn collect_post_form(mut form: Multipart) -> PostFormData {
	let mut text = String::new();
	let mut group_id = None;
	let mut image = None;

	while let Some(field) = form.next_field().await.unwrap() {
		let name = field.name().unwrap().to_string();

		match name.as_str() {
			"text" => {
				let data = field.bytes().await.unwrap();
				text = String::from_utf8_lossy(&data).to_string();
			}
			"group" => {
				let data = field.bytes().await.unwrap();
				let value = String::from_utf8_lossy(&data).to_string();
				if !value.is_empty() {
					group_id = value.parse().ok();
				}
			}
			"image" =>
				if let Some(content_type) = field.content_type() {
					let mime_type = content_type.to_string();
					let data = field.bytes().await.unwrap();
					if data.len() == 0 {
						debug!("Ignoring empty image field.");
						continue;
					}
					image = Some(FileData {
						mime_type,
						data: data.to_vec(),
					});
				} else {
					warn!("Ignoring image due to missing content type.");
				},
			other => warn!("Unrecognized form field: {}", other),
		}
	}

	PostFormData {
		text,
		group_id,
		image,
	}
}

async fn render_post_form(
	g: &Global, viewer: &Viewer, is_edit: bool, current: Option<&PostFormData>,
	error: Option<&str>,
) -> Response {
	let groups: Vec<GroupOption> = match g.api.db.find_groups().await {
		Ok(r) => r
			.into_iter()
			.map(|group| GroupOption {
				id: group.id,
				title: group.title,
			})
			.collect(),
		Err(e) => return server_error_response(e, "unable to load groups"),
	};

	let mut context = viewer_context(viewer);
	context.insert("groups", &groups);
	context.insert("is_edit", &is_edit);
	context.insert("text", current.map(|form| form.text.as_str()).unwrap_or(""));
	// 0 is never a valid row id, so it doubles as "no group selected".
	context.insert(
		"group_id",
		&current.and_then(|form| form.group_id).unwrap_or(0),
	);
	context.insert("error", &error);
	g.render("new.html.tera", context).await
}

pub async fn new(State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>) -> Response {
	if let Err(e) = require_login(&viewer, "/new") {
		return e;
	}
	render_post_form(&g, &viewer, false, None, None).await
}

pub async fn new_post(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>, form: Multipart,
) -> Response {
	let account = match require_login(&viewer, "/new") {
		Ok(account) => account,
		Err(e) => return e,
	};

	let form_data = collect_post_form(form).await;
	if form_data.text.trim().is_empty() {
		return render_post_form(&g, &viewer, false, Some(&form_data), Some("Please write some text.")).await;
	}

	if let Err(e) = g
		.api
		.publish_post(
			account.id,
			&form_data.text,
			form_data.group_id,
			form_data.image.as_ref(),
		)
		.await
	{
		return server_error_response(e, "unable to publish post");
	}
	g.render_cache.invalidate().await;

	redirect_response("/")
}

pub async fn view(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
	Path((username, post_id)): Path<(String, i64)>,
) -> Response {
	let (record, author) = match g.api.db.fetch_user_post(&username, post_id).await {
		Ok(Some(r)) => r,
		Ok(None) => return not_found_error_response("Unknown post"),
		Err(e) => return server_error_response(e, "unable to load post"),
	};

	let comments: Vec<CommentDisplay> = match g.api.db.fetch_post_comments(record.id).await {
		Ok(r) => r
			.into_iter()
			.map(|comment| CommentDisplay {
				author_name: comment.author_name,
				text: comment.text,
				created: format!(
					"{}",
					Utc.timestamp_millis_opt(comment.created)
						.unwrap()
						.format("%Y-%m-%d %H:%M:%S")
				),
			})
			.collect(),
		Err(e) => return server_error_response(e, "unable to load comments"),
	};

	let is_author = viewer
		.0
		.as_ref()
		.map(|account| account.id == author.id)
		.unwrap_or(false);

	let post_data = match into_post_page_data(&g, record, &author).await {
		Ok(p) => p,
		Err(e) => return e,
	};

	let mut context = viewer_context(&viewer);
	context.insert("post", &post_data);
	context.insert("comments", &comments);
	context.insert("is_author", &is_author);
	g.render("post.html.tera", context).await
}

pub async fn edit(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
	Path((username, post_id)): Path<(String, i64)>,
) -> Response {
	let account = match require_login(&viewer, &format!("/{}/{}/edit", username, post_id)) {
		Ok(account) => account,
		Err(e) => return e,
	};
	let (record, author) = match g.api.db.fetch_user_post(&username, post_id).await {
		Ok(Some(r)) => r,
		Ok(None) => return not_found_error_response("Unknown post"),
		Err(e) => return server_error_response(e, "unable to load post"),
	};
	// Someone else's post can be looked at, not edited.
	if account.id != author.id {
		return redirect_response(&format!("/{}/{}", username, post_id));
	}

	let current = PostFormData {
		text: record.text,
		group_id: record.group_id,
		image: None,
	};
	render_post_form(&g, &viewer, true, Some(&current), None).await
}

pub async fn edit_post(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
	Path((username, post_id)): Path<(String, i64)>, form: Multipart,
) -> Response {
	let account = match require_login(&viewer, &format!("/{}/{}/edit", username, post_id)) {
		Ok(account) => account,
		Err(e) => return e,
	};
	let (record, author) = match g.api.db.fetch_user_post(&username, post_id).await {
		Ok(Some(r)) => r,
		Ok(None) => return not_found_error_response("Unknown post"),
		Err(e) => return server_error_response(e, "unable to load post"),
	};
	if account.id != author.id {
		return redirect_response(&format!("/{}/{}", username, post_id));
	}

	let form_data = collect_post_form(form).await;
	if form_data.text.trim().is_empty() {
		return render_post_form(&g, &viewer, true, Some(&form_data), Some("Please write some text.")).await;
	}

	if let Err(e) = g
		.api
		.update_post(
			record.id,
			&form_data.text,
			form_data.group_id,
			form_data.image.as_ref(),
		)
		.await
	{
		return server_error_response(e, "unable to update post");
	}
	g.render_cache.invalidate().await;

	redirect_response(&format!("/{}/{}", username, post_id))
}

pub async fn comment(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
	Path((username, post_id)): Path<(String, i64)>, Form(form): Form<CommentForm>,
) -> Response {
	let account = match require_login(&viewer, &format!("/{}/{}", username, post_id)) {
		Ok(account) => account,
		Err(e) => return e,
	};
	let (record, _) = match g.api.db.fetch_user_post(&username, post_id).await {
		Ok(Some(r)) => r,
		Ok(None) => return not_found_error_response("Unknown post"),
		Err(e) => return server_error_response(e, "unable to load post"),
	};

	if !form.text.trim().is_empty() {
		if let Err(e) = g.api.post_comment(record.id, account.id, &form.text).await {
			return server_error_response(e, "unable to post comment");
		}
		// The comment counts on the feed pages just went stale.
		g.render_cache.invalidate().await;
	}

	redirect_response(&format!("/{}/{}", username, post_id))
}

pub async fn image(State(g): State<Arc<Global>>, Path(file_id): Path<i64>) -> Response {
	match g.api.db.fetch_file(file_id).await {
		Ok(Some(file)) => Response::builder()
			.header("Content-Type", file.mime_type)
			.body(Body::from(file.data))
			.unwrap(),
		Ok(None) => not_found_error_response("Unknown image"),
		Err(e) => server_error_response(e, "unable to load image"),
	}
}
