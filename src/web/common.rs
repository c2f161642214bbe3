use std::fmt::{Debug, Display};

use ::serde::{Deserialize, Serialize};
use axum::{body::Body, response::Response};
use chrono::*;
use log::*;

use super::{Global, Viewer};
use crate::{
	entity::user,
	feed::{FeedGroupInfo, FeedPage, PostInfo},
};


#[derive(Default, Deserialize)]
pub struct PaginationQuery {
	pub page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PostDisplayInfo {
	pub id: i64,
	pub text: String,
	pub author_name: String,
	pub group: Option<FeedGroupInfo>,
	pub image_id: Option<i64>,
	pub comment_count: i64,
	pub created: String,
	pub time_ago: String,
}

#[derive(Debug, Serialize)]
pub struct FeedPageDisplay {
	pub posts: Vec<PostDisplayInfo>,
	pub number: u64,
	pub total_pages: u64,
	pub has_next: bool,
	pub has_previous: bool,
}

#[derive(Serialize)]
pub struct ViewerData {
	pub username: String,
}


pub fn into_post_display_info(post: PostInfo) -> PostDisplayInfo {
	let created = Utc.timestamp_millis_opt(post.pub_date).unwrap();
	let time_ago = human_readable_duration(&Utc::now().signed_duration_since(created));

	PostDisplayInfo {
		id: post.id,
		text: post.text,
		author_name: post.author_name,
		group: post.group,
		image_id: post.image_id,
		comment_count: post.comment_count,
		created: format!("{}", created.format("%Y-%m-%d %H:%M:%S")),
		time_ago,
	}
}

pub fn into_feed_page_display(page: FeedPage) -> FeedPageDisplay {
	FeedPageDisplay {
		posts: page
			.posts
			.into_iter()
			.map(into_post_display_info)
			.collect(),
		number: page.number,
		total_pages: page.total_pages,
		has_next: page.has_next,
		has_previous: page.has_previous,
	}
}

/// Renders the post-list fragment of a feed page to a string, so that the
/// index page can keep it in the render cache.
pub fn render_feed_fragment(
	g: &Global, page: FeedPage, base_url: &str,
) -> Result<String, Response> {
	let mut context = tera::Context::new();
	context.insert("page", &into_feed_page_display(page));
	context.insert("base_url", base_url);
	g.render_html("parts/feed.html.tera", context)
}

pub fn human_readable_duration(duration: &Duration) -> String {
	if duration.num_weeks() > 0 {
		let weeks = duration.num_weeks();
		if weeks > 1 {
			weeks.to_string() + " weeks"
		} else {
			weeks.to_string() + " week"
		}
	} else if duration.num_days() > 0 {
		let days = duration.num_days();
		if days > 1 {
			days.to_string() + " days"
		} else {
			days.to_string() + " day"
		}
	} else if duration.num_hours() > 0 {
		let hours = duration.num_hours();
		if hours > 1 {
			hours.to_string() + " hours"
		} else {
			hours.to_string() + " hour"
		}
	} else if duration.num_minutes() > 0 {
		let minutes = duration.num_minutes();
		if minutes > 1 {
			minutes.to_string() + " minutes"
		} else {
			minutes.to_string() + " minute"
		}
	} else {
		let seconds = duration.num_seconds();
		if seconds == 1 {
			seconds.to_string() + " second"
		} else {
			seconds.to_string() + " seconds"
		}
	}
}

/// Builds a template context that already carries the viewer information
/// every page shows in its header.
pub fn viewer_context(viewer: &Viewer) -> tera::Context {
	let mut context = tera::Context::new();
	context.insert(
		"viewer",
		&viewer.0.as_ref().map(|account| ViewerData {
			username: account.username.clone(),
		}),
	);
	context
}

/// Gives the logged-in user, or the redirect to the login page that sends
/// them back to `next` afterwards.
pub fn require_login<'a>(viewer: &'a Viewer, next: &str) -> Result<&'a user::Model, Response> {
	match &viewer.0 {
		Some(account) => Ok(account),
		None => Err(redirect_response(&format!("/login?next={}", next))),
	}
}

pub fn html_response(html: String) -> Response {
	Response::builder()
		.header("Content-Type", "text/html")
		.body(Body::from(html))
		.unwrap()
}

pub fn redirect_response(location: &str) -> Response {
	Response::builder()
		.status(303)
		.header("Location", location)
		.body(Body::empty())
		.unwrap()
}

pub fn error_response<S>(status_code: u16, message: S) -> Response
where
	S: Into<String>,
{
	let string: String = message.into();
	if status_code >= 400 {
		warn!("HTTP {} error: {}", status_code, &string);
	}
	Response::builder()
		.status(status_code)
		.header("Content-Type", "text/plain")
		.body(Body::from(string))
		.unwrap()
}

pub fn not_found_error_response(message: &str) -> Response { error_response(404, message) }

pub fn server_error_response<E>(e: E, message: &str) -> Response
where
	E: Debug + Display,
{
	error!("{}: {:?}", message, e);
	error_response(500, format!("{}: {}", message, e))
}
