//! The feed builder: one paginated query interface over the different ways
//! of selecting posts.
use std::collections::HashMap;

use ::serde::Serialize;
use sea_orm::{prelude::*, sea_query::*, *};

use crate::{
	db::{self, PersistenceHandle},
	entity::{comment, follow, group, post, user},
};


pub const POSTS_PER_PAGE: u64 = 10;

/// The selection predicate of a feed. Group & author selections take the
/// resolved id; resolving a slug or username (and 404'ing on an unknown one)
/// is the caller's job.
#[derive(Clone, Copy, Debug)]
pub enum FeedSelection {
	All,
	Group(i64),
	Author(i64),
	/// Posts of all authors that the given user follows.
	FollowedBy(i64),
}

#[derive(Debug, Serialize)]
pub struct FeedGroupInfo {
	pub slug: String,
	pub title: String,
}

#[derive(Debug, Serialize)]
pub struct PostInfo {
	pub id: i64,
	pub text: String,
	pub pub_date: i64,
	pub author_name: String,
	pub group: Option<FeedGroupInfo>,
	pub image_id: Option<i64>,
	pub comment_count: i64,
}

/// One page of a feed. Page numbers are 1-based; posts within the page are
/// simply 0-indexed vector elements, newest first.
#[derive(Debug, Serialize)]
pub struct FeedPage {
	pub posts: Vec<PostInfo>,
	pub number: u64,
	pub total_pages: u64,
	pub has_next: bool,
	pub has_previous: bool,
}


impl FeedSelection {
	fn query(&self) -> Select<post::Entity> {
		let query = post::Entity::find();
		match self {
			Self::All => query,
			Self::Group(group_id) => query.filter(post::Column::GroupId.eq(*group_id)),
			Self::Author(author_id) => query.filter(post::Column::AuthorId.eq(*author_id)),
			Self::FollowedBy(user_id) => query.filter(
				post::Column::AuthorId.in_subquery(
					Query::select()
						.column(follow::Column::AuthorId)
						.from(Alias::new(follow::Entity::default().table_name()))
						.and_where(follow::Column::UserId.eq(*user_id))
						.take(),
				),
			),
		}
	}

	/// A short tag identifying the feed mode, used in render cache keys.
	pub fn tag(&self) -> String {
		match self {
			Self::All => "all".to_string(),
			Self::Group(group_id) => format!("group-{}", group_id),
			Self::Author(author_id) => format!("author-{}", author_id),
			Self::FollowedBy(user_id) => format!("following-{}", user_id),
		}
	}
}

/// Loads one page of the feed described by `selection`.
///
/// The requested page number is clamped into the valid range, so asking for
/// a page beyond the last one returns the last page rather than an empty
/// result. An empty feed yields one empty page. Ordering is newest-first on
/// `pub_date`, tie-broken on the row id so that repeated calls on unmodified
/// data return the same pages.
pub async fn load_feed<P>(
	handle: &P, selection: FeedSelection, page_number: u64,
) -> db::Result<FeedPage>
where
	P: PersistenceHandle + Sync,
{
	let post_count = selection.query().count(handle.inner()).await?;
	let total_pages = std::cmp::max(1, (post_count + POSTS_PER_PAGE - 1) / POSTS_PER_PAGE);
	let number = page_number.max(1).min(total_pages);

	let records = selection
		.query()
		.order_by_desc(post::Column::PubDate)
		.order_by_desc(post::Column::Id)
		.offset((number - 1) * POSTS_PER_PAGE)
		.limit(POSTS_PER_PAGE)
		.all(handle.inner())
		.await?;

	let posts = if records.is_empty() {
		Vec::new()
	} else {
		enrich_posts(handle, records).await?
	};

	Ok(FeedPage {
		posts,
		number,
		total_pages,
		has_next: number < total_pages,
		has_previous: number > 1,
	})
}

/// Resolves author names, group tags & comment counts for a page worth of
/// post records.
async fn enrich_posts<P>(handle: &P, records: Vec<post::Model>) -> db::Result<Vec<PostInfo>>
where
	P: PersistenceHandle + Sync,
{
	let author_ids: Vec<i64> = records.iter().map(|record| record.author_id).collect();
	let authors: HashMap<i64, String> = user::Entity::find()
		.filter(user::Column::Id.is_in(author_ids))
		.all(handle.inner())
		.await?
		.into_iter()
		.map(|author| (author.id, author.username))
		.collect();

	let group_ids: Vec<i64> = records.iter().filter_map(|record| record.group_id).collect();
	let groups: HashMap<i64, (String, String)> = if group_ids.is_empty() {
		HashMap::new()
	} else {
		group::Entity::find()
			.filter(group::Column::Id.is_in(group_ids))
			.all(handle.inner())
			.await?
			.into_iter()
			.map(|g| (g.id, (g.slug, g.title)))
			.collect()
	};

	let post_ids: Vec<i64> = records.iter().map(|record| record.id).collect();
	let comment_counts: HashMap<i64, i64> = comment::Entity::find()
		.select_only()
		.column(comment::Column::PostId)
		.column_as(comment::Column::Id.count(), "count")
		.filter(comment::Column::PostId.is_in(post_ids))
		.group_by(comment::Column::PostId)
		.into_tuple::<(i64, i64)>()
		.all(handle.inner())
		.await?
		.into_iter()
		.collect();

	Ok(records
		.into_iter()
		.map(|record| PostInfo {
			id: record.id,
			text: record.text,
			pub_date: record.pub_date,
			author_name: authors
				.get(&record.author_id)
				.cloned()
				.unwrap_or_default(),
			group: record.group_id.and_then(|group_id| {
				groups.get(&group_id).map(|(slug, title)| FeedGroupInfo {
					slug: slug.clone(),
					title: title.clone(),
				})
			}),
			image_id: record.image_id,
			comment_count: comment_counts.get(&record.id).copied().unwrap_or(0),
		})
		.collect())
}
