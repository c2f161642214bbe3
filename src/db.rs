mod install;

use std::{
	path::PathBuf,
	time::{Duration, SystemTime, UNIX_EPOCH},
};

use ::serde::Serialize;
use async_trait::async_trait;
use sea_orm::{prelude::*, sea_query::*, *};
use thiserror::Error;

use crate::entity::{comment, file, follow, group, post, session, user};


const DATABASE_VERSION: (u8, u16, u16) = (0, 0, 0);

#[derive(Clone)]
pub struct Database {
	path: PathBuf,
	orm: DatabaseConnection,
}

pub struct Transaction(pub(crate) sea_orm::DatabaseTransaction);

#[derive(Debug, Error)]
pub enum Error {
	#[error("database error: {0}")]
	OrmError(#[from] sea_orm::DbErr),
	#[error("database file is of a newer version: {0}.{1}.{2}")]
	NewerDatabaseVersion(u8, u16, u16),
}

pub type Result<T> = std::result::Result<T, self::Error>;

/// The contents of one uploaded file, as it goes in and out of the database.
#[derive(Clone, Debug)]
pub struct FileData {
	pub mime_type: String,
	pub data: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct CommentInfo {
	pub id: i64,
	pub author_name: String,
	pub text: String,
	pub created: i64,
}

/// Returns the current time as a unix timestamp in milliseconds.
pub fn current_timestamp() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap()
		.as_millis() as i64
}


/// All queries are defined on this trait so that they can be run both on the
/// database handle itself and on an open transaction.
#[async_trait]
pub trait PersistenceHandle {
	type Inner: ConnectionTrait;

	fn inner(&self) -> &Self::Inner;


	async fn create_comment(
		&self, post_id: i64, author_id: i64, text: &str,
	) -> Result<comment::Model> {
		let record = comment::ActiveModel {
			post_id: Set(post_id),
			author_id: Set(author_id),
			text: Set(text.to_string()),
			created: Set(current_timestamp()),
			..Default::default()
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn create_file(&self, data: &FileData) -> Result<i64> {
		let record = file::ActiveModel {
			mime_type: Set(data.mime_type.clone()),
			data: Set(data.data.clone()),
			..Default::default()
		};
		let result = record.insert(self.inner()).await?;
		Ok(result.id)
	}

	async fn create_group(
		&self, title: &str, slug: &str, description: &str,
	) -> Result<group::Model> {
		let record = group::ActiveModel {
			title: Set(title.to_string()),
			slug: Set(slug.to_string()),
			description: Set(description.to_string()),
			..Default::default()
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn create_post(
		&self, author_id: i64, text: &str, group_id: Option<i64>, image_id: Option<i64>,
	) -> Result<post::Model> {
		let record = post::ActiveModel {
			text: Set(text.to_string()),
			pub_date: Set(current_timestamp()),
			author_id: Set(author_id),
			group_id: Set(group_id),
			image_id: Set(image_id),
			..Default::default()
		};
		Ok(record.insert(self.inner()).await?)
	}

	/// Looks up the user with the given name, creating it if it doesn't exist
	/// yet. The unique index on the username resolves a race between two
	/// concurrent calls for the same name.
	async fn create_user(&self, username: &str) -> Result<user::Model> {
		let record = user::ActiveModel {
			username: Set(username.to_string()),
			..Default::default()
		};
		user::Entity::insert(record)
			.on_conflict(
				OnConflict::column(user::Column::Username)
					.do_nothing()
					.to_owned(),
			)
			.exec_without_returning(self.inner())
			.await?;

		let result = self.find_user(username).await?;
		Ok(result.expect("user disappeared right after insertion"))
	}

	async fn delete_session(&self, token: &str) -> Result<()> {
		session::Entity::delete_by_id(token.to_string())
			.exec(self.inner())
			.await?;
		Ok(())
	}

	async fn fetch_file(&self, file_id: i64) -> Result<Option<FileData>> {
		let result = file::Entity::find_by_id(file_id).one(self.inner()).await?;
		Ok(result.map(|r| FileData {
			mime_type: r.mime_type,
			data: r.data,
		}))
	}

	async fn fetch_group(&self, group_id: i64) -> Result<Option<group::Model>> {
		Ok(group::Entity::find_by_id(group_id).one(self.inner()).await?)
	}

	/// Loads the comments of a post, oldest first, with their author names
	/// already resolved.
	async fn fetch_post_comments(&self, post_id: i64) -> Result<Vec<CommentInfo>> {
		let results = comment::Entity::find()
			.filter(comment::Column::PostId.eq(post_id))
			.order_by_asc(comment::Column::Created)
			.order_by_asc(comment::Column::Id)
			.find_also_related(user::Entity)
			.all(self.inner())
			.await?;
		Ok(results
			.into_iter()
			.map(|(record, author)| CommentInfo {
				id: record.id,
				author_name: author.map(|a| a.username).unwrap_or_default(),
				text: record.text,
				created: record.created,
			})
			.collect())
	}

	async fn fetch_session_user(&self, token: &str) -> Result<Option<user::Model>> {
		let result = session::Entity::find_by_id(token.to_string())
			.find_also_related(user::Entity)
			.one(self.inner())
			.await?;
		Ok(result.and_then(|(_, u)| u))
	}

	/// Loads a post of the given author, or None if the post doesn't exist or
	/// belongs to someone else.
	async fn fetch_user_post(
		&self, username: &str, post_id: i64,
	) -> Result<Option<(post::Model, user::Model)>> {
		let result = post::Entity::find_by_id(post_id)
			.find_also_related(user::Entity)
			.one(self.inner())
			.await?;
		Ok(match result {
			Some((record, Some(author))) if author.username == username =>
				Some((record, author)),
			_ => None,
		})
	}

	async fn find_group(&self, slug: &str) -> Result<Option<group::Model>> {
		Ok(group::Entity::find()
			.filter(group::Column::Slug.eq(slug))
			.one(self.inner())
			.await?)
	}

	async fn find_groups(&self) -> Result<Vec<group::Model>> {
		Ok(group::Entity::find()
			.order_by_asc(group::Column::Title)
			.all(self.inner())
			.await?)
	}

	async fn find_user(&self, username: &str) -> Result<Option<user::Model>> {
		Ok(user::Entity::find()
			.filter(user::Column::Username.eq(username))
			.one(self.inner())
			.await?)
	}

	/// Creates the follow edge user -> author. A no-op when the edge already
	/// exists, or when someone tries to follow themselves. The unique index
	/// on (user_id, author_id) suppresses the duplicate insert, so a race
	/// between two concurrent calls can't double-count the edge.
	async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
		if user_id == author_id {
			return Ok(false);
		}

		let record = follow::ActiveModel {
			user_id: Set(user_id),
			author_id: Set(author_id),
			..Default::default()
		};
		let inserted = follow::Entity::insert(record)
			.on_conflict(
				OnConflict::columns([follow::Column::UserId, follow::Column::AuthorId])
					.do_nothing()
					.to_owned(),
			)
			.exec_without_returning(self.inner())
			.await?;
		Ok(inserted > 0)
	}

	/// The ids of all authors the given user follows.
	async fn followed_authors(&self, user_id: i64) -> Result<Vec<i64>> {
		let results = follow::Entity::find()
			.filter(follow::Column::UserId.eq(user_id))
			.all(self.inner())
			.await?;
		Ok(results.into_iter().map(|edge| edge.author_id).collect())
	}

	async fn follower_count(&self, author_id: i64) -> Result<u64> {
		Ok(follow::Entity::find()
			.filter(follow::Column::AuthorId.eq(author_id))
			.count(self.inner())
			.await?)
	}

	async fn following_count(&self, user_id: i64) -> Result<u64> {
		Ok(follow::Entity::find()
			.filter(follow::Column::UserId.eq(user_id))
			.count(self.inner())
			.await?)
	}

	async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
		let count = follow::Entity::find()
			.filter(follow::Column::UserId.eq(user_id))
			.filter(follow::Column::AuthorId.eq(author_id))
			.count(self.inner())
			.await?;
		Ok(count > 0)
	}

	async fn post_count(&self, author_id: i64) -> Result<u64> {
		Ok(post::Entity::find()
			.filter(post::Column::AuthorId.eq(author_id))
			.count(self.inner())
			.await?)
	}

	async fn store_session(&self, token: &str, user_id: i64) -> Result<()> {
		let record = session::ActiveModel {
			token: Set(token.to_string()),
			user_id: Set(user_id),
			created: Set(current_timestamp()),
		};
		record.insert(self.inner()).await?;
		Ok(())
	}

	/// Removes the follow edge user -> author if it exists. Removing an
	/// absent edge is not an error.
	async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool> {
		let result = follow::Entity::delete_many()
			.filter(follow::Column::UserId.eq(user_id))
			.filter(follow::Column::AuthorId.eq(author_id))
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	/// Changes the mutable fields of a post. `image_id` being None means
	/// "keep the current image".
	async fn update_post(
		&self, post_id: i64, text: &str, group_id: Option<i64>, image_id: Option<i64>,
	) -> Result<()> {
		let mut record = post::ActiveModel {
			id: Unchanged(post_id),
			text: Set(text.to_string()),
			group_id: Set(group_id),
			..Default::default()
		};
		if image_id.is_some() {
			record.image_id = Set(image_id);
		}
		record.update(self.inner()).await?;
		Ok(())
	}
}

impl PersistenceHandle for Database {
	type Inner = DatabaseConnection;

	fn inner(&self) -> &Self::Inner { &self.orm }
}

impl PersistenceHandle for Transaction {
	type Inner = DatabaseTransaction;

	fn inner(&self) -> &Self::Inner { &self.0 }
}

impl Database {
	async fn install(orm: &DatabaseConnection) -> Result<()> {
		orm.execute_unprepared(install::QUERY).await?;
		Ok(())
	}

	fn is_outdated(major: u8, minor: u16, patch: u16) -> bool {
		(major, minor, patch) < DATABASE_VERSION
	}

	pub async fn load(path: PathBuf) -> Result<Self> {
		let mut opts = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
		opts.idle_timeout(Duration::from_secs(10));
		opts.acquire_timeout(Duration::from_secs(1));
		let orm = sea_orm::Database::connect(opts)
			.await
			.map_err(|e| self::Error::OrmError(e))?;

		// A fresh database file doesn't have the version table yet.
		let version_result = orm
			.query_one(Statement::from_string(
				DatabaseBackend::Sqlite,
				"SELECT major, minor, patch FROM version".to_owned(),
			))
			.await;
		match version_result {
			Ok(Some(row)) => {
				let major: i32 = row.try_get_by_index(0)?;
				let minor: i32 = row.try_get_by_index(1)?;
				let patch: i32 = row.try_get_by_index(2)?;
				if (major as u8, minor as u16, patch as u16) > DATABASE_VERSION {
					return Err(Error::NewerDatabaseVersion(
						major as u8,
						minor as u16,
						patch as u16,
					));
				}
				if Self::is_outdated(major as u8, minor as u16, patch as u16) {
					Self::upgrade(&orm);
				}
			}
			Ok(None) => Self::install(&orm).await?,
			Err(e) =>
				if e.to_string().contains("no such table") {
					Self::install(&orm).await?;
				} else {
					return Err(e.into());
				},
		}

		Ok(Self { path, orm })
	}

	pub fn path(&self) -> &PathBuf { &self.path }

	pub async fn transaction(&self) -> Result<Transaction> {
		let tx = self.orm.begin().await?;
		Ok(Transaction(tx))
	}

	fn upgrade(_orm: &DatabaseConnection) {
		panic!("No database upgrade implemented yet!");
	}
}

impl Transaction {
	pub async fn commit(self) -> Result<()> {
		self.0.commit().await?;
		Ok(())
	}
}
