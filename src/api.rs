use log::*;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

use crate::{
	db::{self, Database, FileData, PersistenceHandle},
	entity::{comment, group, post, user},
};


/// The operations the web layer performs, glued together on top of the
/// database handle.
#[derive(Clone)]
pub struct Api {
	pub db: Database,
}

impl Api {
	pub async fn create_group(
		&self, title: &str, slug: &str, description: &str,
	) -> db::Result<group::Model> {
		self.db.create_group(title, slug, description).await
	}

	pub async fn follow(&self, user_id: i64, author_id: i64) -> db::Result<bool> {
		let created = self.db.follow(user_id, author_id).await?;
		if created {
			debug!("User {} now follows author {}.", user_id, author_id);
		}
		Ok(created)
	}

	pub async fn is_following(&self, user_id: i64, author_id: i64) -> db::Result<bool> {
		self.db.is_following(user_id, author_id).await
	}

	/// Logs the given username in, creating the user record on first use,
	/// and returns a fresh session token to hand to the browser.
	pub async fn login(&self, username: &str) -> db::Result<(user::Model, String)> {
		let account = self.db.create_user(username).await?;
		let token = generate_session_token();
		self.db.store_session(&token, account.id).await?;
		info!("User {} logged in.", account.username);
		Ok((account, token))
	}

	pub async fn logout(&self, token: &str) -> db::Result<()> {
		self.db.delete_session(token).await
	}

	pub async fn post_comment(
		&self, post_id: i64, author_id: i64, text: &str,
	) -> db::Result<comment::Model> {
		self.db.create_comment(post_id, author_id, text).await
	}

	/// Stores a new post, together with its image attachment if one was
	/// uploaded.
	pub async fn publish_post(
		&self, author_id: i64, text: &str, group_id: Option<i64>, image: Option<&FileData>,
	) -> db::Result<post::Model> {
		let tx = self.db.transaction().await?;
		let image_id = match image {
			Some(data) => Some(tx.create_file(data).await?),
			None => None,
		};
		let record = tx.create_post(author_id, text, group_id, image_id).await?;
		tx.commit().await?;
		Ok(record)
	}

	pub async fn unfollow(&self, user_id: i64, author_id: i64) -> db::Result<bool> {
		self.db.unfollow(user_id, author_id).await
	}

	/// Changes a post's text, group and (optionally) image. The author and
	/// publication date never change.
	pub async fn update_post(
		&self, post_id: i64, text: &str, group_id: Option<i64>, image: Option<&FileData>,
	) -> db::Result<()> {
		let tx = self.db.transaction().await?;
		let image_id = match image {
			Some(data) => Some(tx.create_file(data).await?),
			None => None,
		};
		tx.update_post(post_id, text, group_id, image_id).await?;
		tx.commit().await?;
		Ok(())
	}
}

fn generate_session_token() -> String {
	OsRng
		.sample_iter(&Alphanumeric)
		.take(32)
		.map(char::from)
		.collect()
}
