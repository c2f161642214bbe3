use std::sync::Arc;

use log::*;
use sea_orm::{ActiveModelTrait, Set};
use tempfile::NamedTempFile;

use crate::{
	api::Api,
	config::Config,
	db::{Database, PersistenceHandle},
	entity::post,
	web::{Global, ServerInfo},
};


pub async fn load_database(filename: &str) -> Database {
	let temp_file = NamedTempFile::with_prefix(filename).unwrap();
	let db = Database::load(temp_file.path().to_owned())
		.await
		.expect("unable to load database");
	debug!("Loaded database at {}", temp_file.path().display());
	// Leak it on purpose so that the temp file may live until the end of all tests
	// FIXME: However, the OS will not clean it up after exit either...
	Box::into_raw(Box::new(temp_file));
	db
}

pub async fn load_test_api(filename: &str) -> Api {
	Api {
		db: load_database(filename).await,
	}
}

/// Sets up the full web state for handler-level tests. Relies on the
/// templates directory of the crate root being present.
pub async fn load_test_global(filename: &str) -> Arc<Global> {
	let api = load_test_api(filename).await;
	let server_info = ServerInfo {
		url_base: "http://localhost:8000".to_string(),
	};
	Arc::new(
		Global::load(Config::default(), api, server_info)
			.expect("unable to load template engine"),
	)
}

/// Inserts a post record directly, with an explicit publication date, so
/// that tests can control the feed order.
pub async fn insert_post_at(
	db: &Database, author_id: i64, text: &str, group_id: Option<i64>, pub_date: i64,
) -> post::Model {
	let record = post::ActiveModel {
		text: Set(text.to_string()),
		pub_date: Set(pub_date),
		author_id: Set(author_id),
		group_id: Set(group_id),
		image_id: Set(None),
		..Default::default()
	};
	record
		.insert(db.inner())
		.await
		.expect("unable to insert post")
}
