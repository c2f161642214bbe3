pub const QUERY: &'static str = r#"
	BEGIN;

	CREATE TABLE version (
		major INTEGER NOT NULL,
		minor INTEGER NOT NULL,
		patch INTEGER NOT NULL
	);
	INSERT INTO version VALUES (0, 0, 0);

	CREATE TABLE user (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		username TEXT NOT NULL,
		UNIQUE(username)
	);

	CREATE TABLE session (
		token TEXT NOT NULL PRIMARY KEY,
		user_id INTEGER NOT NULL,
		created INTEGER NOT NULL,
		FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
	);

	CREATE TABLE "group" (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		title TEXT NOT NULL,
		slug TEXT NOT NULL,
		description TEXT NOT NULL,
		UNIQUE(slug)
	);

	CREATE TABLE file (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		mime_type TEXT NOT NULL,
		data BLOB NOT NULL
	);

	CREATE TABLE post (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		text TEXT NOT NULL,
		pub_date INTEGER NOT NULL,
		author_id INTEGER NOT NULL,
		group_id INTEGER,
		image_id INTEGER,
		FOREIGN KEY(author_id) REFERENCES user(id) ON DELETE CASCADE,
		FOREIGN KEY(group_id) REFERENCES "group"(id) ON DELETE SET NULL,
		FOREIGN KEY(image_id) REFERENCES file(id)
	);

	CREATE TABLE comment (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		post_id INTEGER NOT NULL,
		author_id INTEGER NOT NULL,
		text TEXT NOT NULL,
		created INTEGER NOT NULL,
		FOREIGN KEY(post_id) REFERENCES post(id) ON DELETE CASCADE,
		FOREIGN KEY(author_id) REFERENCES user(id) ON DELETE CASCADE
	);

	CREATE TABLE follow (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		user_id INTEGER NOT NULL,
		author_id INTEGER NOT NULL,
		UNIQUE(user_id, author_id),
		FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE,
		FOREIGN KEY(author_id) REFERENCES user(id) ON DELETE CASCADE
	);

	CREATE INDEX idx_post_pub_date ON post(pub_date);
	CREATE INDEX idx_post_author ON post(author_id);
	CREATE INDEX idx_post_group ON post(group_id);
	CREATE INDEX idx_comment_post ON comment(post_id);

	COMMIT;
"#;
