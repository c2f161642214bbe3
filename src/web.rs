pub mod common;
mod group;
mod post;
mod profile;

use std::{
	net::*,
	sync::{atomic::*, Arc},
	time::Duration,
};

use ::serde::*;
use axum::{
	body::Body,
	extract::*,
	http::{header, HeaderMap},
	middleware::{from_fn_with_state, Next},
	response::Response,
	routing::get,
	Router,
};
#[cfg(debug_assertions)]
use rss::validation::Validate;
use rss::{ChannelBuilder, ItemBuilder};
use tera::{Context, Tera};
use tokio::time::sleep;
use tower_http::services::ServeDir;

use self::common::*;
use crate::{
	api::Api,
	cache::{CacheKey, RenderCache},
	config::Config,
	db::{self, PersistenceHandle},
	entity::user,
	feed::{load_feed, FeedSelection},
};


pub struct Global {
	pub config: Config,
	pub server_info: ServerInfo,
	pub api: Api,
	pub template_engine: Tera,
	pub render_cache: RenderCache,
}

#[derive(Clone, Serialize)]
pub struct ServerInfo {
	pub url_base: String,
}

/// The user behind the request's session cookie, if any. Inserted into the
/// request extensions by the session middleware.
#[derive(Clone)]
pub struct Viewer(pub Option<user::Model>);


impl Global {
	pub fn load(config: Config, api: Api, server_info: ServerInfo) -> tera::Result<Self> {
		let template_glob = match &config.template_dir {
			Some(dir) => format!("{}/**/*.tera", dir),
			None => "templates/**/*.tera".to_string(),
		};
		let template_engine = Tera::new(&template_glob)?;
		let render_cache = RenderCache::new(config.render_cache_size.unwrap_or(32));

		Ok(Self {
			config,
			server_info,
			api,
			template_engine,
			render_cache,
		})
	}

	pub async fn render(&self, template_name: &str, context: Context) -> Response {
		match self.render_html(template_name, context) {
			Err(e) => e,
			Ok(html) => html_response(html),
		}
	}

	pub fn render_html(&self, template_name: &str, context: Context) -> Result<String, Response> {
		let mut complete_context = Context::new();
		complete_context.insert("server", &self.server_info);
		complete_context.extend(context);

		self.template_engine
			.render(template_name, &complete_context)
			.map_err(|e| {
				server_error_response(
					e,
					&format!("Unable to render template \"{}\"", template_name),
				)
			})
	}
}

pub async fn serve(
	stop_flag: Arc<AtomicBool>, port: u16, api: Api, server_info: ServerInfo, config: Config,
) -> db::Result<()> {
	let global = Arc::new(
		Global::load(config, api, server_info).expect("unable to load the template engine"),
	);

	let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
	let app = router(global);

	let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			while !stop_flag.load(Ordering::Relaxed) {
				sleep(Duration::from_secs(1)).await;
			}
		})
		.await
		.unwrap();
	Ok(())
}

pub fn router(g: Arc<Global>) -> Router {
	let static_dir = g
		.config
		.static_dir
		.clone()
		.unwrap_or("static".to_string());

	// The static segments (group, follow, new, ...) take precedence over the
	// /:username capture.
	Router::new()
		.route("/", get(index))
		.route("/login", get(login).post(login_post))
		.route("/logout", get(logout))
		.route("/rss", get(rss_feed))
		.route("/new", get(post::new).post(post::new_post))
		.route("/follow", get(follow_index))
		.route("/about/author", get(about_author))
		.route("/about/tech", get(about_tech))
		.route("/image/:file_id", get(post::image))
		.nest("/group", group::router(g.clone()))
		.route("/:username", get(profile::profile_page))
		.route("/:username/follow", get(profile::follow))
		.route("/:username/unfollow", get(profile::unfollow))
		.route("/:username/:post_id", get(post::view))
		.route(
			"/:username/:post_id/edit",
			get(post::edit).post(post::edit_post),
		)
		.route(
			"/:username/:post_id/comment",
			axum::routing::post(post::comment),
		)
		.nest_service("/static", ServeDir::new(static_dir))
		.layer(DefaultBodyLimit::max(10_000_000))
		.layer(from_fn_with_state(g.clone(), session_middleware))
		.with_state(g)
}

async fn session_middleware(
	State(g): State<Arc<Global>>, mut request: Request, next: Next,
) -> Response {
	let viewer = match session_token(request.headers()) {
		None => None,
		Some(token) => match g.api.db.fetch_session_user(&token).await {
			Ok(account) => account,
			Err(e) => return server_error_response(e, "unable to load session"),
		},
	};
	request.extensions_mut().insert(Viewer(viewer));

	next.run(request).await
}

fn session_token(headers: &HeaderMap) -> Option<String> {
	let value = headers.get(header::COOKIE)?.to_str().ok()?;
	for pair in value.split(';') {
		let mut parts = pair.trim().splitn(2, '=');
		if parts.next() == Some("session") {
			return parts.next().map(|token| token.to_string());
		}
	}
	None
}

async fn index(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
	Query(query): Query<PaginationQuery>,
) -> Response {
	let page_number = query.page.unwrap_or(1);

	let key = CacheKey::new(FeedSelection::All.tag(), page_number);
	let feed_html = match g.render_cache.get(&key).await {
		Some(html) => html,
		None => {
			let page = match load_feed(&g.api.db, FeedSelection::All, page_number).await {
				Ok(p) => p,
				Err(e) => return server_error_response(e, "unable to fetch index feed"),
			};
			let html = match render_feed_fragment(&g, page, "/") {
				Ok(html) => html,
				Err(e) => return e,
			};
			g.render_cache.put(key, html.clone()).await;
			html
		}
	};

	let mut context = viewer_context(&viewer);
	context.insert("feed_html", &feed_html);
	g.render("home.html.tera", context).await
}

async fn follow_index(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
	Query(query): Query<PaginationQuery>,
) -> Response {
	let account = match require_login(&viewer, "/follow") {
		Ok(account) => account,
		Err(e) => return e,
	};
	let page_number = query.page.unwrap_or(1);

	let page = match load_feed(&g.api.db, FeedSelection::FollowedBy(account.id), page_number).await
	{
		Ok(p) => p,
		Err(e) => return server_error_response(e, "unable to fetch following feed"),
	};

	let mut context = viewer_context(&viewer);
	context.insert("page", &into_feed_page_display(page));
	context.insert("base_url", "/follow");
	g.render("follow.html.tera", context).await
}

#[derive(Default, Deserialize)]
struct LoginQuery {
	next: Option<String>,
}

#[derive(Deserialize)]
struct LoginForm {
	username: String,
	next: Option<String>,
}

async fn login(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
	Query(query): Query<LoginQuery>,
) -> Response {
	let mut context = viewer_context(&viewer);
	context.insert("next", &query.next.unwrap_or("/".to_string()));
	context.insert("error", &None::<String>);
	g.render("login.html.tera", context).await
}

async fn login_post(State(g): State<Arc<Global>>, Form(form): Form<LoginForm>) -> Response {
	let username = form.username.trim();
	let next = form.next.unwrap_or("/".to_string());
	if username.is_empty() {
		let mut context = Context::new();
		context.insert("viewer", &None::<ViewerData>);
		context.insert("next", &next);
		context.insert("error", "Please fill in a username.");
		return g.render("login.html.tera", context).await;
	}

	match g.api.login(username).await {
		Ok((_, token)) => Response::builder()
			.status(303)
			.header("Location", next)
			.header(
				"Set-Cookie",
				format!("session={}; Path=/; HttpOnly", token),
			)
			.body(Body::empty())
			.unwrap(),
		Err(e) => server_error_response(e, "unable to log in"),
	}
}

async fn logout(State(g): State<Arc<Global>>, headers: HeaderMap) -> Response {
	if let Some(token) = session_token(&headers) {
		if let Err(e) = g.api.logout(&token).await {
			return server_error_response(e, "unable to log out");
		}
	}

	Response::builder()
		.status(303)
		.header("Location", "/")
		.header("Set-Cookie", "session=; Path=/; Max-Age=0")
		.body(Body::empty())
		.unwrap()
}

async fn rss_feed(State(g): State<Arc<Global>>) -> Response {
	let page = match load_feed(&g.api.db, FeedSelection::All, 1).await {
		Ok(p) => p,
		Err(e) => return server_error_response(e, "unable to fetch index feed"),
	};

	let mut channel_builder = ChannelBuilder::default();
	channel_builder
		.title("Quilld RSS feed")
		.link(&g.server_info.url_base)
		.description("The newest posts on this Quilld instance.");

	// Prepare RSS feed items
	let mut items = Vec::with_capacity(page.posts.len());
	for post in page.posts {
		let item = ItemBuilder::default()
			.title(format!("Post by {}", &post.author_name))
			.link(format!(
				"{}/{}/{}",
				&g.server_info.url_base, &post.author_name, post.id
			))
			.description(post.text)
			.build();
		items.push(item);
	}
	channel_builder.items(items);
	let channel = channel_builder.build();

	#[cfg(debug_assertions)]
	channel.validate().expect("RSS feed validation error");

	Response::builder()
		.header("Content-Type", "application/rss+xml")
		.body(Body::from(channel.to_string()))
		.unwrap()
}

async fn about_author(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
) -> Response {
	g.render("about/author.html.tera", viewer_context(&viewer))
		.await
}

async fn about_tech(
	State(g): State<Arc<Global>>, Extension(viewer): Extension<Viewer>,
) -> Response {
	g.render("about/tech.html.tera", viewer_context(&viewer))
		.await
}
