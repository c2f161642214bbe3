use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use serde::*;


/// The file path of the configuration file
#[cfg(target_family = "unix")]
pub const CONFIG_FILE_PATH: &str = "/etc/quilld/config.toml";
#[cfg(target_family = "unix")]
pub const CONFIG_FILE_USER_PATH: &str = "config.toml";
#[cfg(target_family = "windows")]
pub const CONFIG_FILE_PATH: &str = "C:\\Program Files\\quilld\\config.toml";

#[derive(Clone, Deserialize)]
pub struct Config {
	pub database_path: String,

	pub web_port: Option<u16>,
	pub url_base: Option<String>,
	pub template_dir: Option<String>,
	pub static_dir: Option<String>,
	pub render_cache_size: Option<usize>,
}


impl Default for Config {
	fn default() -> Self {
		Self {
			database_path: String::default(),
			web_port: None,
			url_base: None,
			template_dir: None,
			static_dir: None,
			render_cache_size: None,
		}
	}
}


lazy_static! {
	pub static ref CONFIG: OnceCell<Config> = OnceCell::new();
}
