use std::{
	env, fmt,
	fs::File,
	io::{self, prelude::*},
	path::{Path, PathBuf},
	process,
	str::FromStr,
	sync::{atomic::AtomicBool, Arc},
};

use log::*;
use quilld::{
	api::Api,
	config::{self, Config},
	db::Database,
	web,
};
use signal_hook::flag;


fn config_path() -> PathBuf {
	if let Some(path) = env::var_os("QUILLD_CONFIG") {
		return PathBuf::from(path);
	}
	#[cfg(target_family = "unix")]
	{
		let user_path = PathBuf::from_str(config::CONFIG_FILE_USER_PATH).unwrap();
		if user_path.exists() {
			return user_path;
		}
	}
	PathBuf::from_str(config::CONFIG_FILE_PATH).unwrap()
}

fn initialize_logging() {
	let result = env::var_os("SYSTEM_LOG_FILE").map(|os| PathBuf::from(os));

	if let Some(filename) = result {
		simple_logging::log_to_file(filename, LevelFilter::Debug)
			.expect("unable to initialize logger")
	} else {
		env_logger::init()
	}
}

fn load_config<P>(path: P) -> Option<Config>
where
	P: AsRef<Path> + fmt::Debug,
{
	let mut file = match File::open(&path) {
		Err(e) => match e.kind() {
			io::ErrorKind::NotFound => {
				warn!(
					"Config file {:?} not found, using default configuration.",
					path
				);
				return None;
			}
			_ => {
				error!("Unable to open config file {:?}: {}", path, e);
				process::exit(1)
			}
		},
		Ok(f) => f,
	};

	let mut content = String::new();
	if let Err(e) = file.read_to_string(&mut content) {
		error!("Unable to read config file {:?}: {}", path, e);
		process::exit(1)
	}

	match toml::from_str(&content) {
		Err(e) => {
			error!("Unable to parse config file {:?}: {}", path, e);
			process::exit(1)
		}
		Ok(c) => Some(c),
	}
}

#[tokio::main]
async fn main() {
	initialize_logging();

	let config = load_config(config_path()).unwrap_or_default();
	let _ = config::CONFIG.set(config.clone());

	let stop_flag = Arc::new(AtomicBool::new(false));
	flag::register(signal_hook::consts::SIGINT, stop_flag.clone())
		.expect("unable to register SIGINT handler");
	flag::register(signal_hook::consts::SIGTERM, stop_flag.clone())
		.expect("unable to register SIGTERM handler");

	let database_path = if config.database_path.is_empty() {
		PathBuf::from("quilld.sqlite")
	} else {
		PathBuf::from(&config.database_path)
	};
	let db = match Database::load(database_path).await {
		Ok(db) => db,
		Err(e) => {
			error!("Unable to load database: {}", e);
			process::exit(1)
		}
	};
	let api = Api { db };

	let port = config.web_port.unwrap_or(8000);
	let server_info = web::ServerInfo {
		url_base: config
			.url_base
			.clone()
			.unwrap_or(format!("http://localhost:{}", port)),
	};

	info!("Serving the web interface on port {}...", port);
	if let Err(e) = web::serve(stop_flag, port, api, server_info, config).await {
		error!("Unable to serve the web interface: {}", e);
		process::exit(1)
	}
	info!("Exited.");
}
