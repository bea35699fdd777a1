use std::{env, net::SocketAddr, path::PathBuf};

use crate::{
    error::AppError,
    services::{
        storage::DEFAULT_STORAGE_KEY,
        time::{parse_tz, InputZone, TimeZones},
    },
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub export_dir: PathBuf,
    pub zones: TimeZones,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let data_dir = env::var("ITIN_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let storage_key =
            env::var("ITIN_STORAGE_KEY").unwrap_or_else(|_| DEFAULT_STORAGE_KEY.to_string());
        if storage_key.trim().is_empty() || storage_key.contains(['/', '\\']) {
            return Err(AppError::Config(format!(
                "invalid ITIN_STORAGE_KEY: {storage_key:?}"
            )));
        }

        let export_dir = env::var("ITIN_EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir());

        let mut zones = TimeZones::default();
        if let Ok(name) = env::var("ITIN_DISPLAY_TZ") {
            zones.display = parse_tz(&name)?;
        }
        if let Ok(name) = env::var("ITIN_INPUT_TZ") {
            zones.input = name.parse::<InputZone>()?;
        }

        Ok(Self {
            listen_addr,
            data_dir,
            storage_key,
            export_dir,
            zones,
        })
    }
}
