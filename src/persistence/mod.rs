use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    core::Result,
    lexicon::Category,
    settings::CacheConfig,
};

const APP_NAME: &str = "zhquiz";

pub fn get_app_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        let app_dir = data_dir.join(APP_NAME);
        let _ = fs::create_dir_all(&app_dir);
        app_dir
    } else {
        PathBuf::from(".")
    }
}

pub fn get_data_file_path(filename: &str) -> PathBuf {
    get_app_data_dir().join(filename)
}

/// Where a category's cache snapshot lives. Relative dirs resolve under the app data dir.
pub fn snapshot_path(config: &CacheConfig, category: Category) -> PathBuf {
    let dir = Path::new(&config.snapshot_dir);
    let dir = if dir.is_absolute() { dir.to_path_buf() } else { get_app_data_dir().join(dir) };
    dir.join(format!("{}.bin", category))
}

pub fn save_json_to<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    log::info!("Data saved to: {}", path.display());
    Ok(())
}

pub fn load_json_from<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }

    let json = fs::read_to_string(path)?;
    let data: T = serde_json::from_str(&json)?;
    log::info!("Data loaded from: {}", path.display());
    Ok(data)
}

pub fn save_json<T: Serialize>(data: &T, filename: &str) -> Result<()> {
    save_json_to(data, &get_data_file_path(filename))
}

pub fn load_json<T: for<'de> Deserialize<'de> + Default>(filename: &str) -> Result<T> {
    load_json_from(&get_data_file_path(filename))
}
