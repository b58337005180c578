// src/config.rs

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

// --- ViewerStyle ---

/// Fixed visual style handed to the viewer for every structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewerStyle {
  pub stick_radius: f64,
  pub sphere_scale: f64,
  pub cell_color: String,
}

impl Default for ViewerStyle {
  fn default() -> Self {
    Self {
      stick_radius: 0.2,
      sphere_scale: 0.3,
      cell_color: "black".to_string(),
    }
  }
}

// --- Main Config Struct ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
  /// CSS class marking structure containers
  pub container_class: String,
  pub json_attribute: String,
  pub loaded_attribute: String,
  pub default_height: String,

  /// Symbol written for sites without an element label
  pub placeholder_symbol: String,
  pub comment_line: String,

  /// Script candidates, tried in order
  pub library_sources: Vec<String>,
  /// File name whose presence means the library global exists
  pub library_marker: String,

  pub timeout_ms: u64,
  pub poll_interval_ms: u64,

  pub style: ViewerStyle,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      container_class: "structure-viewer".to_string(),
      json_attribute: "data-json".to_string(),
      loaded_attribute: "data-loaded".to_string(),
      default_height: "500px".to_string(),
      placeholder_symbol: "X".to_string(),
      comment_line: "structure".to_string(),
      library_sources: vec![
        "/js/3Dmol-min.js".to_string(),
        "https://3dmol.org/build/3Dmol-min.js".to_string(),
        "https://unpkg.com/3dmol/build/3Dmol-min.js".to_string(),
      ],
      library_marker: "3Dmol-min.js".to_string(),
      timeout_ms: 15_000,
      poll_interval_ms: 200,
      style: ViewerStyle::default(),
    }
  }
}

impl Config {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  /// Loads config from standard OS location (e.g., ~/.config/cview-embed/settings.json)
  pub fn load() -> (Self, String) {
    Self::load_from(&Self::get_path())
  }

  pub fn load_from(path: &Path) -> (Self, String) {
    if path.exists() {
      match File::open(path) {
        Ok(file) => {
          let reader = BufReader::new(file);
          match serde_json::from_reader(reader) {
            Ok(cfg) => (cfg, format!("Config loaded from {:?}", path)),
            Err(e) => (Self::default(), format!("Error parsing config: {}", e)),
          }
        }
        Err(e) => (Self::default(), format!("Error opening config: {}", e)),
      }
    } else {
      (
        Self::default(),
        "No config found. Using defaults.".to_string(),
      )
    }
  }

  /// Saves config to standard OS location
  pub fn save(&self) -> String {
    self.save_to(&Self::get_path())
  }

  pub fn save_to(&self, path: &Path) -> String {
    if let Some(parent) = path.parent() {
      let _ = fs::create_dir_all(parent);
    }

    match File::create(path) {
      Ok(file) => {
        let writer = BufWriter::new(file);
        match serde_json::to_writer_pretty(writer, self) {
          Ok(_) => format!("Config saved to {:?}", path),
          Err(e) => format!("Failed to save config: {}", e),
        }
      }
      Err(e) => format!("Could not create config file: {}", e),
    }
  }

  pub fn get_path() -> PathBuf {
    if let Some(proj) = ProjectDirs::from("org", "mavensgroup", "cview-embed") {
      proj.config_dir().join("settings.json")
    } else {
      PathBuf::from("settings.json")
    }
  }
}
