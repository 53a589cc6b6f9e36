//! Fixtures shared by the runner integration tests.

#![allow(dead_code)]

use dialeval_core::{Dataset, Model};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub const CONTEXTS: &str = "how are you\nwhat is your name\nwhere do you live\n";
pub const REFERENCES: &str = "i am fine thanks\nmy name is bob\ni live in paris\n";

/// A directory with one dataset `d` and helpers for writing model outputs.
pub struct Fixture {
    pub root: PathBuf,
}

impl Fixture {
    pub fn new(root: &Path) -> Self {
        let data = root.join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("contexts.txt"), CONTEXTS).unwrap();
        fs::write(data.join("references.txt"), REFERENCES).unwrap();
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn dataset(&self) -> Dataset {
        Dataset::new(
            "d",
            self.root.join("data/contexts.txt"),
            self.root.join("data/references.txt"),
        )
    }

    pub fn responses_path(&self, model: &str) -> PathBuf {
        self.root.join("results").join(model).join("responses.txt")
    }

    /// Write `contents` as `model`'s responses and return the model.
    pub fn model(&self, name: &str, contents: &str) -> Model {
        let path = self.responses_path(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        Model::new(name, "d", path)
    }

    /// A model whose responses file does not exist.
    pub fn missing_model(&self, name: &str) -> Model {
        Model::new(name, "d", self.responses_path(name))
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.join("out")
    }
}

/// Move a file's modification time `secs` seconds into the future.
pub fn touch_future(path: &Path, secs: u64) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(secs))
        .unwrap();
}

pub fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}
