/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Source loading behind a trait so tests can assemble from an in-memory
//! string without touching disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

pub trait FileReader {
    fn read_to_string(&self, path: &Path) -> Result<String>;
}

pub struct AsmFileReader;

impl FileReader for AsmFileReader {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }
}

#[derive(Default)]
pub struct MockFileReader {
    files: HashMap<PathBuf, String>,
}

impl MockFileReader {
    pub fn add_file(&mut self, path: &str, content: &str) {
        self.files.insert(PathBuf::from(path), content.to_string());
    }
}

impl FileReader for MockFileReader {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files.get(path).cloned().ok_or_else(|| anyhow::anyhow!("mock file not found: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_reader_serves_registered_files() {
        let mut reader = MockFileReader::default();
        reader.add_file("prog.asm", "CODE\nHALT\n");
        assert_eq!(reader.read_to_string(Path::new("prog.asm")).unwrap(), "CODE\nHALT\n");
    }

    #[test]
    fn mock_reader_errors_on_missing_file() {
        let reader = MockFileReader::default();
        assert!(reader.read_to_string(Path::new("missing.asm")).is_err());
    }
}
