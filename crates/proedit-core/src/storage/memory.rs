//! In-memory storage implementation.

use super::{Storage, StorageError, StorageResult};
use crate::project::ProjectFile;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStorage {
    projects: RwLock<HashMap<String, ProjectFile>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, project: &ProjectFile) -> StorageResult<()> {
        let mut projects = self.projects.write().map_err(lock_error)?;
        projects.insert(id.to_string(), project.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<ProjectFile> {
        let projects = self.projects.read().map_err(lock_error)?;
        projects
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let mut projects = self.projects.write().map_err(lock_error)?;
        projects.remove(id);
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let projects = self.projects.read().map_err(lock_error)?;
        Ok(projects.keys().cloned().collect())
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        let projects = self.projects.read().map_err(lock_error)?;
        Ok(projects.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::BackgroundFit;

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        let project = ProjectFile {
            background_fit: BackgroundFit::Stretch,
            ..ProjectFile::default()
        };
        storage.save("test", &project).unwrap();
        assert_eq!(storage.load("test").unwrap(), project);
    }

    #[test]
    fn test_not_found() {
        let storage = MemoryStorage::new();
        assert!(matches!(storage.load("nonexistent"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_exists_and_delete() {
        let storage = MemoryStorage::new();
        assert!(!storage.exists("test").unwrap());
        storage.save("test", &ProjectFile::default()).unwrap();
        assert!(storage.exists("test").unwrap());
        storage.delete("test").unwrap();
        assert!(!storage.exists("test").unwrap());
    }

    #[test]
    fn test_list() {
        let storage = MemoryStorage::new();
        storage.save("doc1", &ProjectFile::default()).unwrap();
        storage.save("doc2", &ProjectFile::default()).unwrap();
        let list = storage.list().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(&"doc1".to_string()));
    }
}
