use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use crate::store::StoreError;

/// Records keyed by user id.
pub type DB<T> = HashMap<String, T>;

/// A missing file is an empty database.
pub fn load_db<T: DeserializeOwned>(path: &Path) -> Result<DB<T>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(err) => Err(err.into()),
    }
}

/// Writes to a sibling temp file, syncs, then renames over the target.
pub async fn save_db<T: Serialize>(path: &Path, db: &DB<T>) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
    let body = serde_json::to_vec_pretty(db)?;
    {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
    }
    if let Err(err) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db: DB<Vec<u32>> = load_db(&dir.path().join("absent.json")).unwrap();
        assert!(db.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.json");
        let mut db: DB<Vec<u32>> = HashMap::new();
        db.insert("u1".into(), vec![1, 2]);
        save_db(&path, &db).await.unwrap();
        let loaded: DB<Vec<u32>> = load_db(&path).unwrap();
        assert_eq!(loaded.get("u1"), Some(&vec![1, 2]));
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_db::<Vec<u32>>(&path), Err(StoreError::Json(_))));
    }
}
