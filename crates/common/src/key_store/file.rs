use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{KeyBackend, KeyStoreError};

/// One JSON file holding the key record
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyBackend for FileBackend {
    fn load(&self) -> Result<Option<String>, KeyStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: &str) -> Result<(), KeyStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, record)?;

        // private key material, owner only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
