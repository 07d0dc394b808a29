//! Where the generated file goes and what it is called.

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use codegen_generator::RandomCodeGenerator;
use codegen_pipeline::{Artifact, FsArtifactStore};
use rand::Rng;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const APP_DIR: &str = "Code Generator";
pub const FILES_DIR: &str = "Files";

/// Letters in the random part of a file name.
pub const TOKEN_LENGTH: usize = 26;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("could not determine the home directory")]
    HomeDir,
    #[error("failed to hash file name seed: {0}")]
    Hash(String),
}

/// Output directory plus the topmost directory that may be pruned when
/// a partial file is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    dir: PathBuf,
    root: Option<PathBuf>,
}

impl Destination {
    /// `<home>/Documents/Code Generator/Files`, without `Documents` on Linux.
    pub fn per_user() -> Result<Self, OutputError> {
        let home = dirs::home_dir().ok_or(OutputError::HomeDir)?;
        Ok(Self::under(&home))
    }

    fn under(home: &Path) -> Self {
        let base = if cfg!(target_os = "linux") {
            home.to_path_buf()
        } else {
            home.join("Documents")
        };
        let root = base.join(APP_DIR);
        Self {
            dir: root.join(FILES_DIR),
            root: Some(root),
        }
    }

    pub fn custom(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            root: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store(&self) -> FsArtifactStore {
        match &self.root {
            Some(root) => FsArtifactStore::with_root(root),
            None => FsArtifactStore::new(),
        }
    }

    pub fn file_path(&self, prefix: &str, label: &str, token: &str) -> PathBuf {
        self.dir.join(file_name(prefix, label, token))
    }

    /// Creates the output directory and the file at `path` inside it.
    ///
    /// Directories created here are removed again if the file cannot be
    /// created.
    pub fn create_artifact(&self, path: &Path) -> io::Result<(Artifact, BufWriter<File>)> {
        let first_missing = self
            .dir
            .ancestors()
            .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
            .last()
            .map(Path::to_path_buf);
        fs::create_dir_all(&self.dir)?;

        Artifact::create(path, self.store()).inspect_err(|_| {
            if let Some(top) = &first_missing {
                self.remove_created_dirs(top);
            }
        })
    }

    fn remove_created_dirs(&self, top: &Path) {
        for dir in self.dir.ancestors() {
            if let Err(e) = fs::remove_dir(dir) {
                debug!(dir = %dir.display(), error = %e, "left output directory in place");
                break;
            }
            if dir == top {
                break;
            }
        }
    }
}

/// `[<prefix>]-<CODES|CODE>_<token>.txt`
pub fn file_name(prefix: &str, label: &str, token: &str) -> String {
    format!("[{prefix}]-{label}_{token}.txt")
}

/// Random lowercase token for the file name, derived from an Argon2 hash
/// of a freshly generated code.
pub fn file_token() -> Result<String, OutputError> {
    let mut seeds = RandomCodeGenerator::new("X", 12);
    loop {
        let phc = hash_seed(seeds.next_code().as_str())?;
        if let Some(token) = token_from_phc(&phc) {
            return Ok(token);
        }
    }
}

fn hash_seed(seed: &str) -> Result<String, OutputError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| OutputError::Hash(e.to_string()))?;

    let hash = Argon2::default()
        .hash_password(seed.as_bytes(), &salt)
        .map_err(|e| OutputError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Keeps the letters of the salt and hash fields of a PHC string,
/// lowercased. `None` if they hold fewer than [`TOKEN_LENGTH`] letters.
fn token_from_phc(phc: &str) -> Option<String> {
    // $argon2id$v=19$m=..,t=..,p=..$<salt>$<hash>
    let token: String = phc
        .split('$')
        .skip(4)
        .flat_map(str::chars)
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .take(TOKEN_LENGTH)
        .collect();
    (token.len() == TOKEN_LENGTH).then_some(token)
}
