use anyhow::{anyhow, Context, Result};
use serde_derive::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_URI: &str = "mongodb://localhost:9000";
pub const DEFAULT_DB: &str = "fablink";
pub const DEFAULT_ORDERS_COLLECTION: &str = "orders";

const URI_KEY: &str = "MONGODB_URI";
const DB_KEY: &str = "MONGODB_DB";
const ORDERS_COLLECTION_KEY: &str = "MONGODB_COLLECTION_ORDERS";

/// Settings for a provisioning run, resolved once at startup. The process
/// environment is never consulted or mutated; the env file is the only
/// source, with documented defaults for anything it leaves unset.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct EnvConfig {
    pub uri: String,
    pub db_name: String,
    pub orders_collection: String,
}

impl EnvConfig {
    /// Load the deployment env file. A missing file is fatal: the backend's
    /// environment must be bootstrapped before the database host is touched.
    pub fn load(path: &Path) -> Result<EnvConfig> {
        if !path.exists() {
            return Err(anyhow!(
                "Environment file {} not found. Create the project .env (copy .env.example \
                 from the backend repository) before provisioning",
                path.display()
            ));
        }

        let vars: HashMap<String, String> = dotenv::from_path_iter(path)
            .with_context(|| format!("Opening environment file {}", path.display()))?
            .collect::<Result<_, _>>()
            .with_context(|| format!("Parsing environment file {}", path.display()))?;

        Ok(Self::from_vars(&vars))
    }

    /// Pure defaulting step, split out so it can be tested without touching
    /// the filesystem.
    pub fn from_vars(vars: &HashMap<String, String>) -> EnvConfig {
        let get = |key: &str, default: &str| {
            vars.get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        EnvConfig {
            uri: get(URI_KEY, DEFAULT_URI),
            db_name: get(DB_KEY, DEFAULT_DB),
            orders_collection: get(ORDERS_COLLECTION_KEY, DEFAULT_ORDERS_COLLECTION),
        }
    }

    /// The env file lives at the project root, one directory above wherever
    /// the provisioner binary is installed.
    pub fn default_path() -> Result<PathBuf> {
        let exe = std::env::current_exe().context("Resolving current executable path")?;
        let root = exe
            .parent()
            .and_then(|p| p.parent())
            .ok_or_else(|| anyhow!("Executable path {} has no parent directory", exe.display()))?;
        Ok(root.join(".env"))
    }
}
