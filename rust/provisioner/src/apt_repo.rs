use crate::report;
use crate::series::{self, Series};
use anyhow::{Context, Result};
use hostops::runner::CommandRunner;
use log::debug;
use std::fs;
use std::path::PathBuf;

const REPO_BASE_URL: &str = "https://repo.mongodb.org/apt/ubuntu";
const PGP_BASE_URL: &str = "https://www.mongodb.org/static/pgp";
const SERVER_PACKAGES: [&str; 2] = ["mongodb-org", "mongodb-mongosh"];

/// Where apt keeps repository descriptors and signing keys. Parameterized so
/// the filesystem side of installation can run against a tempdir in tests.
#[derive(Debug, Clone)]
pub struct AptLayout {
    pub sources_dir: PathBuf,
    pub keyring_dir: PathBuf,
}

impl Default for AptLayout {
    fn default() -> Self {
        AptLayout {
            sources_dir: PathBuf::from("/etc/apt/sources.list.d"),
            keyring_dir: PathBuf::from("/usr/share/keyrings"),
        }
    }
}

/// One series' apt repository registration.
pub struct AptRepo<'a> {
    series: Series,
    codename: &'a str,
    layout: &'a AptLayout,
}

impl<'a> AptRepo<'a> {
    pub fn new(series: Series, codename: &'a str, layout: &'a AptLayout) -> AptRepo<'a> {
        AptRepo {
            series,
            codename,
            layout,
        }
    }

    pub fn list_path(&self) -> PathBuf {
        self.layout
            .sources_dir
            .join(format!("mongodb-org-{}.list", self.series))
    }

    pub fn keyring_path(&self) -> PathBuf {
        self.layout
            .keyring_dir
            .join(format!("mongodb-server-{}.gpg", self.series))
    }

    /// Remove descriptors registered for any other series. Two descriptor
    /// files offering the same packages make apt refuse to resolve them.
    pub fn remove_stale_descriptors(&self) -> Result<()> {
        let own = self.list_path();
        let entries = match fs::read_dir(&self.layout.sources_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    "Could not list {} ({e}), nothing to clean up",
                    self.layout.sources_dir.display()
                );
                return Ok(());
            }
        };

        for entry in entries {
            let path = entry?.path();
            let name = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            if name.starts_with("mongodb-org-") && name.ends_with(".list") && path != own {
                fs::remove_file(&path)
                    .with_context(|| format!("Removing stale repo descriptor {}", path.display()))?;
                report::info(format!("Removed conflicting repo descriptor {name}"));
            }
        }
        Ok(())
    }

    /// Fetch and dearmor this series' signing key into the keyring directory.
    pub async fn register_key(&self, runner: &dyn CommandRunner) -> Result<()> {
        let pipeline = format!(
            "curl -fsSL {PGP_BASE_URL}/server-{}.asc | gpg --dearmor --yes -o {}",
            self.series,
            self.keyring_path().display()
        );
        runner
            .shell(&pipeline)
            .await?
            .require_success()
            .context("Registering the MongoDB package signing key")?;
        Ok(())
    }

    pub fn write_descriptor(&self) -> Result<()> {
        let line = format!(
            "deb [ arch=amd64,arm64 signed-by={} ] {REPO_BASE_URL} {}/mongodb-org/{} multiverse\n",
            self.keyring_path().display(),
            self.codename,
            self.series
        );
        fs::write(self.list_path(), line)
            .with_context(|| format!("Writing repo descriptor {}", self.list_path().display()))?;
        Ok(())
    }

    pub async fn refresh_index(&self, runner: &dyn CommandRunner) -> Result<()> {
        runner
            .run("apt-get", &["update", "-y"])
            .await?
            .require_success()
            .context("Refreshing the package index")?;
        Ok(())
    }

    pub async fn install_packages(&self, runner: &dyn CommandRunner) -> Result<()> {
        let mut args = vec!["install", "-y"];
        args.extend(SERVER_PACKAGES);
        runner
            .run("apt-get", &args)
            .await?
            .require_success()
            .with_context(|| format!("Installing {}", SERVER_PACKAGES.join(" ")))?;
        Ok(())
    }
}

/// Install the server and client tooling for `selected`, retrying once on the
/// documented fallback series when that applies. Returns the series that
/// actually got installed; an exhausted or inapplicable fallback is fatal.
pub async fn install_server(
    runner: &dyn CommandRunner,
    layout: &AptLayout,
    codename: &str,
    selected: Series,
) -> Result<Series> {
    match try_install(runner, layout, codename, selected).await {
        Ok(()) => Ok(selected),
        Err(first) => {
            let Some(fallback) = series::install_fallback(codename, selected) else {
                return Err(first.context(
                    "MongoDB installation failed. Install the mongodb-org packages manually, \
                     or use the containerized deployment instead",
                ));
            };

            report::warn(format!(
                "MongoDB {selected} install failed on {codename}, retrying with {fallback}"
            ));
            try_install(runner, layout, codename, fallback)
                .await
                .context(
                    "MongoDB installation failed on both series. Install the mongodb-org \
                     packages manually, or use the containerized deployment instead",
                )?;
            Ok(fallback)
        }
    }
}

async fn try_install(
    runner: &dyn CommandRunner,
    layout: &AptLayout,
    codename: &str,
    series: Series,
) -> Result<()> {
    let repo = AptRepo::new(series, codename, layout);
    repo.remove_stale_descriptors()?;
    repo.register_key(runner).await?;
    repo.write_descriptor()?;
    repo.refresh_index(runner).await?;
    repo.install_packages(runner).await
}
