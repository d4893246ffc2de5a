use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const MONGOD_CONF_PATH: &str = "/etc/mongod.conf";

/// The only bind address the provisioner ever writes. Exposing the database
/// beyond the local host is a manual, deliberate act.
pub const LOOPBACK: &str = "127.0.0.1";

/// A parsed view of mongod.conf that understands only as much YAML as the
/// edit needs: top-level section headers and the indented lines under them.
/// Everything else passes through untouched, so a rewrite never disturbs
/// sections the provisioner has no business in.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MongodConf {
    lines: Vec<String>,
}

impl MongodConf {
    pub fn parse(contents: &str) -> MongodConf {
        MongodConf {
            lines: contents.lines().map(str::to_string).collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// Point `net.port` and `net.bindIp` at the given port on loopback,
    /// creating the `net:` section if the file doesn't have one. Fields that
    /// already exist are updated in place; missing fields are inserted
    /// immediately after the section header.
    pub fn set_network(&mut self, port: u16) {
        match self.section_start("net") {
            Some(header) => {
                self.set_field(header, "port", &port.to_string());
                self.set_field(header, "bindIp", LOOPBACK);
            }
            None => {
                if self.lines.last().is_some_and(|l| !l.is_empty()) {
                    self.lines.push(String::new());
                }
                self.lines.push("net:".to_string());
                self.lines.push(format!("  port: {port}"));
                self.lines.push(format!("  bindIp: {LOOPBACK}"));
            }
        }
    }

    fn section_start(&self, name: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| !l.starts_with([' ', '\t']) && l.trim_end() == format!("{name}:"))
    }

    /// One past the last line belonging to the section starting at `header`:
    /// the next non-empty line at indent zero, or end of file.
    fn section_end(&self, header: usize) -> usize {
        self.lines[header + 1..]
            .iter()
            .position(|l| !l.is_empty() && !l.starts_with([' ', '\t']))
            .map_or(self.lines.len(), |off| header + 1 + off)
    }

    fn set_field(&mut self, header: usize, key: &str, value: &str) {
        let end = self.section_end(header);
        for i in header + 1..end {
            let trimmed = self.lines[i].trim_start();
            if trimmed.starts_with(&format!("{key}:")) {
                let indent = &self.lines[i][..self.lines[i].len() - trimmed.len()];
                self.lines[i] = format!("{indent}{key}: {value}");
                return;
            }
        }
        self.lines.insert(header + 1, format!("  {key}: {value}"));
    }
}

/// What one config pass did, for the operator's benefit.
#[derive(Debug, PartialEq, Eq)]
pub struct ConfigApplied {
    pub written: bool,
    pub backup: Option<PathBuf>,
}

/// Apply the network settings to the config file at `path`. An existing file
/// is always copied to a timestamped backup before the edit is attempted;
/// the file itself is only rewritten when the rendered content differs, which
/// is what makes a repeat run a no-op.
pub fn apply_network_settings(path: &Path, port: u16) -> Result<ConfigApplied> {
    let existing = match path.exists() {
        true => Some(
            fs::read_to_string(path)
                .with_context(|| format!("Reading config file {}", path.display()))?,
        ),
        false => None,
    };

    let backup = match existing {
        Some(_) => {
            let backup = backup_path(path);
            fs::copy(path, &backup)
                .with_context(|| format!("Backing up config to {}", backup.display()))?;
            Some(backup)
        }
        None => {
            debug!("No config file at {}, creating one", path.display());
            None
        }
    };

    let mut conf = MongodConf::parse(existing.as_deref().unwrap_or(""));
    conf.set_network(port);
    let rendered = conf.render();

    if existing.as_deref() == Some(rendered.as_str()) {
        Ok(ConfigApplied {
            written: false,
            backup,
        })
    } else {
        fs::write(path, &rendered)
            .with_context(|| format!("Writing config file {}", path.display()))?;
        Ok(ConfigApplied {
            written: true,
            backup,
        })
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    PathBuf::from(format!("{}.backup.{ts}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOCK_CONF: &str = "\
# mongod.conf
storage:
  dbPath: /var/lib/mongodb

systemLog:
  destination: file
  path: /var/log/mongodb/mongod.log

net:
  port: 27017
  bindIp: 127.0.0.1
";

    #[test]
    fn updates_existing_fields_in_place() {
        let mut conf = MongodConf::parse(STOCK_CONF);
        conf.set_network(9000);
        let rendered = conf.render();

        assert!(rendered.contains("  port: 9000\n"));
        assert!(rendered.contains("  bindIp: 127.0.0.1\n"));
        // Untouched sections survive byte-for-byte.
        assert!(rendered.contains("  dbPath: /var/lib/mongodb\n"));
        assert!(rendered.contains("  path: /var/log/mongodb/mongod.log\n"));
        assert!(rendered.starts_with("# mongod.conf\n"));
    }

    #[test]
    fn inserts_missing_fields_after_the_section_header() {
        let mut conf = MongodConf::parse("net:\n  maxIncomingConnections: 100\n");
        conf.set_network(27017);
        let rendered = conf.render();

        let net_pos = rendered.find("net:").unwrap();
        let port_pos = rendered.find("  port: 27017").unwrap();
        let bind_pos = rendered.find("  bindIp: 127.0.0.1").unwrap();
        assert!(net_pos < port_pos && net_pos < bind_pos);
        assert!(rendered.contains("  maxIncomingConnections: 100\n"));
    }

    #[test]
    fn appends_a_section_when_none_exists() {
        let mut conf = MongodConf::parse("storage:\n  dbPath: /var/lib/mongodb\n");
        conf.set_network(27017);
        let rendered = conf.render();

        assert!(rendered.contains("\nnet:\n  port: 27017\n  bindIp: 127.0.0.1\n"));
    }

    #[test]
    fn commented_fields_do_not_count_as_present() {
        let mut conf = MongodConf::parse("net:\n  # port: 9999\n");
        conf.set_network(27017);
        let rendered = conf.render();

        assert!(rendered.contains("  port: 27017\n"));
        assert!(rendered.contains("  # port: 9999\n"));
    }

    #[test]
    fn a_section_later_in_the_file_is_not_swallowed() {
        let mut conf = MongodConf::parse("net:\n  port: 1\nsecurity:\n  authorization: enabled\n");
        conf.set_network(2);
        let rendered = conf.render();

        assert!(rendered.contains("  port: 2\n"));
        assert!(rendered.contains("security:\n  authorization: enabled\n"));
        // bindIp was inserted under net:, not under security:.
        let bind_pos = rendered.find("  bindIp:").unwrap();
        assert!(bind_pos < rendered.find("security:").unwrap());
    }

    #[test]
    fn backup_precedes_mutation_and_matches_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mongod.conf");
        fs::write(&path, STOCK_CONF).unwrap();

        let applied = apply_network_settings(&path, 9000).unwrap();
        assert!(applied.written);

        let backup = applied.backup.unwrap();
        assert_eq!(fs::read_to_string(backup).unwrap(), STOCK_CONF);
        assert!(fs::read_to_string(&path).unwrap().contains("  port: 9000\n"));
    }

    #[test]
    fn repeat_run_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mongod.conf");
        fs::write(&path, STOCK_CONF).unwrap();

        let first = apply_network_settings(&path, 9000).unwrap();
        assert!(first.written);
        let after_first = fs::read_to_string(&path).unwrap();

        let second = apply_network_settings(&path, 9000).unwrap();
        assert!(!second.written);
        assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
        // The recovery point is still taken, unconditionally.
        assert!(second.backup.is_some());
    }

    #[test]
    fn missing_config_file_is_created_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mongod.conf");

        let applied = apply_network_settings(&path, 27017).unwrap();
        assert!(applied.written);
        assert_eq!(applied.backup, None);

        let rendered = fs::read_to_string(&path).unwrap();
        assert!(rendered.contains("net:\n  port: 27017\n  bindIp: 127.0.0.1\n"));
    }
}
