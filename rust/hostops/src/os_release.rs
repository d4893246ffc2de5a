/// Detection of the distribution release codename. Package repository
/// selection keys off this, so it has to produce *something* usable even on
/// hosts where the release files are incomplete. Failures fall back to a
/// known codename rather than aborting.
use log::info;
use std::fs;

const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Codename assumed when the host doesn't expose one.
pub const DEFAULT_CODENAME: &str = "jammy";

/// The release codename of the current host, or [`DEFAULT_CODENAME`] if it
/// can't be determined.
pub fn release_codename() -> String {
    match fs::read_to_string(OS_RELEASE_PATH) {
        Ok(contents) => parse_codename(&contents).unwrap_or_else(|| {
            info!("No codename in {OS_RELEASE_PATH}, assuming {DEFAULT_CODENAME}");
            DEFAULT_CODENAME.to_string()
        }),
        Err(e) => {
            info!("Failed to read {OS_RELEASE_PATH} ({e}), assuming {DEFAULT_CODENAME}");
            DEFAULT_CODENAME.to_string()
        }
    }
}

/// Pull the codename out of os-release(5) content. `VERSION_CODENAME` wins;
/// `UBUNTU_CODENAME` covers derivatives that only set the latter. Values may
/// be quoted.
pub fn parse_codename(contents: &str) -> Option<String> {
    for key in ["VERSION_CODENAME=", "UBUNTU_CODENAME="] {
        for line in contents.lines() {
            if let Some(value) = line.trim().strip_prefix(key) {
                let value = value.trim().trim_matches('"');
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_and_bare_values() {
        let contents = "NAME=\"Ubuntu\"\nVERSION_CODENAME=noble\nID=ubuntu\n";
        assert_eq!(parse_codename(contents), Some("noble".to_string()));

        let contents = "VERSION_CODENAME=\"jammy\"\n";
        assert_eq!(parse_codename(contents), Some("jammy".to_string()));
    }

    #[test]
    fn falls_back_to_ubuntu_codename() {
        let contents = "ID=neon\nUBUNTU_CODENAME=jammy\n";
        assert_eq!(parse_codename(contents), Some("jammy".to_string()));
    }

    #[test]
    fn missing_or_empty_codename_is_none() {
        assert_eq!(parse_codename("ID=debian\nVERSION_ID=\"12\"\n"), None);
        assert_eq!(parse_codename("VERSION_CODENAME=\n"), None);
        assert_eq!(parse_codename(""), None);
    }
}
