use serde_derive::Serialize;
use std::fmt;

/// The release identifier that gets the newest series. Everything else stays
/// on the older line until it has been validated for FabLink deployments.
pub const NEWEST_RELEASE: &str = "noble";

/// MongoDB release series the provisioner knows how to install.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum Series {
    V7,
    V8,
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Series::V7 => write!(f, "7.0"),
            Series::V8 => write!(f, "8.0"),
        }
    }
}

/// Total mapping from release codename to installable series: exactly one
/// codename opts into the newest series, every other value gets the older
/// one.
pub fn series_for_release(codename: &str) -> Series {
    if codename == NEWEST_RELEASE {
        Series::V8
    } else {
        Series::V7
    }
}

/// The one retry the installer gets. The older series paired with the newest
/// release is the known repository-availability gap; that combination may try
/// again on the newer series. Every other failure is final.
pub fn install_fallback(codename: &str, failed: Series) -> Option<Series> {
    (codename == NEWEST_RELEASE && failed == Series::V7).then_some(Series::V8)
}
