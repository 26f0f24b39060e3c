//! Endpoint resolution into input and output backend modes.
//!
//! Users hand the tools up to four endpoint strings (xrootd for reading,
//! xrootd for writing, srm, dcap). Which subset is set decides how inputs
//! are discovered and where the merged artifact lands. Exactly one input
//! mode and one output mode come out of resolution; any combination not
//! covered below is rejected before any I/O happens.
//!
//! Valid output combinations:
//!
//! | srm | dcap | xrootd-out | mode |
//! |-----|------|------------|------|
//! | –   | –    | –          | local |
//! | set | set  | –          | direct dcap write, srm directory control |
//! | set | –    | –          | merge locally, relay via `gfal-copy` |
//! | –   | –    | set        | merge locally, relay via `xrdcp` |

use std::error::Error;
use std::fmt;

/// Raw endpoint strings as supplied on the command line. Empty or
/// whitespace-only values count as absent.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    /// xrootd server for reading unmerged inputs.
    pub xrootd_in: Option<String>,
    /// xrootd server for writing merged outputs (relay copy target).
    pub xrootd_out: Option<String>,
    /// srm endpoint for directory control and gfal relay copies.
    pub srm: Option<String>,
    /// dcap endpoint for direct merged-output writes.
    pub dcap: Option<String>,
}

/// How unmerged inputs are discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Local,
    Xrootd(String),
}

/// Where the merged artifact ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    Local,
    /// Merge writes straight through dcap; directories are created via srm.
    DcapDirect { write: String, control: String },
    /// Merge into a local staging file, then `gfal-copy` to srm.
    SrmRelay(String),
    /// Merge into a local staging file, then `xrdcp` to xrootd.
    XrootdRelay(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub message: String,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}; valid endpoint combinations: none (local output), \
             srm+dcap (direct dcap write), srm alone (gfal relay), \
             output xrootd alone (xrdcp relay)",
            self.message
        )
    }
}

impl Error for BackendError {}

fn active(endpoint: Option<&String>) -> Option<String> {
    let trimmed = endpoint?.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Resolve endpoint strings into one input mode and one output mode.
///
/// # Errors
///
/// Returns a [`BackendError`] when the active endpoints do not match any
/// named combination. This is fatal and must abort the run before any
/// listing or merge-planning work starts.
pub fn resolve(endpoints: &Endpoints) -> Result<(InputMode, OutputMode), BackendError> {
    let xrootd_in = active(endpoints.xrootd_in.as_ref());
    let xrootd_out = active(endpoints.xrootd_out.as_ref());
    let srm = active(endpoints.srm.as_ref());
    let dcap = active(endpoints.dcap.as_ref());

    let input = match xrootd_in {
        Some(server) => InputMode::Xrootd(server),
        None => InputMode::Local,
    };

    let output = match (srm, dcap, xrootd_out) {
        (None, None, None) => OutputMode::Local,
        (Some(control), Some(write), None) => OutputMode::DcapDirect { write, control },
        (Some(endpoint), None, None) => OutputMode::SrmRelay(endpoint),
        (None, None, Some(endpoint)) => OutputMode::XrootdRelay(endpoint),
        (srm, dcap, xrootd_out) => {
            let set: Vec<&str> = [
                srm.as_ref().map(|_| "srm"),
                dcap.as_ref().map(|_| "dcap"),
                xrootd_out.as_ref().map(|_| "output xrootd"),
            ]
            .into_iter()
            .flatten()
            .collect();
            return Err(BackendError {
                message: format!("ambiguous output endpoints: {}", set.join("+")),
            });
        }
    };

    Ok((input, output))
}

impl InputMode {
    /// Qualify a backend-relative path into a full source location.
    #[must_use]
    pub fn qualify(&self, path: &str) -> String {
        match self {
            Self::Local => path.to_string(),
            Self::Xrootd(server) => format!("{}/{}", server, path.trim_start_matches('/')),
        }
    }
}
