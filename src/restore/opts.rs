use crate::foundation::error::{ResurfaceError, ResurfaceResult};

/// Restore pass configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RestoreOpts {
    /// Restore the images of each pass on a rayon pool.
    pub parallel: bool,
    /// Override rayon worker threads (parallel mode only).
    pub threads: Option<usize>,
}

impl RestoreOpts {
    /// Defaults overridden by `RESURFACE_RESTORE_PARALLEL` and `RESURFACE_RESTORE_THREADS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut opts = Self::default();
        if let Some(parallel) = lookup("RESURFACE_RESTORE_PARALLEL")
            .as_deref()
            .and_then(parse_flag)
        {
            opts.parallel = parallel;
        }
        if let Some(threads) = lookup("RESURFACE_RESTORE_THREADS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            opts.threads = Some(threads);
        }
        opts
    }

    pub(crate) fn validate(&self) -> ResurfaceResult<()> {
        if self.threads == Some(0) {
            return Err(ResurfaceError::validation(
                "restore 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

/// Session-level options, loadable from JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GraphicsOpts {
    pub restore: RestoreOpts,
}

impl GraphicsOpts {
    pub fn from_json(text: &str) -> ResurfaceResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| ResurfaceError::validation(format!("invalid graphics options: {e}")))
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
