use std::path::Path;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use crate::error_handling::types::TranscodeError;

const ZERO_START: &str = "PT0S";

fn period_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<Period\b[^>]*>").expect("static regex"))
}

fn start_attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\s)start\s*=\s*(?:"[^"]*"|'[^']*')"#).expect("static regex"))
}

/// Rewrites the `start` attribute of the manifest's `<Period>` to zero.
///
/// Returns `Ok(None)` when the manifest already starts at zero or the Period carries no
/// `start`. Only the first Period is touched.
pub fn patch_period_start(manifest: &str) -> Result<Option<String>, String> {
    let mut periods = period_tag().find_iter(manifest);
    let period = periods.next().ok_or_else(|| "no <Period> element".to_string())?;
    if periods.next().is_some() {
        warn!("Manifest declares several periods, only the first is normalized");
    }

    let tag = period.as_str();
    let Some(caps) = start_attribute().captures(tag) else {
        return Ok(None);
    };
    let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
    let leading = caps.get(1).map(|m| m.as_str()).unwrap_or(" ");
    let replacement = format!("{}start=\"{}\"", leading, ZERO_START);
    if whole == replacement {
        return Ok(None);
    }

    let patched_tag = tag.replacen(whole, &replacement, 1);
    let mut patched = String::with_capacity(manifest.len());
    patched.push_str(&manifest[..period.start()]);
    patched.push_str(&patched_tag);
    patched.push_str(&manifest[period.end()..]);
    Ok(Some(patched))
}

/// Normalizes the Period start of the manifest at `path` in place.
///
/// The file is only written when its content changes. Returns whether it was rewritten.
pub async fn normalize_period_start(path: &Path) -> Result<bool, TranscodeError> {
    let manifest = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TranscodeError::Manifest(path.to_path_buf(), e.to_string()))?;

    match patch_period_start(&manifest).map_err(|e| TranscodeError::Manifest(path.to_path_buf(), e))? {
        Some(patched) => {
            tokio::fs::write(path, patched)
                .await
                .map_err(|e| TranscodeError::Manifest(path.to_path_buf(), e.to_string()))?;
            debug!("Normalized period start in {}", path.display());
            Ok(true)
        }
        None => Ok(false),
    }
}
