//! Backend base URL normalization.

use url::Url;

use crate::error::ConfigError;

/// Path segment the backend's SDK resources live under. Resource paths
/// carry it themselves, so a base URL ending in it is trimmed.
const SDK_SEGMENT: &str = "vedsdk";

/// Normalize a base URL.
///
/// A missing scheme defaults to `https`, a trailing `vedsdk` segment is
/// removed, and the result always ends with `/`.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::BaseUrl {
            url: raw.to_string(),
            reason: "empty".to_string(),
        });
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| ConfigError::BaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::BaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {:?}", url.scheme()),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::BaseUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    url.set_query(None);
    url.set_fragment(None);

    let mut path = url.path().trim_end_matches('/').to_string();
    if path
        .rsplit('/')
        .next()
        .is_some_and(|last| last.eq_ignore_ascii_case(SDK_SEGMENT))
    {
        path.truncate(path.len() - SDK_SEGMENT.len());
    }
    let path = format!("{}/", path.trim_end_matches('/'));
    url.set_path(&path);

    Ok(url.to_string())
}
