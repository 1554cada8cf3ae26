//! Base64 inlining of local images referenced from `url(...)`.

use crate::loader;
use base64::Engine;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)url\(([^)]+)\)").unwrap());

/// Media type for an inlinable image path, by extension.
pub fn media_type(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "jpg" => Some("image/jpeg"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Replace local image references in `value` with `data:` URIs. References
/// that cannot be read are left as written.
pub fn inline_images(value: &str, directory: &Path) -> String {
    URL.replace_all(value, |caps: &Captures| inline_url(&caps[0], &caps[1], directory))
        .into_owned()
}

fn inline_url(original: &str, target: &str, directory: &Path) -> String {
    let target = loader::strip_quotes(target);
    if target.contains("//") || target.starts_with("data:") {
        return original.to_string();
    }
    let Some(mime) = media_type(&target) else {
        return original.to_string();
    };

    let path = directory.join(&target);
    match loader::read_image(&path) {
        Ok(bytes) => {
            tracing::debug!(path = %path.display(), size = bytes.len(), "inlining image");
            let data = base64::engine::general_purpose::STANDARD.encode(bytes);
            format!("url(\"data:{};base64,{}\")", mime, data)
        }
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "leaving image reference as is");
            original.to_string()
        }
    }
}
