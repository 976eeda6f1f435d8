//! Manipulation of asset urls.
//!
//! Urls always use `/` as separator regardless of the platform.

/// Returns the directory part of the url (everything before the last `/`).
pub fn directory(url: &str) -> &str {
    match url.rfind('/') {
        Some(idx) => &url[..idx],
        None => "",
    }
}

/// Joins a relative url to the base directory and normalizes the result.
/// Absolute urls (starting with `/`) ignore the base.
pub fn join(base: &str, url: &str) -> String {
    if base.is_empty() || url.starts_with('/') {
        normalize(url)
    } else {
        normalize(&format!("{}/{}", base, url))
    }
}

/// Removes empty and `.` segments and resolves `..` segments where possible.
pub fn normalize(url: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in url.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            s => segments.push(s),
        }
    }

    let joined = segments.join("/");
    if url.starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Returns whether a reference string looks like a path rather than an id.
pub fn looks_like_path(reference: &str) -> bool {
    reference.contains('/') || reference.contains('.')
}
