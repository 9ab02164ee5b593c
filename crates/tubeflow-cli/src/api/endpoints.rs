//! API endpoint URL builders

fn join(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Build health check URL
pub fn health_url(base_url: &str) -> String {
    join(base_url, "health")
}

/// Build main run start URL
pub fn start_url(base_url: &str) -> String {
    join(base_url, "api/start")
}

/// Build selective job start URL
pub fn generate_selected_url(base_url: &str) -> String {
    join(base_url, "api/generate_selected")
}

/// Build status URL
pub fn status_url(base_url: &str) -> String {
    join(base_url, "api/status")
}

/// Absolute URL of a server-relative artifact path like `/outputs/a.mp4`
pub fn artifact_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        join(base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_tolerate_trailing_slash() {
        assert_eq!(status_url("http://localhost:8000/"), "http://localhost:8000/api/status");
        assert_eq!(start_url("http://localhost:8000"), "http://localhost:8000/api/start");
    }

    #[test]
    fn test_artifact_url() {
        assert_eq!(
            artifact_url("http://host:8000", "/outputs/a.mp4"),
            "http://host:8000/outputs/a.mp4"
        );
        assert_eq!(
            artifact_url("http://host:8000", "https://cdn.example.com/a.mp4"),
            "https://cdn.example.com/a.mp4"
        );
    }
}
