#![allow(dead_code)]

pub mod temp_files {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Write `content` to a uniquely named temp file with extension `ext`.
    pub fn create_temp_file(content: &str, ext: &str) -> PathBuf {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();

        let path = std::env::temp_dir().join(format!(
            "brrtapp_test_{}_{}_{}.{}",
            std::process::id(),
            counter,
            nanos,
            ext
        ));

        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn create_temp_yaml(content: &str) -> PathBuf {
        create_temp_file(content, "yaml")
    }

    /// Cleanup temporary files (best effort)
    pub fn cleanup_temp_files(paths: &[PathBuf]) {
        for path in paths {
            let _ = std::fs::remove_file(path);
        }
    }
}

pub mod requests {
    use brrtapp::ParsedRequest;
    use http::Method;

    pub const TOKEN: &str = "t0k3n";

    pub fn get(target: &str) -> ParsedRequest {
        ParsedRequest::new(Method::GET, target)
    }

    pub fn request(method: Method, target: &str) -> ParsedRequest {
        ParsedRequest::new(method, target)
    }

    /// POST carrying a valid double-submit CSRF token.
    pub fn post(target: &str) -> ParsedRequest {
        with_token(ParsedRequest::new(Method::POST, target))
    }

    pub fn with_token(req: ParsedRequest) -> ParsedRequest {
        req.with_header("Cookie", format!("XSRF-TOKEN={TOKEN}"))
            .with_field("_token", TOKEN)
    }
}

pub mod apps {
    use brrtapp::{AppConfig, Application};

    /// Application with CSRF checks off, for tests that are not about CSRF.
    pub fn without_csrf() -> Application {
        let mut config = AppConfig::default();
        config.csrf.enabled = false;
        Application::new(config)
    }
}
