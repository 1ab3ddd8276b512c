//! # Handler POST
//! src/handlers/post.rs
//!
//! Recibe la subida y responde siempre 200 con una página que indica si
//! funcionó o no.

use crate::config::Config;
use crate::files::resolve;
use crate::http::{Request, Response};
use crate::upload::{handle_upload, target_directory, UploadResult};
use html_escape::{encode_double_quoted_attribute, encode_text};
use log::{info, warn};
use std::io::Read;

pub fn post_handler(config: &Config, request: &Request, body: &mut dyn Read) -> Response {
    let resolved = resolve(request.target(), &config.directory);
    let target_dir = target_directory(&resolved);

    let result = handle_upload(request, body, &target_dir);
    if result.success {
        info!("upload to {}: {}", target_dir.display(), result.message);
    } else {
        warn!("upload to {} failed: {}", target_dir.display(), result.message);
    }

    Response::html(result_page(&result, request.header("referer")))
}

/// Destino del enlace "back": el `Referer` si es un path o una URL http(s),
/// si no `/`
fn back_link(referer: Option<&str>) -> &str {
    let is_safe = |r: &&str| {
        let lower = r.to_ascii_lowercase();
        r.starts_with('/') || lower.starts_with("http://") || lower.starts_with("https://")
    };
    referer.map(str::trim).filter(is_safe).unwrap_or("/")
}

/// Página de resultado con el mensaje y un enlace de vuelta
pub fn result_page(result: &UploadResult, referer: Option<&str>) -> String {
    let outcome = if result.success { "Success:" } else { "Failed:" };
    let back = back_link(referer);

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n<meta charset=\"utf-8\">\n<title>Upload Result Page</title>\n</head>\n\
         <body>\n\
         <h2>Upload Result Page</h2>\n\
         <hr>\n\
         <strong>{}</strong> {}\n\
         <br><a href=\"{}\">back</a>\n\
         <hr>\n\
         </body>\n\
         </html>\n",
        outcome,
        encode_text(&result.message),
        encode_double_quoted_attribute(back),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusCode;
    use std::fs;
    use std::io::Cursor;

    fn page(response: &Response) -> String {
        String::from_utf8_lossy(response.body().as_bytes().unwrap()).into_owned()
    }

    fn upload_request(target: &str, filename: &str, data: &[u8], referer: Option<&str>) -> (Request, Vec<u8>) {
        let mut body = b"--XyZ\r\n".to_vec();
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n--XyZ--\r\n");

        let mut head = format!(
            "POST {} HTTP/1.0\r\nContent-Type: multipart/form-data; boundary=XyZ\r\nContent-Length: {}\r\n",
            target,
            body.len()
        );
        if let Some(r) = referer {
            head.push_str(&format!("Referer: {}\r\n", r));
        }
        head.push_str("\r\n");

        (Request::parse(head.as_bytes()).unwrap(), body)
    }

    #[test]
    fn test_upload_into_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("inbox")).unwrap();
        let config = Config {
            directory: dir.path().to_path_buf(),
            ..Config::default()
        };

        let (request, body) = upload_request("/inbox/", "a.txt", b"abc", Some("http://host/inbox/"));
        let response = post_handler(&config, &request, &mut Cursor::new(body));

        assert_eq!(response.status(), StatusCode::Ok);
        let html = page(&response);
        assert!(html.contains("<strong>Success:</strong>"));
        assert!(html.contains("<a href=\"http://host/inbox/\">back</a>"));
        assert_eq!(fs::read(dir.path().join("inbox").join("a.txt")).unwrap(), b"abc");
    }

    #[test]
    fn test_post_to_file_uses_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("existing.txt"), b"x").unwrap();
        let config = Config {
            directory: dir.path().to_path_buf(),
            ..Config::default()
        };

        let (request, body) = upload_request("/existing.txt", "new.txt", b"n", None);
        post_handler(&config, &request, &mut Cursor::new(body));

        assert!(dir.path().join("new.txt").exists());
    }

    #[test]
    fn test_failure_still_returns_200() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            directory: dir.path().to_path_buf(),
            ..Config::default()
        };

        let (request, body) = upload_request("/", "", b"", None);
        let response = post_handler(&config, &request, &mut Cursor::new(body));

        assert_eq!(response.status(), StatusCode::Ok);
        let html = page(&response);
        assert!(html.contains("<strong>Failed:</strong> no file selected"));
        assert!(html.contains("<a href=\"/\">back</a>"));
    }

    #[test]
    fn test_back_link_only_accepts_paths_and_http_urls() {
        assert_eq!(back_link(Some("/inbox/")), "/inbox/");
        assert_eq!(back_link(Some("http://host/a/")), "http://host/a/");
        assert_eq!(back_link(Some("HTTPS://host/")), "HTTPS://host/");
        assert_eq!(back_link(Some("javascript:alert(1)")), "/");
        assert_eq!(back_link(Some(" JavaScript:alert(1)")), "/");
        assert_eq!(back_link(Some("data:text/html,<b>x</b>")), "/");
        assert_eq!(back_link(Some("")), "/");
        assert_eq!(back_link(None), "/");
    }

    #[test]
    fn test_script_referer_is_not_linked() {
        let html = result_page(&UploadResult::success("ok"), Some("javascript:alert(1)"));
        assert!(html.contains("<a href=\"/\">back</a>"));
        assert!(!html.contains("javascript"));
    }

    #[test]
    fn test_result_page_escapes_message_and_referer() {
        let result = UploadResult::success("The file \"<b>.txt\" was uploaded successfully");
        let html = result_page(&result, Some("/\"><script>"));

        assert!(html.contains("&lt;b&gt;.txt"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("\"><"));
    }
}
