use crate::domain::errors::{GurlError, Result};
use hyper::body::Bytes;
use std::path::Path;

/// Resolves the request body from either literal data or a file.
///
/// Empty values count as absent. Supplying both is a usage error, and it is
/// reported before the file is touched.
pub fn resolve(data: Option<&str>, data_file: Option<&Path>) -> Result<Bytes> {
    let data = data.filter(|d| !d.is_empty());
    let data_file = data_file.filter(|p| !p.as_os_str().is_empty());

    match (data, data_file) {
        (Some(_), Some(_)) => Err(GurlError::argument(
            "--data and --data-file are mutually exclusive",
        )),
        (Some(data), None) => Ok(Bytes::copy_from_slice(data.as_bytes())),
        (None, Some(path)) => {
            let contents = std::fs::read(path).map_err(|e| GurlError::io(path, e))?;
            log::debug!("read {} byte body from {}", contents.len(), path.display());
            Ok(Bytes::from(contents))
        }
        (None, None) => Ok(Bytes::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gurl-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn literal_data_is_returned_verbatim() {
        let body = resolve(Some(r#"{"name": "user"}"#), None).unwrap();
        assert_eq!(&body[..], br#"{"name": "user"}"#);
    }

    #[test]
    fn file_contents_are_returned_verbatim() {
        let path = temp_file("payload.json", b"{\"fromfile\": true}\n");
        let body = resolve(None, Some(&path)).unwrap();
        assert_eq!(&body[..], b"{\"fromfile\": true}\n");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn empty_data_falls_through_to_file() {
        let path = temp_file("fallthrough.txt", b"hello");
        let body = resolve(Some(""), Some(&path)).unwrap();
        assert_eq!(&body[..], b"hello");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn both_sources_are_rejected_without_reading() {
        let missing = Path::new("/definitely/not/here.json");
        let err = resolve(Some("x"), Some(missing)).unwrap_err();
        assert!(matches!(err, GurlError::Argument(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let missing = Path::new("/definitely/not/here.json");
        let err = resolve(None, Some(missing)).unwrap_err();
        assert!(matches!(err, GurlError::Io { .. }));
    }

    #[test]
    fn nothing_resolves_to_empty() {
        assert!(resolve(None, None).unwrap().is_empty());
        assert!(resolve(Some(""), Some(Path::new(""))).unwrap().is_empty());
    }
}
