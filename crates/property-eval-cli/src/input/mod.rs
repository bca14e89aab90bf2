pub mod file;
pub mod stdin;

use property_eval_core::RawRequest;

/// Resolve the request from exactly one source: the `--input` file, the
/// fields given as flags, or piped stdin when neither is present.
pub fn read_request(
    path: Option<&str>,
    flags: RawRequest,
) -> Result<RawRequest, Box<dyn std::error::Error>> {
    match path {
        Some(_) if !flags.is_empty() => {
            Err("--input cannot be combined with request flags".into())
        }
        Some(path) => file::read_request(path),
        None if !flags.is_empty() => Ok(flags),
        None => stdin::read_stdin()?
            .ok_or_else(|| "--input <file.json>, stdin, or request flags required".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flags() -> RawRequest {
        let mut request = RawRequest::new();
        request.insert("property_price".into(), json!("1000000"));
        request
    }

    #[test]
    fn test_input_file_with_flags_is_rejected() {
        let err = read_request(Some("request.json"), flags()).unwrap_err();
        assert!(err.to_string().contains("cannot be combined"));
    }

    #[test]
    fn test_flags_are_used_without_reading_stdin() {
        let request = read_request(None, flags()).unwrap();
        assert_eq!(request, flags());
    }
}
