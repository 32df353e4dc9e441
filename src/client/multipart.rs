//! Minimal `multipart/form-data` encoder for the single-file upload.
//!
//! `ureq` 2 sends raw bodies only, so the document-parsing call builds its
//! body here: one part, field name `file`, the original file name, and an
//! `application/octet-stream` payload.

/// An encoded multipart body and the matching `Content-Type` header value.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Encode a single file part under `field`.
pub fn single_file(field: &str, file_name: &str, data: &[u8]) -> MultipartBody {
    let boundary = loop {
        let candidate = random_boundary();
        // The boundary must not occur inside the payload.
        if !contains(data, candidate.as_bytes()) {
            break candidate;
        }
    };
    encode(&boundary, field, file_name, data)
}

fn encode(boundary: &str, field: &str, file_name: &str, data: &[u8]) -> MultipartBody {
    let mut bytes = Vec::with_capacity(data.len() + 256);
    bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    bytes.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            escape_quoted(field),
            escape_quoted(file_name)
        )
        .as_bytes(),
    );
    bytes.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    bytes.extend_from_slice(data);
    bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    MultipartBody {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        bytes,
    }
}

fn random_boundary() -> String {
    let token: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(24)
        .collect();
    format!("----routescope{token}")
}

/// Quotes and line breaks would terminate the header parameter early.
fn escape_quoted(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '"' => "%22".to_string(),
            '\r' => "%0D".to_string(),
            '\n' => "%0A".to_string(),
            c => c.to_string(),
        })
        .collect()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
