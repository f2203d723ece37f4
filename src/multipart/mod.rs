//! Multipart stream parsing
//!
//! MJPEG cameras serve an unbounded `multipart/x-mixed-replace` response
//! body: a sequence of parts, each its own JPEG image, separated by a
//! boundary token declared in the response's `Content-Type` header.
//!
//! ```text
//! Content-Type: multipart/x-mixed-replace; boundary=frame
//!
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: 24150\r\n
//! \r\n
//! <jpeg bytes>\r\n
//! --frame\r\n
//! ...
//! --frame--\r\n
//! ```
//!
//! [`parse_boundary`] extracts the boundary token from the declared
//! content type; [`MultipartStream`] turns any chunked byte stream plus
//! that token into an iterator of complete [`Part`]s.

pub mod stream;

pub use stream::{MultipartStream, Part, PartHeaders};

use crate::error::ProtocolError;

/// Extract the boundary token from a `Content-Type` header value.
///
/// The media type must be a multipart kind and must carry a `boundary`
/// parameter (quoted or bare, any case).
pub fn parse_boundary(content_type: &str) -> Result<String, ProtocolError> {
    let mut params = content_type.split(';');
    let media_type = params.next().unwrap_or("").trim().to_ascii_lowercase();

    if !media_type.starts_with("multipart/") {
        return Err(ProtocolError::NotMultipart(media_type));
    }

    for param in params {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("boundary") {
            let value = value.trim().trim_matches('"');
            if !value.is_empty() {
                return Ok(value.to_string());
            }
        }
    }

    Err(ProtocolError::MissingBoundary(content_type.to_string()))
}
