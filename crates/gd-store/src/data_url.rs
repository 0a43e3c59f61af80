//! `data:<media-type>;base64,<payload>` encoding for attachment exports.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub fn encode(media_type: &str, bytes: &[u8]) -> String {
    let payload = STANDARD.encode(bytes);
    if media_type.is_empty() {
        return format!("data:{};base64,{payload}", mime::APPLICATION_OCTET_STREAM);
    }
    format!("data:{media_type};base64,{payload}")
}
