//! Object storage key layout.
//!
//! Keys are namespaced by purpose and owning entity:
//!
//! ```text
//! previews/{beat_id}/{file}
//! covers/{beat_id}/{file}
//! beats/{beat_id}/{mp3|wav|stems}/{file}
//! contracts/{order_number}/{beat_id}.pdf
//! ```

use crate::licensing::{FileKind, LicenseTier};
use crate::types::DbId;

/// Replace anything outside `[A-Za-z0-9._-]` with `_` and cap the length.
pub fn sanitize_filename(name: &str) -> String {
    const MAX_LEN: usize = 120;
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_LEN)
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn preview_key(beat_id: DbId, filename: &str) -> String {
    format!("previews/{beat_id}/{}", sanitize_filename(filename))
}

pub fn cover_key(beat_id: DbId, filename: &str) -> String {
    format!("covers/{beat_id}/{}", sanitize_filename(filename))
}

/// Key for a full-quality beat file. `kind` must not be [`FileKind::Contract`].
pub fn beat_file_key(beat_id: DbId, kind: FileKind, filename: &str) -> String {
    format!(
        "beats/{beat_id}/{}/{}",
        kind.as_str(),
        sanitize_filename(filename)
    )
}

pub fn contract_key(order_number: &str, beat_id: DbId) -> String {
    format!(
        "contracts/{}/{beat_id}.pdf",
        sanitize_filename(order_number)
    )
}

/// Filename offered to the browser, e.g. `Night_Drive-standard.wav`.
pub fn download_filename(beat_title: &str, tier: LicenseTier, kind: FileKind) -> String {
    let stem = match kind {
        FileKind::Contract => format!("{beat_title}-{tier}-license"),
        _ => format!("{beat_title}-{tier}"),
    };
    format!("{}.{}", sanitize_filename(&stem), kind.extension())
}

/// `Content-Disposition` value that forces a download instead of inline playback.
pub fn attachment_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", sanitize_filename(filename))
}
