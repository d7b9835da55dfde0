//! Request-body helpers: form fields, data-URL frames, and staged uploads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::async_trait;
use axum::extract::multipart::Field;
use axum::extract::{Form, FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::RgbImage;
use tokio::io::AsyncWriteExt;

use repsense_common::error::{RepsenseError, RepsenseResult};

use crate::error::ApiError;

/// Text form fields from either `application/x-www-form-urlencoded` or
/// `multipart/form-data` bodies.
#[derive(Debug, Clone, Default)]
pub struct FormFields(pub HashMap<String, String>);

impl FormFields {
    /// A field's value, treating empty strings as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;
            return Ok(Self(fields));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;
        let mut fields = HashMap::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
            fields.insert(name, value);
        }
        Ok(Self(fields))
    }
}

/// Decode a frame sent as a data URL (`data:image/jpeg;base64,...`) or as
/// bare base64.
pub fn decode_frame(data: &str) -> RepsenseResult<RgbImage> {
    let payload = match data.split_once(',') {
        Some((header, payload)) if header.starts_with("data:") => payload,
        Some(_) => {
            return Err(RepsenseError::input_unreadable(
                "Frame is not a base64 data URL",
            ))
        }
        None => data,
    };
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| RepsenseError::input_unreadable(format!("Invalid base64 frame: {e}")))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| RepsenseError::input_unreadable(format!("Undecodable frame image: {e}")))?;
    Ok(image.to_rgb8())
}

/// Reduce an uploaded filename to a safe single path component.
///
/// Directory parts are stripped and anything outside `[A-Za-z0-9._-]`
/// becomes `_`. Leading dots are removed so the result is never hidden or a
/// relative path. Returns `None` when nothing usable remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim_matches('_');
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// An uploaded file staged on disk, deleted when dropped.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    bytes: u64,
}

impl StagedUpload {
    /// Stream a multipart field into `dir`.
    pub async fn save(field: Field<'_>, dir: &Path) -> Result<Self, ApiError> {
        let original = field.file_name().unwrap_or_default().to_string();
        let name = sanitize_filename(&original).unwrap_or_else(|| "upload.mp4".to_string());
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ApiError::from(RepsenseError::from(e)))?;
        let path = dir.join(format!("{}-{name}", uuid::Uuid::new_v4().simple()));

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ApiError::from(RepsenseError::from(e)))?;
        // From here on the guard owns cleanup, including on early return.
        let mut staged = Self { path, bytes: 0 };

        let mut field = field;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| ApiError::from(RepsenseError::from(e)))?;
            staged.bytes += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| ApiError::from(RepsenseError::from(e)))?;

        tracing::info!(
            path = %staged.path.display(),
            original_name = %original,
            bytes = staged.bytes,
            "Video saved"
        );
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Error removing upload")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("workout.mp4").as_deref(), Some("workout.mp4"));
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\my clip (1).mov").as_deref(),
            Some("my_clip__1_.mov")
        );
        assert_eq!(sanitize_filename(".hidden").as_deref(), Some("hidden"));
        assert_eq!(sanitize_filename("..").as_deref(), None);
        assert_eq!(sanitize_filename("").as_deref(), None);
    }

    fn png_base64(width: u32, height: u32) -> String {
        let mut bytes = Vec::new();
        RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        BASE64.encode(bytes)
    }

    #[test]
    fn test_decode_data_url_and_bare_base64() {
        let encoded = png_base64(6, 4);
        let frame = decode_frame(&format!("data:image/png;base64,{encoded}")).unwrap();
        assert_eq!(frame.dimensions(), (6, 4));
        assert_eq!(decode_frame(&encoded).unwrap().dimensions(), (6, 4));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_frame("data:image/png;base64,!!!"),
            Err(RepsenseError::InputUnreadable { .. })
        ));
        assert!(matches!(
            decode_frame(&BASE64.encode(b"not an image")),
            Err(RepsenseError::InputUnreadable { .. })
        ));
        assert!(decode_frame("foo,bar").is_err());
    }

    #[test]
    fn test_form_fields_treat_blank_as_missing() {
        let mut map = HashMap::new();
        map.insert("session_id".to_string(), "  ".to_string());
        map.insert("weight".to_string(), "80".to_string());
        let fields = FormFields(map);
        assert_eq!(fields.get("session_id"), None);
        assert_eq!(fields.get("weight"), Some("80"));
        assert_eq!(fields.get("frame"), None);
    }
}
