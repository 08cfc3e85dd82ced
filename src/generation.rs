//! Client for the image generation endpoint.

use std::time::Duration;

use image::RgbaImage;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::compositor::MaskEncoding;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("response is not an image: {0}")]
    Decode(#[from] image::ImageError),
}

/// One encoded request image plus the instruction for the region it marks.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub image: Vec<u8>,
    pub encoding: MaskEncoding,
    pub prompt: String,
}

pub trait ImageGenerator: Send {
    fn generate(&self, request: &GenerationRequest) -> Result<RgbaImage, GenerationError>;
}

pub struct HttpGenerator {
    http: Client,
    url: String,
}

impl HttpGenerator {
    pub fn new(url: String, timeout: Duration) -> Result<Self, GenerationError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }
}

impl ImageGenerator for HttpGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<RgbaImage, GenerationError> {
        let image = Part::bytes(request.image.clone())
            .file_name(request.encoding.file_name())
            .mime_str(request.encoding.mime_type())?;
        let form = Form::new()
            .part("image", image)
            .text("prompt", request.prompt.clone());

        log::info!("POST {} ({} bytes)", self.url, request.image.len());
        let response = self.http.post(&self.url).multipart(form).send()?;
        let status = response.status();
        let body = response.bytes()?;

        if !status.is_success() {
            return Err(GenerationError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        decode_image(&body)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// The server's `{"error": "..."}` message, or the raw body when it is not JSON.
pub fn error_message(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        return parsed.error;
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        "no details".to_string()
    } else {
        text
    }
}

pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, GenerationError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgba, RgbaImage};

    use super::{decode_image, error_message, GenerationError};

    #[test]
    fn error_json_is_unwrapped() {
        assert_eq!(
            error_message(br#"{"error": "prompt is required"}"#),
            "prompt is required"
        );
    }

    #[test]
    fn non_json_error_body_is_kept_as_text() {
        assert_eq!(error_message(b"  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message(b""), "no details");
        assert_eq!(error_message(br#"{"detail": "x"}"#), r#"{"detail": "x"}"#);
    }

    #[test]
    fn png_response_decodes() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .expect("encode");

        assert_eq!(decode_image(bytes.get_ref()).expect("decode"), image);
    }

    #[test]
    fn garbage_response_is_decode_error() {
        assert!(matches!(
            decode_image(b"definitely not a png"),
            Err(GenerationError::Decode(_))
        ));
    }
}
