use crate::workflow::config::ResponseMode;
use bytes::Buf;
use futures::{pin_mut, TryStreamExt};
use std::collections::HashMap;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use warp::multipart::{FormData, Part};

const VIDEO_FIELD: &str = "video";
const NUMERIC_FIELDS: [&str; 3] = ["x", "y", "pixel_to_meter"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No video file provided")]
    NoVideo,
    #[error("No selected video file")]
    NoFilename,
    #[error("Coordinates not provided")]
    MissingCoordinates,
    #[error("Invalid coordinates")]
    InvalidCoordinates,
    #[error("Pixel to meter ratio not provided")]
    MissingScale,
    #[error("Invalid pixel to meter ratio")]
    InvalidScale,
    #[error("Malformed multipart body")]
    Malformed(#[source] warp::Error),
    #[error("could not save upload: {0}")]
    Scratch(#[from] std::io::Error),
}

impl UploadError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, UploadError::Scratch(_))
    }
}

/// Validated upload. The video lives in a scratch file removed on drop.
#[derive(Debug)]
pub struct UploadForm {
    pub video: NamedTempFile,
    pub x: f64,
    pub y: f64,
    pub pixel_to_meter: Option<f64>,
}

enum VideoPart {
    Unnamed,
    Saved(NamedTempFile),
}

fn scratch_suffix(filename: &str) -> String {
    match Path::new(filename).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => format!(".{}", ext),
        _ => ".mov".to_string(),
    }
}

async fn save_part(part: Part, filename: &str) -> Result<NamedTempFile, UploadError> {
    let scratch = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&scratch_suffix(filename))
        .tempfile()?;
    let mut file = tokio::fs::File::from_std(scratch.as_file().try_clone()?);
    let stream = part.stream();
    pin_mut!(stream);
    while let Some(mut chunk) = stream.try_next().await.map_err(UploadError::Malformed)? {
        file.write_all_buf(&mut chunk).await?;
    }
    file.flush().await?;
    Ok(scratch)
}

async fn read_text(part: Part) -> Result<String, UploadError> {
    let mut text = Vec::new();
    let stream = part.stream();
    pin_mut!(stream);
    while let Some(mut chunk) = stream.try_next().await.map_err(UploadError::Malformed)? {
        while chunk.has_remaining() {
            let bytes = chunk.chunk();
            let len = bytes.len();
            text.extend_from_slice(bytes);
            chunk.advance(len);
        }
    }
    Ok(String::from_utf8_lossy(&text).trim().to_string())
}

async fn discard(part: Part) -> Result<(), UploadError> {
    part.stream()
        .try_for_each(|_| async { Ok(()) })
        .await
        .map_err(UploadError::Malformed)
}

fn field<'a>(fields: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok()
}

/// Reads the multipart body and validates it in the order callers expect:
/// video part, filename, coordinates, then the pixel to meter ratio.
pub async fn read_upload(form: FormData, mode: ResponseMode) -> Result<UploadForm, UploadError> {
    pin_mut!(form);
    let mut video: Option<VideoPart> = None;
    let mut fields: HashMap<String, String> = HashMap::new();

    while let Some(part) = form.try_next().await.map_err(UploadError::Malformed)? {
        let name = part.name().to_string();
        // A part without a filename parameter is a plain field, not a file.
        let filename = part.filename().map(str::to_string);
        match filename {
            Some(filename) if name == VIDEO_FIELD && video.is_none() => {
                video = Some(if filename.is_empty() {
                    discard(part).await?;
                    VideoPart::Unnamed
                } else {
                    VideoPart::Saved(save_part(part, &filename).await?)
                });
            }
            _ if NUMERIC_FIELDS.contains(&name.as_str()) => {
                let text = read_text(part).await?;
                fields.entry(name).or_insert(text);
            }
            _ => discard(part).await?,
        }
    }

    let video = match video {
        None => return Err(UploadError::NoVideo),
        Some(VideoPart::Unnamed) => return Err(UploadError::NoFilename),
        Some(VideoPart::Saved(file)) => file,
    };

    let (Some(x), Some(y)) = (field(&fields, "x"), field(&fields, "y")) else {
        return Err(UploadError::MissingCoordinates);
    };
    let (Some(x), Some(y)) = (parse_number(x), parse_number(y)) else {
        return Err(UploadError::InvalidCoordinates);
    };

    let pixel_to_meter = match mode {
        ResponseMode::Raw => None,
        ResponseMode::Kinematics => {
            let text = field(&fields, "pixel_to_meter").ok_or(UploadError::MissingScale)?;
            Some(parse_number(text).ok_or(UploadError::InvalidScale)?)
        }
    };

    Ok(UploadForm {
        video,
        x,
        y,
        pixel_to_meter,
    })
}
