//! `multipart/form-data` decoding on top of `multer`.

use std::convert::Infallible;

use bytes::Bytes;
use indexmap::IndexMap;

use super::{ParseError, UploadedFile};

/// Extract the boundary parameter from a multipart content type.
pub fn boundary(content_type: &str) -> Option<String> {
    multer::parse_boundary(content_type)
        .ok()
        .filter(|b| !b.is_empty())
}

/// Split an already size-capped multipart body into plain fields and
/// uploaded files. Repeated field names keep the last value.
pub async fn parse(
    body: Bytes,
    boundary: &str,
) -> Result<(IndexMap<String, String>, Vec<UploadedFile>), ParseError> {
    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut fields = IndexMap::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string).ok_or_else(|| {
            ParseError::MalformedMultipart("part is missing a Content-Disposition name".to_string())
        })?;
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|m| m.to_string());
        let content = field.bytes().await.map_err(malformed)?;

        match filename {
            Some(filename) => files.push(UploadedFile {
                name,
                filename,
                content_type,
                content,
            }),
            None => {
                let value = String::from_utf8(content.to_vec()).map_err(|_| {
                    ParseError::InvalidEncoding(format!("field '{name}' is not UTF-8"))
                })?;
                fields.insert(name, value);
            }
        }
    }

    Ok((fields, files))
}

fn malformed(e: multer::Error) -> ParseError {
    ParseError::MalformedMultipart(e.to_string())
}
