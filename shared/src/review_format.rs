use bincode::{Decode, Encode};

use crate::comment::{Comment, CommentId};

pub const REVIEW_FILE_MAGIC: [u8; 4] = *b"FRVW";
pub const REVIEW_FILE_VERSION: u32 = 1;
const REVIEW_HEADER_LEN: usize = REVIEW_FILE_MAGIC.len() + std::mem::size_of::<u32>();

/// Persisted state of one video's review.
#[derive(Clone, Debug, Default, Encode, Decode, PartialEq)]
pub struct ReviewFileData {
    pub comments: Vec<Comment>,
    pub next_comment_id: u64,
}

impl ReviewFileData {
    /// Hands out the next comment id, skipping any already in use.
    pub fn allocate_id(&mut self) -> CommentId {
        let floor = self
            .comments
            .iter()
            .map(|comment| comment.id.get() + 1)
            .max()
            .unwrap_or(1);
        let id = self.next_comment_id.max(floor).max(1);
        self.next_comment_id = id + 1;
        CommentId::new(id)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReviewFileError {
    #[error("unsupported review file version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid review file")]
    InvalidData,
    #[error("failed to encode review file: {0}")]
    Encode(String),
}

pub fn encode_review_file(data: &ReviewFileData) -> Result<Vec<u8>, ReviewFileError> {
    let body = bincode::encode_to_vec(data, bincode::config::standard())
        .map_err(|err| ReviewFileError::Encode(err.to_string()))?;
    let mut payload = Vec::with_capacity(REVIEW_HEADER_LEN + body.len());
    payload.extend_from_slice(&REVIEW_FILE_MAGIC);
    payload.extend_from_slice(&REVIEW_FILE_VERSION.to_le_bytes());
    payload.extend_from_slice(&body);
    Ok(payload)
}

pub fn decode_review_file(payload: &[u8]) -> Result<ReviewFileData, ReviewFileError> {
    if payload.len() < REVIEW_HEADER_LEN || !payload.starts_with(&REVIEW_FILE_MAGIC) {
        return Err(ReviewFileError::InvalidData);
    }
    let version = u32::from_le_bytes(
        payload[REVIEW_FILE_MAGIC.len()..REVIEW_HEADER_LEN]
            .try_into()
            .map_err(|_| ReviewFileError::InvalidData)?,
    );
    let body = &payload[REVIEW_HEADER_LEN..];
    match version {
        1 => bincode::decode_from_slice(body, bincode::config::standard())
            .map(|(data, _)| data)
            .map_err(|_| ReviewFileError::InvalidData),
        _ => Err(ReviewFileError::UnsupportedVersion(version)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, AnnotationId, Shape};
    use crate::comment::NewComment;
    use crate::geometry::Point;

    fn sample() -> ReviewFileData {
        let mut new = NewComment::new(3.25, "Tighten this cut");
        new.x = Some(40.0);
        new.y = Some(60.0);
        new.annotations.push(Annotation {
            id: AnnotationId::new(2),
            shape: Shape::Text {
                x: 0.4,
                y: 0.6,
                content: "here".into(),
                color: "#f472b6".into(),
                font_size: 24.0,
            },
        });
        new.annotations.push(Annotation {
            id: AnnotationId::new(3),
            shape: Shape::Freehand {
                points: vec![Point::new(0.1, 0.1), Point::new(0.2, 0.25)],
                color: "#fbbf24".into(),
            },
        });
        ReviewFileData {
            comments: vec![crate::comment::Comment::from_new(CommentId::new(1), new)],
            next_comment_id: 2,
        }
    }

    #[test]
    fn file_keeps_linked_annotations() {
        let data = sample();
        let bytes = encode_review_file(&data).unwrap();
        assert!(bytes.starts_with(b"FRVW"));
        assert_eq!(decode_review_file(&bytes).unwrap(), data);
    }

    #[test]
    fn rejects_foreign_or_future_files() {
        assert_eq!(decode_review_file(b"YBSS\x01\0\0\0"), Err(ReviewFileError::InvalidData));
        assert_eq!(decode_review_file(b"FRV"), Err(ReviewFileError::InvalidData));
        let mut bytes = encode_review_file(&sample()).unwrap();
        bytes[4] = 9;
        assert_eq!(decode_review_file(&bytes), Err(ReviewFileError::UnsupportedVersion(9)));
    }

    #[test]
    fn ids_never_collide() {
        let mut data = sample();
        data.next_comment_id = 0;
        assert_eq!(data.allocate_id(), CommentId::new(2));
        assert_eq!(data.allocate_id(), CommentId::new(3));
    }
}
