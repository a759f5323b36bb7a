use framereview_shared::comment::sort_by_time;
use framereview_shared::{Annotation, AnnotationModel, Author, Comment, CommentId, CommentPatch, NewComment};

use crate::state::Review;

pub const MAX_COMMENTS: usize = 5000;
pub const MAX_TEXT_CHARS: usize = 4000;
pub const MAX_LINK_CHARS: usize = 2048;
pub const MAX_ANNOTATIONS: usize = 500;
const MAX_AUTHOR_NAME_CHARS: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommentError {
    #[error("comment text is empty")]
    EmptyText,
    #[error("comment time must be a finite, non-negative number of seconds")]
    InvalidTime,
    #[error("comment {0} not found")]
    NotFound(CommentId),
    #[error("review already holds {MAX_COMMENTS} comments")]
    TooMany,
}

pub fn list_comments(review: &Review) -> Vec<Comment> {
    let mut comments = review.data.comments.clone();
    sort_by_time(&mut comments);
    comments
}

pub fn create_comment(review: &mut Review, new: NewComment) -> Result<Comment, CommentError> {
    if review.data.comments.len() >= MAX_COMMENTS {
        return Err(CommentError::TooMany);
    }
    let new = sanitize_new_comment(new)?;
    let id = review.data.allocate_id();
    let comment = Comment::from_new(id, new);
    review.data.comments.push(comment.clone());
    review.dirty = true;
    tracing::debug!(id = %comment.id, kind = comment.kind.as_str(), "comment created");
    Ok(comment)
}

pub fn update_comment(review: &mut Review, id: CommentId, patch: CommentPatch) -> Result<Comment, CommentError> {
    let patch = sanitize_patch(patch)?;
    let comment = review
        .data
        .comments
        .iter_mut()
        .find(|comment| comment.id == id)
        .ok_or(CommentError::NotFound(id))?;
    comment.apply(patch);
    let updated = comment.clone();
    review.dirty = true;
    Ok(updated)
}

pub fn delete_comment(review: &mut Review, id: CommentId) -> Result<Comment, CommentError> {
    let index = review
        .data
        .comments
        .iter()
        .position(|comment| comment.id == id)
        .ok_or(CommentError::NotFound(id))?;
    let removed = review.data.comments.remove(index);
    review.dirty = true;
    tracing::debug!(id = %id, "comment deleted");
    Ok(removed)
}

/// Applied to reviews read back from storage; drops entries that could not
/// have been created through the API.
pub fn sanitize_comments(comments: Vec<Comment>) -> Vec<Comment> {
    comments.into_iter().filter_map(sanitize_stored).collect()
}

fn sanitize_stored(mut comment: Comment) -> Option<Comment> {
    sanitize_time(comment.time).ok()?;
    comment.text = sanitize_text(&comment.text).ok()?;
    comment.link = sanitize_link(comment.link);
    (comment.x, comment.y) = sanitize_position(comment.x, comment.y);
    comment.annotations = sanitize_annotations(comment.annotations);
    Some(comment)
}

fn sanitize_new_comment(mut new: NewComment) -> Result<NewComment, CommentError> {
    new.time = sanitize_time(new.time)?;
    new.text = sanitize_text(&new.text)?;
    new.link = sanitize_link(new.link);
    (new.x, new.y) = sanitize_position(new.x, new.y);
    new.author = Some(sanitize_author(new.author));
    new.annotations = sanitize_annotations(new.annotations);
    Ok(new)
}

fn sanitize_patch(mut patch: CommentPatch) -> Result<CommentPatch, CommentError> {
    if let Some(text) = patch.text.take() {
        patch.text = Some(sanitize_text(&text)?);
    }
    // An empty link is kept as is: it asks for the link to be removed.
    patch.link = patch
        .link
        .map(|link| truncate_chars(link.trim(), MAX_LINK_CHARS));
    patch.annotations = patch.annotations.map(sanitize_annotations);
    Ok(patch)
}

fn sanitize_time(time: f64) -> Result<f64, CommentError> {
    if time.is_finite() && time >= 0.0 {
        Ok(time)
    } else {
        Err(CommentError::InvalidTime)
    }
}

fn sanitize_text(text: &str) -> Result<String, CommentError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CommentError::EmptyText);
    }
    Ok(truncate_chars(text, MAX_TEXT_CHARS))
}

fn sanitize_link(link: Option<String>) -> Option<String> {
    let link = link?;
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    Some(truncate_chars(link, MAX_LINK_CHARS))
}

/// A pin needs both coordinates; a lone or non-finite one is dropped.
fn sanitize_position(x: Option<f64>, y: Option<f64>) -> (Option<f64>, Option<f64>) {
    match (x, y) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => {
            (Some(x.clamp(0.0, 100.0)), Some(y.clamp(0.0, 100.0)))
        }
        _ => (None, None),
    }
}

fn sanitize_author(author: Option<Author>) -> Author {
    let Some(author) = author else {
        return Author::default();
    };
    let name = truncate_chars(author.name.trim(), MAX_AUTHOR_NAME_CHARS);
    Author {
        avatar: truncate_chars(author.avatar.trim(), MAX_LINK_CHARS),
        ..Author::named(&name)
    }
}

/// Runs the set through the same filter the canvas applies on load, then caps
/// its length.
fn sanitize_annotations(annotations: Vec<Annotation>) -> Vec<Annotation> {
    if annotations.is_empty() {
        return annotations;
    }
    let mut kept = AnnotationModel::from_annotations(annotations).to_list();
    kept.truncate(MAX_ANNOTATIONS);
    kept
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
