pub mod annotation;
pub mod comment;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod hit;
pub mod interaction;
pub mod media;
pub mod render;
pub mod review_format;
pub mod tool;

pub use annotation::{Annotation, AnnotationId, AnnotationModel, Shape};
pub use comment::{Author, Comment, CommentId, CommentKind, CommentPatch, NewComment};
pub use config::EngineConfig;
pub use engine::{drawing_allowed, CanvasEngine, Surface};
pub use geometry::{CanvasSize, Point};
pub use interaction::{Interaction, Outcome, TextSession};
pub use media::{Asset, PresignedUpload, StepDirection, UploadRequest, VideoSource};
pub use render::{DrawCommand, Scene, StrokeStyle};
pub use tool::Tool;
