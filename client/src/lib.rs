mod app;
mod comments;
mod dom;
mod net;
mod persistence;
mod surface;
mod video;

pub use app::run;
