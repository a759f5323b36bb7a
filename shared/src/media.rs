//! Host collaborators around the canvas: the video element contract and the
//! asset store payloads.

use serde::{Deserialize, Serialize};

pub const FRAMES_PER_SECOND: f64 = 30.0;
pub const FRAME_DURATION: f64 = 1.0 / FRAMES_PER_SECOND;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepDirection {
    Back,
    Forward,
}

/// Playback surface the canvas is overlaid on.
pub trait VideoSource {
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn is_paused(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, time: f64);

    /// Pauses and moves one frame.
    fn step_frame(&mut self, direction: StepDirection) {
        self.pause();
        let target = stepped_time(self.current_time(), self.duration(), direction);
        self.seek(target);
    }

    fn toggle_playback(&mut self) {
        if self.is_paused() {
            self.play();
        } else {
            self.pause();
        }
    }
}

/// `current` moved by one frame, kept inside `[0, duration]`. An unknown
/// duration only bounds the lower end.
pub fn stepped_time(current: f64, duration: f64, direction: StepDirection) -> f64 {
    let current = if current.is_finite() { current } else { 0.0 };
    let delta = match direction {
        StepDirection::Back => -FRAME_DURATION,
        StepDirection::Forward => FRAME_DURATION,
    };
    let target = (current + delta).max(0.0);
    if duration.is_finite() && duration > 0.0 {
        target.min(duration)
    } else {
        target
    }
}

/// Time under a position along the timeline track, given as a fraction of
/// its width. `None` until the duration is known.
pub fn time_at_fraction(fraction: f64, duration: f64) -> Option<f64> {
    if !fraction.is_finite() || !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    Some(fraction.clamp(0.0, 1.0) * duration)
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    pub id: String,
    pub filename: String,
    /// Object key inside the store.
    pub key: String,
    /// Where the asset can be fetched from.
    pub url: String,
    pub size: u64,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl Asset {
    pub fn size_label(&self) -> String {
        format!("{:.1} KB", self.size as f64 / 1024.0)
    }
}

/// Case-insensitive filename search.
pub fn filter_assets<'a>(assets: &'a [Asset], query: &str) -> Vec<&'a Asset> {
    let query = query.trim().to_lowercase();
    assets
        .iter()
        .filter(|asset| asset.filename.to_lowercase().contains(&query))
        .collect()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PresignedUpload {
    pub url: String,
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeVideo {
        time: f64,
        duration: f64,
        paused: bool,
    }

    impl VideoSource for FakeVideo {
        fn current_time(&self) -> f64 {
            self.time
        }
        fn duration(&self) -> f64 {
            self.duration
        }
        fn is_paused(&self) -> bool {
            self.paused
        }
        fn play(&mut self) {
            self.paused = false;
        }
        fn pause(&mut self) {
            self.paused = true;
        }
        fn seek(&mut self, time: f64) {
            self.time = time;
        }
    }

    #[test]
    fn track_position_maps_onto_duration() {
        assert_eq!(time_at_fraction(0.25, 40.0), Some(10.0));
        assert_eq!(time_at_fraction(-0.2, 40.0), Some(0.0));
        assert_eq!(time_at_fraction(1.5, 40.0), Some(40.0));
        assert_eq!(time_at_fraction(0.5, f64::NAN), None);
        assert_eq!(time_at_fraction(0.5, 0.0), None);
        assert_eq!(time_at_fraction(f64::INFINITY, 40.0), None);
    }

    #[test]
    fn step_pauses_and_moves_one_frame() {
        let mut video = FakeVideo {
            time: 1.0,
            duration: 10.0,
            paused: false,
        };
        video.step_frame(StepDirection::Forward);
        assert!(video.paused);
        assert!((video.time - (1.0 + FRAME_DURATION)).abs() < 1e-12);
        video.toggle_playback();
        assert!(!video.paused);
    }

    #[test]
    fn stepping_is_clamped() {
        assert_eq!(stepped_time(0.01, 10.0, StepDirection::Back), 0.0);
        assert_eq!(stepped_time(9.99, 10.0, StepDirection::Forward), 10.0);
        assert!(stepped_time(5.0, f64::NAN, StepDirection::Forward) > 5.0);
    }

    #[test]
    fn asset_search_and_size() {
        let asset = |name: &str, size| Asset {
            id: name.into(),
            filename: name.into(),
            key: format!("uploads/{name}"),
            url: format!("/media/{name}"),
            size,
            created_at: "2024-01-01T00:00:00Z".into(),
        };
        let assets = vec![asset("Logo.png", 1024), asset("intro.mp3", 5_000_000)];
        assert_eq!(filter_assets(&assets, "LOGO").len(), 1);
        assert_eq!(filter_assets(&assets, "").len(), 2);
        assert_eq!(assets[0].size_label(), "1.0 KB");
    }

    #[test]
    fn upload_request_is_camel_case() {
        let request: UploadRequest =
            serde_json::from_str(r#"{"filename": "a.mp4", "contentType": "video/mp4"}"#).unwrap();
        assert_eq!(request.content_type, "video/mp4");
    }
}
