use web_sys::HtmlVideoElement;

use framereview_shared::VideoSource;

/// The review `<video>` element.
#[derive(Clone)]
pub struct HtmlVideoSource {
    element: HtmlVideoElement,
}

impl HtmlVideoSource {
    pub fn new(element: HtmlVideoElement) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &HtmlVideoElement {
        &self.element
    }
}

impl VideoSource for HtmlVideoSource {
    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn duration(&self) -> f64 {
        self.element.duration()
    }

    fn is_paused(&self) -> bool {
        self.element.paused()
    }

    fn play(&mut self) {
        // Autoplay refusals surface as a rejected promise; the UI stays paused.
        let _ = self.element.play();
    }

    fn pause(&mut self) {
        let _ = self.element.pause();
    }

    fn seek(&mut self, time: f64) {
        self.element.set_current_time(time);
    }
}
