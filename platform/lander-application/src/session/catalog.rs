use lander_domain::value_objects::video::VideoDescriptor;

/// Weights and video listings as last fetched from the server, plus the
/// local selection state over them.
#[derive(Debug, Default)]
pub struct AssetCatalog {
    weights: Vec<String>,
    selected_weights: String,
    videos: Vec<VideoDescriptor>,
    previewed: Option<String>,
}

impl AssetCatalog {
    pub fn weights(&self) -> &[String] {
        &self.weights
    }

    /// Empty when nothing is selected.
    pub fn selected_weights(&self) -> &str {
        &self.selected_weights
    }

    pub fn videos(&self) -> &[VideoDescriptor] {
        &self.videos
    }

    pub fn replace_weights(&mut self, weights: Vec<String>) {
        if self.selected_weights.is_empty() {
            if let Some(first) = weights.first() {
                self.selected_weights = first.clone();
            }
        }
        self.weights = weights;
    }

    pub fn select_next_weights(&mut self) {
        self.step_weights(1);
    }

    pub fn select_prev_weights(&mut self) {
        self.step_weights(-1);
    }

    fn step_weights(&mut self, delta: isize) {
        if self.weights.is_empty() {
            return;
        }
        let current = self
            .weights
            .iter()
            .position(|w| *w == self.selected_weights);
        let next = match current {
            Some(idx) => wrap(idx, delta, self.weights.len()),
            None => 0,
        };
        self.selected_weights = self.weights[next].clone();
    }

    pub fn replace_videos(&mut self, videos: Vec<VideoDescriptor>) {
        let keep = self
            .previewed
            .as_ref()
            .is_some_and(|name| videos.iter().any(|v| &v.name == name));
        if !keep {
            self.previewed = videos.first().map(|v| v.name.clone());
        }
        self.videos = videos;
    }

    /// First entry unless the user moved the preview.
    pub fn previewed_video(&self) -> Option<&VideoDescriptor> {
        let name = self.previewed.as_ref()?;
        self.videos.iter().find(|v| &v.name == name)
    }

    pub fn previewed_index(&self) -> Option<usize> {
        let name = self.previewed.as_ref()?;
        self.videos.iter().position(|v| &v.name == name)
    }

    pub fn preview_next(&mut self) {
        self.step_preview(1);
    }

    pub fn preview_prev(&mut self) {
        self.step_preview(-1);
    }

    fn step_preview(&mut self, delta: isize) {
        if self.videos.is_empty() {
            return;
        }
        let next = match self.previewed_index() {
            Some(idx) => wrap(idx, delta, self.videos.len()),
            None => 0,
        };
        self.previewed = Some(self.videos[next].name.clone());
    }
}

fn wrap(idx: usize, delta: isize, len: usize) -> usize {
    let len = len as isize;
    (((idx as isize + delta) % len + len) % len) as usize
}

#[cfg(test)]
mod tests {
    use super::AssetCatalog;
    use lander_domain::value_objects::video::VideoDescriptor;

    fn video(name: &str) -> VideoDescriptor {
        VideoDescriptor {
            name: name.to_string(),
            url: format!("/videos/{name}"),
            size_bytes: 1024,
            modified: 1_700_000_000.0,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_weights_list_auto_selects() {
        let mut catalog = AssetCatalog::default();
        catalog.replace_weights(Vec::new());
        assert_eq!(catalog.selected_weights(), "");

        catalog.replace_weights(names(&["a.pth", "b.pth"]));
        assert_eq!(catalog.selected_weights(), "a.pth");

        catalog.select_next_weights();
        catalog.replace_weights(names(&["c.pth", "a.pth", "b.pth"]));
        assert_eq!(catalog.selected_weights(), "b.pth");
    }

    #[test]
    fn weights_selection_wraps() {
        let mut catalog = AssetCatalog::default();
        catalog.replace_weights(names(&["a.pth", "b.pth", "c.pth"]));
        catalog.select_prev_weights();
        assert_eq!(catalog.selected_weights(), "c.pth");
        catalog.select_next_weights();
        assert_eq!(catalog.selected_weights(), "a.pth");
        catalog.select_next_weights();
        assert_eq!(catalog.selected_weights(), "b.pth");
    }

    #[test]
    fn preview_defaults_to_first_and_survives_refresh() {
        let mut catalog = AssetCatalog::default();
        assert!(catalog.previewed_video().is_none());

        catalog.replace_videos(vec![video("ep1.mp4"), video("ep2.mp4")]);
        assert_eq!(catalog.previewed_video().map(|v| v.name.as_str()), Some("ep1.mp4"));

        catalog.preview_next();
        catalog.replace_videos(vec![video("ep3.mp4"), video("ep1.mp4"), video("ep2.mp4")]);
        assert_eq!(catalog.previewed_video().map(|v| v.name.as_str()), Some("ep2.mp4"));
        assert_eq!(catalog.previewed_index(), Some(2));

        catalog.replace_videos(vec![video("ep9.mp4")]);
        assert_eq!(catalog.previewed_video().map(|v| v.name.as_str()), Some("ep9.mp4"));
    }

    #[test]
    fn preview_wraps_backwards() {
        let mut catalog = AssetCatalog::default();
        catalog.replace_videos(vec![video("a.mp4"), video("b.mp4")]);
        catalog.preview_prev();
        assert_eq!(catalog.previewed_index(), Some(1));
    }
}
