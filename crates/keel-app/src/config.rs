//! Engine configuration.

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Window title, also reported to Vulkan as the application name.
    pub title: String,
    /// Application version reported to Vulkan.
    pub version: (u32, u32, u32),
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// How many frames may be recorded ahead of the GPU.
    pub frames_in_flight: usize,
    /// Enable Vulkan diagnostic layers (default: debug builds only).
    pub diagnostics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Keel Engine".to_string(),
            version: (0, 1, 0),
            width: 1280,
            height: 720,
            frames_in_flight: 2,
            diagnostics: cfg!(debug_assertions),
        }
    }
}

impl EngineConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the application version.
    pub fn with_version(mut self, version: (u32, u32, u32)) -> Self {
        self.version = version;
        self
    }

    /// Set how many frames may be in flight at once.
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Enable or disable the diagnostic layers.
    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = EngineConfig::default();
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert_eq!(config.frames_in_flight, 2);
    }

    #[test]
    fn builder_chains() {
        let config = EngineConfig::new("Test")
            .with_size(640, 480)
            .with_version((1, 2, 3))
            .with_frames_in_flight(3)
            .with_diagnostics(false);

        assert_eq!(config.title, "Test");
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 480);
        assert_eq!(config.version, (1, 2, 3));
        assert_eq!(config.frames_in_flight, 3);
        assert!(!config.diagnostics);
    }
}
