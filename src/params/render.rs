//! Bake (offline export) configuration.

/// Configuration for baking one or more frames to disk
#[derive(Debug, Clone)]
pub struct BakeConfig {
    /// Output directory for the exported maps
    pub output_dir: String,

    /// Number of frames to evaluate
    pub frame_count: usize,

    /// Simulation time of the first frame (seconds, before time scaling)
    pub start_time_s: f32,

    /// Wall-clock spacing between frames (seconds)
    /// 1/30 = 30 FPS sequence
    pub frame_interval_s: f32,

    /// Multiplier from wall-clock time to simulation time
    pub time_scale: f32,

    /// Normal tilt multiplier passed to the normal pass
    pub normal_strength: f32,

    /// Also export spectrum, twiddle and inverse-FFT debug images
    pub write_debug_taps: bool,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            output_dir: "bake".to_string(),
            frame_count: 1,
            start_time_s: 0.0,
            frame_interval_s: 1.0 / 30.0,
            time_scale: 1.0,
            normal_strength: 1.0,
            write_debug_taps: false,
        }
    }
}

impl BakeConfig {
    /// Simulation timestamp handed to the pipeline for a frame
    pub fn frame_time(&self, frame: usize) -> f32 {
        (self.start_time_s + frame as f32 * self.frame_interval_s) * self.time_scale
    }

    /// Height map path
    pub fn height_path(&self, frame: usize) -> String {
        format!("{}/height_{:05}.png", self.output_dir, frame)
    }

    /// Normal map path
    pub fn normal_path(&self, frame: usize) -> String {
        format!("{}/normal_{:05}.png", self.output_dir, frame)
    }

    /// Full-precision displacement path
    pub fn displacement_path(&self, frame: usize) -> String {
        format!("{}/displacement_{:05}.exr", self.output_dir, frame)
    }

    /// Debug tap directory
    pub fn debug_dir(&self) -> String {
        format!("{}/debug", self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_time_scaling() {
        let config = BakeConfig {
            start_time_s: 1.0,
            frame_interval_s: 0.5,
            time_scale: 2.0,
            ..Default::default()
        };

        assert_eq!(config.frame_time(0), 2.0);
        assert_eq!(config.frame_time(2), 4.0);
    }

    #[test]
    fn test_paths() {
        let config = BakeConfig::default();
        assert_eq!(config.height_path(3), "bake/height_00003.png");
        assert_eq!(config.debug_dir(), "bake/debug");
    }
}
