//! Assembly request parameters.

use crate::color::BackgroundColor;

use super::PipelineError;

/// Largest accepted grid edge, in tiles.
pub const MAX_GRID_SIZE: u32 = 128;

/// Largest accepted border trim, in pixels.
pub const MAX_TRIM_PIXELS: u32 = 32;

/// Largest accepted preview tile edge, in pixels.
pub const MAX_PREVIEW_TILE_SIZE: u32 = 4096;

/// Preview tile edge used when none is configured.
pub const DEFAULT_PREVIEW_TILE_SIZE: u32 = 128;

/// Parameters for one assembly or preview.
///
/// Bounds are checked by [`AssemblyRequest::validate`] before any file is
/// touched.
///
/// # Example
///
/// ```
/// use layerstitch::pipeline::AssemblyRequest;
///
/// let request = AssemblyRequest::new(8, "S").with_trim(16);
/// assert!(request.validate().is_ok());
/// assert!(AssemblyRequest::new(0, "S").validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRequest {
    /// Tiles along each canvas edge (1..=128)
    pub grid_size: u32,
    /// Pixels cropped from every tile edge (0..=32)
    pub trim_pixels: u32,
    /// Filename tag selecting the layer
    pub prefix: String,
    /// Fill for cells without a tile
    pub background: BackgroundColor,
    /// Square tile edge for previews (1..=4096)
    pub preview_tile_size: Option<u32>,
}

impl AssemblyRequest {
    /// Create a request with no trim, a black background and no preview size.
    pub fn new(grid_size: u32, prefix: impl Into<String>) -> Self {
        Self {
            grid_size,
            trim_pixels: 0,
            prefix: prefix.into(),
            background: BackgroundColor::default(),
            preview_tile_size: None,
        }
    }

    pub fn with_trim(mut self, trim_pixels: u32) -> Self {
        self.trim_pixels = trim_pixels;
        self
    }

    pub fn with_background(mut self, background: BackgroundColor) -> Self {
        self.background = background;
        self
    }

    pub fn with_preview_tile_size(mut self, size: u32) -> Self {
        self.preview_tile_size = Some(size);
        self
    }

    /// Preview tile edge, falling back to [`DEFAULT_PREVIEW_TILE_SIZE`].
    pub fn preview_size_or_default(&self) -> u32 {
        self.preview_tile_size.unwrap_or(DEFAULT_PREVIEW_TILE_SIZE)
    }

    /// Check all bounds.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(1..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(PipelineError::InvalidRequest(format!(
                "grid size must be between 1 and {}, got {}",
                MAX_GRID_SIZE, self.grid_size
            )));
        }
        if self.trim_pixels > MAX_TRIM_PIXELS {
            return Err(PipelineError::InvalidRequest(format!(
                "trim pixels must be at most {}, got {}",
                MAX_TRIM_PIXELS, self.trim_pixels
            )));
        }
        if self.prefix.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "prefix must not be empty".to_string(),
            ));
        }
        if let Some(size) = self.preview_tile_size {
            if !(1..=MAX_PREVIEW_TILE_SIZE).contains(&size) {
                return Err(PipelineError::InvalidRequest(format!(
                    "preview tile size must be between 1 and {}, got {}",
                    MAX_PREVIEW_TILE_SIZE, size
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_accepted() {
        assert!(AssemblyRequest::new(1, "S").validate().is_ok());
        assert!(AssemblyRequest::new(128, "S").with_trim(32).validate().is_ok());
        assert!(AssemblyRequest::new(4, "M")
            .with_preview_tile_size(4096)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_grid_size_bounds() {
        assert!(AssemblyRequest::new(0, "S").validate().is_err());
        assert!(AssemblyRequest::new(129, "S").validate().is_err());
    }

    #[test]
    fn test_trim_bound() {
        let err = AssemblyRequest::new(2, "S").with_trim(33).validate().unwrap_err();
        assert!(err.to_string().contains("trim"));
    }

    #[test]
    fn test_preview_bounds() {
        assert!(AssemblyRequest::new(2, "S")
            .with_preview_tile_size(0)
            .validate()
            .is_err());
        assert!(AssemblyRequest::new(2, "S")
            .with_preview_tile_size(4097)
            .validate()
            .is_err());
    }

    #[test]
    fn test_empty_prefix_rejected() {
        assert!(AssemblyRequest::new(2, "").validate().is_err());
    }

    #[test]
    fn test_preview_default() {
        assert_eq!(AssemblyRequest::new(2, "S").preview_size_or_default(), 128);
        assert_eq!(
            AssemblyRequest::new(2, "S")
                .with_preview_tile_size(64)
                .preview_size_or_default(),
            64
        );
    }
}
