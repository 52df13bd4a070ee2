//! Constants used throughout the application

/// Margin in pixels of the ambient screen color sample square
pub const SCREEN_SAMPLE_MARGIN: i32 = 5;

/// Width of the color-marked search area as a ratio of the frame height
pub const PANEL_SEARCH_WIDTH_RATIO: f64 = 0.65;

/// Thickness of the drawn head-direction line
pub const HEAD_LINE_THICKNESS: i32 = 2;

/// Radius of the drawn head-position marker
pub const HEAD_MARKER_RADIUS: i32 = 4;

/// Origin of the status text line
pub const STATUS_TEXT_ORIGIN: (i32, i32) = (10, 25);

/// Font scale of on-frame text
pub const STATUS_FONT_SCALE: f64 = 1.0;

/// Line spacing of the missing-background banner
pub const BANNER_LINE_SPACING: i32 = 50;

/// Default frames per second assumption for videos without metadata
pub const DEFAULT_FPS: f64 = 30.0;

/// Bounded capacity of the video reader's frame channel
pub const READER_CHANNEL_CAPACITY: usize = 4;
