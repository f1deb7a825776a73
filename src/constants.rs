// --- File: constants.rs ---
// --- Global Renderer Constants ---
pub const BACKGROUND_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};
pub const WINDOW_TITLE: &str = "GeneGL";

// --- Streaming Buffers ---
// Points the vertex buffers can hold before the first growth.
pub const INITIAL_POINT_CAPACITY: usize = 1024;
pub const POSITION_FLOATS_PER_POINT: usize = 2;
pub const COLOR_FLOATS_PER_POINT: usize = 4;
// Extra floats added on growth so frequent small increases amortize.
pub const POSITION_GROWTH_SLACK: usize = 1024;
pub const COLOR_GROWTH_SLACK: usize = 2048;
// Below this many cells packing stays on the render thread.
pub const PARALLEL_PACK_THRESHOLD: usize = 16_384;

// --- Camera ---
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 100.0;
pub const SCROLL_ZOOM_RATE: f32 = 0.1;
pub const KEY_ZOOM_FACTOR: f32 = 1.10;
pub const KEY_PAN_STEP_PX: f32 = 50.0;
pub const DEFAULT_PIXEL_SCALE: u32 = 4;
pub const DEFAULT_BASE_POINT_SIZE: f32 = 6.0;
// Pixel-delta wheels (touchpads) report roughly this many pixels per line.
pub const PIXELS_PER_SCROLL_LINE: f32 = 120.0;

// --- Input ---
pub const INPUT_QUEUE_CAPACITY: usize = 256;

// --- Frame Stats ---
pub const FPS_UPDATE_INTERVAL_SECS: f64 = 1.0;
pub const MIN_FPS_ELAPSED_SECS: f64 = 1e-6;

// --- HUD (logical pixels, scaled by the window scale factor) ---
pub const HUD_PANEL_X: f32 = 10.0;
pub const HUD_PANEL_Y: f32 = 10.0;
pub const HUD_PANEL_WIDTH: f32 = 480.0;
pub const HUD_PANEL_HEIGHT: f32 = 64.0;
pub const HUD_PANEL_COLOR: [u8; 4] = [0, 0, 0, 120];
pub const HUD_TEXT_COLOR: [u8; 4] = [255, 255, 255, 255];
pub const HUD_FONT_SIZE: f32 = 20.0;
pub const HUD_TEXT_X: f32 = 20.0;
pub const HUD_LINE_BASELINES: [f32; 2] = [32.0, 56.0];
// Tried in order when no font path is configured.
pub const HUD_FONT_CANDIDATES: &[&str] = &[
    "assets/fonts/Roboto.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

// --- Demo Simulation ---
pub const DEFAULT_WORLD_WIDTH: u32 = 480;
pub const DEFAULT_WORLD_HEIGHT: u32 = 270;
// Fraction of the world height where the soil surface sits.
pub const GROUND_LEVEL_FRACTION: f32 = 0.66;
// --- End of File: constants.rs ---
