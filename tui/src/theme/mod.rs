//! Theme and Colors
//!
//! The postmuse palette. The accent violet matches the product's send
//! button; roles each get a fixed color so the transcript reads at a
//! glance.

use ratatui::style::Color;

// ============================================================================
// Brand
// ============================================================================

/// Accent violet (brand, assistant text)
pub const ACCENT_VIOLET: Color = Color::Rgb(139, 92, 246);

/// Header brand text
pub const BRAND: Color = Color::Rgb(196, 181, 253);

// ============================================================================
// Roles
// ============================================================================

/// User input green
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// Function-result blue
pub const FUNCTION_BLUE: Color = Color::Rgb(140, 180, 255);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

// ============================================================================
// UI
// ============================================================================

/// Error red (notices, failed streams)
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// Rate-limit amber
pub const RATE_LIMIT_AMBER: Color = Color::Rgb(255, 190, 90);

/// Link blue
pub const LINK_BLUE: Color = Color::Rgb(110, 170, 255);

/// Inline/block code foreground
pub const CODE_FG: Color = Color::Rgb(220, 200, 160);
