//! Snap grid and background grid geometry.

use crate::geometry::{Dimensions, Point, Transform};
use serde::{Deserialize, Serialize};

/// Cell size of the snap grid in flow units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapGrid(pub f32, pub f32);

impl Default for SnapGrid {
    fn default() -> Self {
        SnapGrid(15.0, 15.0)
    }
}

/// Rounds each axis to the nearest multiple of the grid cell.
///
/// A non-positive cell size leaves that axis untouched.
pub fn snap_position(position: Point, grid: SnapGrid) -> Point {
    let snap = |value: f32, cell: f32| {
        if cell > 0.0 {
            cell * (value / cell).round()
        } else {
            value
        }
    };
    Point::new(snap(position.x, grid.0), snap(position.y, grid.1))
}

/// Generate SVG path commands for grid lines
///
/// Creates a string of SVG path commands for rendering an infinite grid.
/// The grid adjusts based on pan offset and zoom level.
///
/// # Arguments
/// * `container` - Canvas size in pixels
/// * `transform` - Current viewport transform
/// * `gap` - Base grid spacing per axis (before zoom)
///
/// # Returns
/// SVG path commands string (e.g., "M 24 0 L 24 600 M 48 0 L 48 600...")
pub fn generate_grid_commands(container: Dimensions, transform: &Transform, gap: SnapGrid) -> String {
    let spacing_x = gap.0 * transform.zoom;
    let spacing_y = gap.1 * transform.zoom;

    // Skip if spacing is too small to be visible
    if spacing_x < 4.0 || spacing_y < 4.0 {
        return String::new();
    }

    let offset_x = transform.x.rem_euclid(spacing_x);
    let offset_y = transform.y.rem_euclid(spacing_y);

    let mut commands = String::new();

    let mut x = offset_x;
    while x < container.width + spacing_x {
        if !commands.is_empty() {
            commands.push(' ');
        }
        commands.push_str(&format!("M {} 0 L {} {}", x, x, container.height));
        x += spacing_x;
    }

    let mut y = offset_y;
    while y < container.height + spacing_y {
        commands.push(' ');
        commands.push_str(&format!("M 0 {} L {} {}", y, container.width, y));
        y += spacing_y;
    }

    commands
}

/// Screen positions of the dots of a dotted background.
pub fn generate_grid_dots(container: Dimensions, transform: &Transform, gap: SnapGrid) -> Vec<Point> {
    let spacing_x = gap.0 * transform.zoom;
    let spacing_y = gap.1 * transform.zoom;
    if spacing_x < 4.0 || spacing_y < 4.0 {
        return Vec::new();
    }

    let offset_x = transform.x.rem_euclid(spacing_x);
    let offset_y = transform.y.rem_euclid(spacing_y);
    let columns = ((container.width - offset_x) / spacing_x).floor().max(-1.0) as i32 + 1;
    let rows = ((container.height - offset_y) / spacing_y).floor().max(-1.0) as i32 + 1;

    (0..rows)
        .flat_map(|row| {
            (0..columns).map(move |column| {
                Point::new(offset_x + column as f32 * spacing_x, offset_y + row as f32 * spacing_y)
            })
        })
        .collect()
}
