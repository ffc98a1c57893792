use geo::{BoundingRect, Coord, Intersects, Point, Rect};

/// Grid-aligned bounds of `bounds`: lower corner floored, upper corner ceiled to `voxel_size`.
pub fn snap_to_grid(bounds: &Rect<f64>, voxel_size: f64) -> Rect<f64> {
    let min = bounds.min();
    let max = bounds.max();
    Rect::new(
        Coord {
            x: (min.x / voxel_size).floor() * voxel_size,
            y: (min.y / voxel_size).floor() * voxel_size,
        },
        Coord {
            x: (max.x / voxel_size).ceil() * voxel_size,
            y: (max.y / voxel_size).ceil() * voxel_size,
        },
    )
}

/// Centers of the grid cells sampled for `footprint`.
///
/// Cell centers sit half a cell off the grid lines, so adjacent footprints
/// share the same lattice. A center is kept if it lies in the footprint's
/// interior or on its boundary. Points are ordered by x, then y.
pub fn create_voxel_points<G>(footprint: &G, voxel_size: f64) -> Vec<Coord<f64>>
where
    G: BoundingRect<f64, Output = Option<Rect<f64>>> + Intersects<Point<f64>>,
{
    let Some(bounds) = footprint.bounding_rect() else {
        return Vec::new();
    };
    if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return Vec::new();
    }

    let grid = snap_to_grid(&bounds, voxel_size);
    let cols = (grid.width() / voxel_size).round() as usize;
    let rows = (grid.height() / voxel_size).round() as usize;
    let half = voxel_size / 2.0;

    let mut points = Vec::new();
    for i in 0..cols {
        let x = grid.min().x + i as f64 * voxel_size + half;
        for j in 0..rows {
            let y = grid.min().y + j as f64 * voxel_size + half;
            if footprint.intersects(&Point::new(x, y)) {
                points.push(Coord { x, y });
            }
        }
    }
    points
}
