use serde::{Deserialize, Serialize};

use crate::layer::{Pod, Rack};
use crate::settings::EditorSettings;

/// Corners are pulled this far toward the element center before the wall test,
/// so elements flush against a wall are not rejected by edge rounding.
pub const ELEMENT_INSET: f64 = 1.0;

/// A 2D point in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Round both coordinates to the nearest grid line.
    pub fn snapped(&self, unit: f64) -> Self {
        Self::new(snap(self.x, unit), snap(self.y, unit))
    }

    /// Rotate this point about `center` by `degrees`.
    pub fn rotate_about(&self, center: &Point, degrees: f64) -> Self {
        let rad = degrees.to_radians();
        let (sin_r, cos_r) = rad.sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Self::new(
            center.x + dx * cos_r - dy * sin_r,
            center.y + dx * sin_r + dy * cos_r,
        )
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        })
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow the box by `amount` on every side.
    pub fn expand(&self, amount: f64) -> Self {
        Self {
            min: self.min.translate(-amount, -amount),
            max: self.max.translate(amount, amount),
        }
    }
}

/// Derived outline of a pod, computed from its member racks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodBoundary {
    pub pod_id: String,
    pub bbox: BBox,
}

/// Pan/zoom pair used to bring pointer coordinates into scene space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub zoom: f64,
    pub pan: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::new(0.0, 0.0),
        }
    }
}

impl ViewTransform {
    pub fn new(zoom: f64, pan: Point) -> Self {
        Self { zoom, pan }
    }

    pub fn to_scene(&self, screen: &Point) -> Point {
        Point::new(screen.x / self.zoom - self.pan.x, screen.y / self.zoom - self.pan.y)
    }

    /// Convert a pointer displacement in screen pixels to scene units.
    pub fn scale_delta(&self, from: &Point, to: &Point) -> (f64, f64) {
        ((to.x - from.x) / self.zoom, (to.y - from.y) / self.zoom)
    }
}

pub fn snap(value: f64, unit: f64) -> f64 {
    (value / unit).round() * unit
}

/// Floor `value` to the grid cell containing it.
pub fn snap_down(value: f64, unit: f64) -> f64 {
    (value / unit).floor() * unit
}

/// Wrap an angle into `[0, 360)` and round it to the nearest `step`.
pub fn normalize_rotation(degrees: f64, step: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    let snapped = (wrapped / step).round() * step;
    // 359.9 rounds up to a full turn; `+ 0.0` folds -0.0 into 0.0.
    if snapped >= 360.0 {
        snapped - 360.0
    } else {
        snapped + 0.0
    }
}

/// Even-odd containment test. The polygon is implicitly closed.
pub fn is_point_in_polygon(x: f64, y: f64, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n == 0 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > y) != (pj.y > y) && x < (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

pub fn wall_bounding_box(polygon: &[Point]) -> Option<BBox> {
    BBox::from_points(polygon)
}

/// Snap a wall-drawing cursor and lock it to horizontal, vertical or a
/// grid-aligned diagonal relative to the previous wall point.
pub fn constrained_point(current_x: f64, current_y: f64, last: Option<&Point>, unit: f64) -> Point {
    let snap_x = snap(current_x, unit);
    let snap_y = snap(current_y, unit);

    let Some(last) = last else {
        return Point::new(snap_x, snap_y);
    };

    let dx = snap_x - last.x;
    let dy = snap_y - last.y;
    let abs_dx = dx.abs();
    let abs_dy = dy.abs();

    if abs_dx > abs_dy * 1.5 {
        return Point::new(snap_x, last.y);
    }
    if abs_dy > abs_dx * 1.5 {
        return Point::new(last.x, snap_y);
    }

    let dist = snap((abs_dx + abs_dy) / 2.0, unit);
    Point::new(
        last.x + if dx >= 0.0 { dist } else { -dist },
        last.y + if dy >= 0.0 { dist } else { -dist },
    )
}

/// Closest point to `p` on the segment `a`-`b`.
pub fn closest_point_on_segment(p: &Point, a: &Point, b: &Point) -> Point {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        return *a;
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    Point::new(a.x + t * abx, a.y + t * aby)
}

/// Bring an outside point back into the room: project onto the nearest wall,
/// pull it `margin` units toward the vertex centroid, then snap.
pub fn closest_point_inside(x: f64, y: f64, polygon: &[Point], margin: f64, unit: f64) -> Point {
    if polygon.len() < 3 || is_point_in_polygon(x, y, polygon) {
        return Point::new(x, y);
    }

    let p = Point::new(x, y);
    let n = polygon.len();
    let mut best = polygon[0];
    let mut best_dist = f64::MAX;
    for i in 0..n {
        let candidate = closest_point_on_segment(&p, &polygon[i], &polygon[(i + 1) % n]);
        let dist = p.distance_to(&candidate);
        if dist < best_dist {
            best_dist = dist;
            best = candidate;
        }
    }

    let count = n as f64;
    let centroid = Point::new(
        polygon.iter().map(|v| v.x).sum::<f64>() / count,
        polygon.iter().map(|v| v.y).sum::<f64>() / count,
    );
    let to_center = best.distance_to(&centroid);
    if to_center > 0.0 {
        let step = margin.min(to_center) / to_center;
        best = best.translate((centroid.x - best.x) * step, (centroid.y - best.y) * step);
    }

    best.snapped(unit)
}

/// Corners of the `width` x `height` rectangle anchored at (x, y), rotated
/// about its own center. Order: top-left, top-right, bottom-right, bottom-left.
pub fn rotated_corners(x: f64, y: f64, width: f64, height: f64, rotation: f64) -> [Point; 4] {
    let corners = [
        Point::new(x, y),
        Point::new(x + width, y),
        Point::new(x + width, y + height),
        Point::new(x, y + height),
    ];
    if rotation == 0.0 {
        return corners;
    }
    let center = Point::new(x + width / 2.0, y + height / 2.0);
    corners.map(|c| c.rotate_about(&center, rotation))
}

/// True when the rotated rectangle lies entirely inside the wall polygon.
/// Rooms with fewer than three wall points impose no constraint.
pub fn is_element_in_walls(
    x: f64,
    y: f64,
    rotation: f64,
    polygon: &[Point],
    width: f64,
    height: f64,
) -> bool {
    if polygon.len() < 3 {
        return true;
    }
    let inset = ELEMENT_INSET.min(width / 2.0).min(height / 2.0);
    rotated_corners(
        x + inset,
        y + inset,
        width - 2.0 * inset,
        height - 2.0 * inset,
        rotation,
    )
    .iter()
    .all(|c| is_point_in_polygon(c.x, c.y, polygon))
}

/// Padded outline of every pod that has at least one positioned member rack.
pub fn pod_boundaries(racks: &[Rack], pods: &[Pod], settings: &EditorSettings) -> Vec<PodBoundary> {
    pods.iter()
        .filter_map(|pod| {
            let corners: Vec<Point> = racks
                .iter()
                .filter(|r| r.pod_id.as_deref() == Some(pod.id.as_str()) && r.has_position())
                .flat_map(|r| r.corners(settings))
                .collect();
            BBox::from_points(&corners).map(|bbox| PodBoundary {
                pod_id: pod.id.clone(),
                bbox: bbox.expand(settings.pod_padding),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ]
    }

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_point_in_square() {
        let poly = square();
        assert!(is_point_in_polygon(50.0, 50.0, &poly));
        assert!(!is_point_in_polygon(150.0, 50.0, &poly));
        assert!(!is_point_in_polygon(-1.0, 50.0, &poly));
        assert!(!is_point_in_polygon(50.0, 100.5, &poly));
    }

    #[test]
    fn test_point_in_concave_polygon() {
        // L-shaped room: the notch at the top right is outside.
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 50.0),
            Point::new(50.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        assert!(is_point_in_polygon(25.0, 75.0, &poly));
        assert!(is_point_in_polygon(75.0, 25.0, &poly));
        assert!(!is_point_in_polygon(75.0, 75.0, &poly));
    }

    #[test]
    fn test_wall_bounding_box() {
        assert!(wall_bounding_box(&[]).is_none());
        let bb = wall_bounding_box(&square()).unwrap();
        assert!((bb.width() - 100.0).abs() < 1e-10);
        assert!((bb.height() - 100.0).abs() < 1e-10);
        assert_eq!(bb.center(), Point::new(50.0, 50.0));
    }

    #[test]
    fn test_constrained_point_without_previous() {
        assert_eq!(constrained_point(33.0, 47.0, None, 20.0), Point::new(40.0, 40.0));
    }

    #[test]
    fn test_constrained_point_axis_locks() {
        let last = Point::new(0.0, 0.0);
        assert_eq!(constrained_point(100.0, 18.0, Some(&last), 20.0), Point::new(100.0, 0.0));
        assert_eq!(constrained_point(-12.0, -95.0, Some(&last), 20.0), Point::new(0.0, -100.0));
    }

    #[test]
    fn test_constrained_point_diagonal() {
        let last = Point::new(100.0, 100.0);
        // dx = -60, dy = 80: neither axis dominates, averaged distance 70 snaps to 80.
        let p = constrained_point(40.0, 180.0, Some(&last), 20.0);
        assert_eq!(p, Point::new(20.0, 180.0));
    }

    #[test]
    fn test_closest_point_inside_keeps_interior_point() {
        let poly = square();
        assert_eq!(closest_point_inside(30.0, 30.0, &poly, 5.0, 20.0), Point::new(30.0, 30.0));
        assert_eq!(closest_point_inside(300.0, 30.0, &[], 5.0, 20.0), Point::new(300.0, 30.0));
    }

    #[test]
    fn test_closest_point_inside_projects_outside_point() {
        let poly = square();
        let p = closest_point_inside(150.0, 47.0, &poly, 5.0, 20.0);
        assert_eq!(p, Point::new(100.0, 40.0));
        let p = closest_point_inside(-30.0, -30.0, &poly, 15.0, 20.0);
        assert_eq!(p, Point::new(20.0, 20.0));
        assert!(is_point_in_polygon(p.x, p.y, &poly));
    }

    #[test]
    fn test_segment_projection_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(closest_point_on_segment(&Point::new(-5.0, 3.0), &a, &b), a);
        assert_eq!(closest_point_on_segment(&Point::new(4.0, 3.0), &a, &b), Point::new(4.0, 0.0));
        assert_eq!(closest_point_on_segment(&Point::new(4.0, 3.0), &a, &a), a);
    }

    #[test]
    fn test_element_in_walls() {
        let poly = square();
        assert!(is_element_in_walls(0.0, 0.0, 0.0, &poly, 40.0, 40.0));
        assert!(is_element_in_walls(60.0, 60.0, 0.0, &poly, 40.0, 40.0));
        assert!(!is_element_in_walls(80.0, 80.0, 0.0, &poly, 40.0, 40.0));
        assert!(is_element_in_walls(500.0, 500.0, 0.0, &[], 40.0, 40.0));
    }

    #[test]
    fn test_element_rotation_hits_wall() {
        let poly = square();
        // A 100x20 bar lying along the floor fits; stood upright around its center it does not.
        assert!(is_element_in_walls(0.0, 0.0, 0.0, &poly, 100.0, 20.0));
        assert!(!is_element_in_walls(0.0, 0.0, 90.0, &poly, 100.0, 20.0));
        assert!(!is_element_in_walls(0.0, 0.0, 45.0, &poly, 100.0, 20.0));
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(-45.0, 45.0), 315.0);
        assert_eq!(normalize_rotation(725.0, 45.0), 0.0);
        assert_eq!(normalize_rotation(359.0, 90.0), 0.0);
        assert_eq!(normalize_rotation(-100.0, 90.0), 270.0);
        for raw in [-1000.0, -361.0, -22.4, 0.0, 67.6, 400.0, 1234.5] {
            assert_eq!(normalize_rotation(raw, 45.0) % 45.0, 0.0);
            assert_eq!(normalize_rotation(raw, 90.0) % 90.0, 0.0);
        }
    }

    #[test]
    fn test_rotated_corners_quarter_turn() {
        let corners = rotated_corners(0.0, 0.0, 40.0, 20.0, 90.0);
        let bb = BBox::from_points(&corners).unwrap();
        assert!((bb.width() - 20.0).abs() < 1e-9);
        assert!((bb.height() - 40.0).abs() < 1e-9);
        assert!((bb.center().x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_view_transform() {
        let view = ViewTransform::new(2.0, Point::new(10.0, 5.0));
        assert_eq!(view.to_scene(&Point::new(100.0, 50.0)), Point::new(40.0, 20.0));
        assert_eq!(
            view.scale_delta(&Point::new(0.0, 0.0), &Point::new(80.0, -40.0)),
            (40.0, -20.0)
        );
    }
}
