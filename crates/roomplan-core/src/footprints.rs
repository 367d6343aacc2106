//! Grid-cell selection and footprint placement.
//!
//! A selection gesture runs `start_selection` → `update_selection`* →
//! `stop_selection`. Its mode is fixed by the first cell: clicking a cell that
//! is already selected removes, anything else adds. Add gestures commit a
//! rectangle only when every cell in it is free, and finish by pruning the
//! selection down to the 4-connected region touched by the gesture. Remove
//! gestures do not prune, so a remove can leave several islands behind.
//!
//! `create_footprint` fills every hole enclosed by the selection before
//! committing it to the active layer.

use std::collections::HashSet;

use rand::Rng;
use uuid::Uuid;

use crate::geometry::{
    is_element_in_walls, is_point_in_polygon, normalize_rotation, snap, snap_down, BBox, Point,
};
use crate::layer::Footprint;
use crate::scene::Scene;

/// Palette footprint colors are drawn from.
pub const FOOTPRINT_COLORS: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F06292", "#AED581", "#FFD54F",
    "#4DB6AC", "#BA68C8",
];

/// Integer grid coordinates of a cell.
type CellKey = (i64, i64);

fn cell_key(p: &Point, unit: f64) -> CellKey {
    ((p.x / unit).round() as i64, (p.y / unit).round() as i64)
}

fn cell_point(key: CellKey, unit: f64) -> Point {
    Point::new(key.0 as f64 * unit, key.1 as f64 * unit)
}

fn neighbours((col, row): CellKey) -> [CellKey; 4] {
    [(col + 1, row), (col - 1, row), (col, row + 1), (col, row - 1)]
}

/// Cells of `cells` reachable from `seeds` through 4-neighbours.
fn flood_within(seeds: &[CellKey], cells: &HashSet<CellKey>) -> HashSet<CellKey> {
    let mut connected = HashSet::new();
    let mut stack: Vec<CellKey> = seeds.to_vec();
    while let Some(key) = stack.pop() {
        if !connected.insert(key) {
            continue;
        }
        for n in neighbours(key) {
            if cells.contains(&n) && !connected.contains(&n) {
                stack.push(n);
            }
        }
    }
    connected
}

/// Whether `units` form a single 4-connected region. Empty counts as connected.
pub fn is_connected(units: &[Point], unit: f64) -> bool {
    let cells: HashSet<CellKey> = units.iter().map(|u| cell_key(u, unit)).collect();
    let Some(&first) = cells.iter().next() else {
        return true;
    };
    flood_within(&[first], &cells).len() == cells.len()
}

/// Cells inside the bounding rectangle of `units` that cannot be reached from
/// outside it without crossing a unit. Holes outside a room outline of three or
/// more points are left out.
pub fn enclosed_holes(units: &[Point], polygon: &[Point], unit: f64) -> Vec<Point> {
    let selected: HashSet<CellKey> = units.iter().map(|u| cell_key(u, unit)).collect();
    if selected.is_empty() {
        return Vec::new();
    }
    let min_c = selected.iter().map(|k| k.0).min().unwrap_or(0);
    let max_c = selected.iter().map(|k| k.0).max().unwrap_or(0);
    let min_r = selected.iter().map(|k| k.1).min().unwrap_or(0);
    let max_r = selected.iter().map(|k| k.1).max().unwrap_or(0);

    // Flood the one-cell ring around the bounding rectangle inward.
    let mut outside: HashSet<CellKey> = HashSet::new();
    let mut stack: Vec<CellKey> = Vec::new();
    for c in (min_c - 1)..=(max_c + 1) {
        stack.push((c, min_r - 1));
        stack.push((c, max_r + 1));
    }
    for r in min_r..=max_r {
        stack.push((min_c - 1, r));
        stack.push((max_c + 1, r));
    }
    while let Some(key) = stack.pop() {
        if outside.contains(&key) || selected.contains(&key) {
            continue;
        }
        let (c, r) = key;
        if c < min_c - 1 || c > max_c + 1 || r < min_r - 1 || r > max_r + 1 {
            continue;
        }
        outside.insert(key);
        stack.extend(neighbours(key));
    }

    let half = unit / 2.0;
    let mut holes = Vec::new();
    for c in min_c..=max_c {
        for r in min_r..=max_r {
            let key = (c, r);
            if selected.contains(&key) || outside.contains(&key) {
                continue;
            }
            let p = cell_point(key, unit);
            if polygon.len() < 3 || is_point_in_polygon(p.x + half, p.y + half, polygon) {
                holes.push(p);
            }
        }
    }
    holes
}

/// Rotate cells about `pivot` (a cell corner or cell center) and snap them
/// back to the grid.
fn rotate_units(units: &[Point], pivot: &Point, degrees: f64, unit: f64) -> Vec<Point> {
    let half = unit / 2.0;
    units
        .iter()
        .map(|u| {
            let center = Point::new(u.x + half, u.y + half).rotate_about(pivot, degrees);
            Point::new(snap(center.x - half, unit), snap(center.y - half, unit))
        })
        .collect()
}

/// Pivot for quarter turns of a shape currently turned by `rotation` degrees.
///
/// The pivot is always a cell corner or a cell center, so cells land on
/// cells. A shape whose width and height differ in parity has no such point
/// at its center; it gets one offset half a cell from the center of the
/// unrotated shape, carried through the current rotation. Every rotation of
/// one footprint therefore turns about the same point.
fn rotation_pivot(units: &[Point], rotation: f64, unit: f64) -> Option<Point> {
    let bounds = BBox::from_points(units)?;
    let far = bounds.max.translate(unit, unit);
    let center = BBox::new(bounds.min, far).center();
    let cols = ((far.x - bounds.min.x) / unit).round() as i64;
    let rows = ((far.y - bounds.min.y) / unit).round() as i64;
    if (cols + rows) % 2 == 0 {
        return Some(center);
    }

    let quarter_turns = (normalize_rotation(rotation, 90.0) / 90.0).round() as i64 % 4;
    let unrotated_cols = if quarter_turns % 2 == 0 { cols } else { rows };
    let half = unit / 2.0;
    let offset = if unrotated_cols % 2 == 1 {
        Point::new(0.0, half)
    } else {
        Point::new(half, 0.0)
    }
    .rotate_about(&Point::new(0.0, 0.0), quarter_turns as f64 * 90.0);
    Some(Point::new(
        snap(center.x + offset.x, half),
        snap(center.y + offset.y, half),
    ))
}

pub fn random_color() -> String {
    let idx = rand::rng().random_range(0..FOOTPRINT_COLORS.len());
    FOOTPRINT_COLORS[idx].to_string()
}

/// The footprint owning the grid cell under (x, y) on the active layer.
pub fn footprint_at(scene: &Scene, x: f64, y: f64) -> Option<&Footprint> {
    let unit = scene.settings.snap_size;
    let (sx, sy) = (snap_down(x, unit), snap_down(y, unit));
    scene
        .current_layer()?
        .footprints
        .iter()
        .find(|f| f.contains_unit(sx, sy))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Add,
    Remove,
}

#[derive(Debug, Clone)]
struct SelectionGesture {
    start: Point,
    mode: SelectionMode,
    unit: f64,
}

#[derive(Debug, Clone, Copy)]
enum TransformKind {
    Drag,
    Rotate { start_angle: f64 },
}

/// A drag or rotation of a placed footprint, holding its pre-gesture state.
#[derive(Debug, Clone)]
struct FootprintGesture {
    footprint_id: String,
    units_before: Vec<Point>,
    rotation_before: f64,
    pointer_start: Point,
    pivot: Point,
    kind: TransformKind,
}

#[derive(Debug, Default)]
pub struct FootprintSelector {
    selected_units: Vec<Point>,
    selecting: bool,
    gesture: Option<SelectionGesture>,
    initial_selection: Option<Vec<Point>>,
    current_batch: Vec<Point>,
    hovered_unit: Option<Point>,
    selected_footprint_id: Option<String>,
    transform: Option<FootprintGesture>,
}

impl FootprintSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_units(&self) -> &[Point] {
        &self.selected_units
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    pub fn mode(&self) -> Option<SelectionMode> {
        self.gesture.as_ref().map(|g| g.mode)
    }

    pub fn initial_selection(&self) -> Option<&[Point]> {
        self.initial_selection.as_deref()
    }

    pub fn hovered_unit(&self) -> Option<Point> {
        self.hovered_unit
    }

    pub fn selected_footprint_id(&self) -> Option<&str> {
        self.selected_footprint_id.as_deref()
    }

    pub fn is_transforming(&self) -> bool {
        self.transform.is_some()
    }

    /// A cell can join the selection when no footprint owns it and, once a room
    /// outline exists, its center lies inside the walls.
    fn is_unit_free(scene: &Scene, x: f64, y: f64) -> bool {
        let unit = scene.settings.snap_size;
        let occupied = scene
            .current_layer()
            .is_some_and(|l| l.is_unit_occupied(x, y));
        if occupied {
            return false;
        }
        !scene.has_room() || is_point_in_polygon(x + unit / 2.0, y + unit / 2.0, scene.walls())
    }

    // ── Selection gesture ────────────────────────────────────────────

    pub fn start_selection(&mut self, scene: &Scene, x: f64, y: f64) {
        self.selecting = true;
        let unit = scene.settings.snap_size;
        let cell = Point::new(snap_down(x, unit), snap_down(y, unit));

        if !Self::is_unit_free(scene, cell.x, cell.y) {
            log::debug!("Selection start on unavailable cell ({}, {})", cell.x, cell.y);
            self.gesture = None;
            self.initial_selection = Some(self.selected_units.clone());
            return;
        }

        let key = cell_key(&cell, unit);
        let mode = match self
            .selected_units
            .iter()
            .position(|u| cell_key(u, unit) == key)
        {
            Some(index) => {
                self.selected_units.remove(index);
                self.current_batch.clear();
                SelectionMode::Remove
            }
            None => {
                let adjacent = self.selected_units.is_empty()
                    || self
                        .selected_units
                        .iter()
                        .any(|u| neighbours(cell_key(u, unit)).contains(&key));
                if !adjacent {
                    self.selected_units.clear();
                }
                self.selected_units.push(cell);
                self.current_batch = vec![cell];
                SelectionMode::Add
            }
        };

        self.gesture = Some(SelectionGesture {
            start: cell,
            mode,
            unit,
        });
        self.initial_selection = Some(self.selected_units.clone());
    }

    /// Stretch the gesture rectangle to the cell under (x, y). Returns false
    /// when nothing changed.
    pub fn update_selection(&mut self, scene: &Scene, x: f64, y: f64) -> bool {
        if !self.selecting {
            return false;
        }
        let Some(gesture) = &self.gesture else {
            return false;
        };
        let unit = gesture.unit;
        let start = cell_key(&gesture.start, unit);
        let current = cell_key(&Point::new(snap_down(x, unit), snap_down(y, unit)), unit);
        let (min_c, max_c) = (start.0.min(current.0), start.0.max(current.0));
        let (min_r, max_r) = (start.1.min(current.1), start.1.max(current.1));
        let in_rect = |k: CellKey| k.0 >= min_c && k.0 <= max_c && k.1 >= min_r && k.1 <= max_r;
        let initial = self.initial_selection.clone().unwrap_or_default();

        match gesture.mode {
            SelectionMode::Add => {
                let mut rect_units = Vec::new();
                for c in min_c..=max_c {
                    for r in min_r..=max_r {
                        let p = cell_point((c, r), unit);
                        if !Self::is_unit_free(scene, p.x, p.y) {
                            return false;
                        }
                        rect_units.push(p);
                    }
                }
                let mut selection = initial;
                let mut seen: HashSet<CellKey> = selection.iter().map(|u| cell_key(u, unit)).collect();
                for p in &rect_units {
                    if seen.insert(cell_key(p, unit)) {
                        selection.push(*p);
                    }
                }
                self.selected_units = selection;
                self.current_batch = rect_units;
            }
            SelectionMode::Remove => {
                self.selected_units = initial
                    .into_iter()
                    .filter(|u| !in_rect(cell_key(u, unit)))
                    .collect();
            }
        }
        true
    }

    pub fn stop_selection(&mut self) {
        if let Some(gesture) = &self.gesture {
            if gesture.mode == SelectionMode::Add && !self.current_batch.is_empty() {
                let unit = gesture.unit;
                let cells: HashSet<CellKey> =
                    self.selected_units.iter().map(|u| cell_key(u, unit)).collect();
                let seeds: Vec<CellKey> =
                    self.current_batch.iter().map(|u| cell_key(u, unit)).collect();
                let connected = flood_within(&seeds, &cells);
                self.selected_units
                    .retain(|u| connected.contains(&cell_key(u, unit)));
            }
        }
        self.selecting = false;
        self.gesture = None;
        self.initial_selection = None;
        self.current_batch.clear();
    }

    pub fn clear_selection(&mut self) {
        self.selected_units.clear();
    }

    /// Commit the selection, holes filled, as a new footprint on the active
    /// layer. Returns the new footprint id.
    pub fn create_footprint(&mut self, scene: &mut Scene) -> Option<String> {
        if self.selected_units.is_empty() {
            return None;
        }
        let unit = scene.settings.snap_size;
        let holes = enclosed_holes(&self.selected_units, scene.walls(), unit);
        let count = scene.current_layer()?.footprints.len();

        let mut seen = HashSet::new();
        let units: Vec<Point> = self
            .selected_units
            .iter()
            .chain(holes.iter())
            .filter(|u| seen.insert(cell_key(u, unit)))
            .copied()
            .collect();

        scene.take_snapshot();
        let id = Uuid::new_v4().to_string();
        let footprint = Footprint::new(&id, &format!("Footprint {}", count + 1), units, &random_color());
        log::debug!(
            "Created footprint {} with {} units ({} holes filled)",
            id,
            footprint.units.len(),
            holes.len()
        );
        scene.current_layer_mut()?.footprints.push(footprint);
        self.selected_units.clear();
        Some(id)
    }

    /// Remove a footprint, or with `just_unplace` keep its record but strip
    /// its units, color and rotation.
    pub fn delete_footprint(&mut self, scene: &mut Scene, id: &str, just_unplace: bool) -> bool {
        if scene.current_layer().and_then(|l| l.footprint(id)).is_none() {
            return false;
        }
        scene.take_snapshot();
        let Some(layer) = scene.current_layer_mut() else {
            return false;
        };
        if just_unplace {
            if let Some(f) = layer.footprint_mut(id) {
                f.units.clear();
                f.color = None;
                f.rotation = None;
            }
        } else {
            layer.footprints.retain(|f| f.id != id);
        }
        if self.selected_footprint_id.as_deref() == Some(id) {
            self.selected_footprint_id = None;
        }
        true
    }

    pub fn change_footprint_color(&self, scene: &mut Scene, id: &str) -> bool {
        if scene.current_layer().and_then(|l| l.footprint(id)).is_none() {
            return false;
        }
        scene.take_snapshot();
        if let Some(f) = scene.current_layer_mut().and_then(|l| l.footprint_mut(id)) {
            f.color = Some(random_color());
        }
        true
    }

    pub fn rename_footprint(&self, scene: &mut Scene, id: &str, name: &str) -> bool {
        if scene.current_layer().and_then(|l| l.footprint(id)).is_none() {
            return false;
        }
        scene.take_snapshot();
        if let Some(f) = scene.current_layer_mut().and_then(|l| l.footprint_mut(id)) {
            f.name = name.to_string();
        }
        true
    }

    /// Track the free cell under the cursor for the hover preview.
    pub fn update_hovered_unit(&mut self, scene: &Scene, x: f64, y: f64) -> Option<Point> {
        let unit = scene.settings.snap_size;
        let cell = Point::new(snap_down(x, unit), snap_down(y, unit));
        self.hovered_unit = Self::is_unit_free(scene, cell.x, cell.y).then_some(cell);
        self.hovered_unit
    }

    pub fn select_footprint(&mut self, id: Option<&str>) {
        self.selected_footprint_id = id.map(str::to_string);
        if id.is_some() {
            self.selected_units.clear();
        }
    }

    // ── Moving placed footprints ─────────────────────────────────────

    /// Every unit sits inside the walls and off other footprints.
    fn fits(scene: &Scene, id: &str, units: &[Point]) -> bool {
        let unit = scene.settings.snap_size;
        let walls = scene.walls();
        let Some(layer) = scene.current_layer() else {
            return false;
        };
        units.iter().all(|u| {
            is_element_in_walls(u.x, u.y, 0.0, walls, unit, unit)
                && !layer
                    .footprints
                    .iter()
                    .any(|f| f.id != id && f.contains_unit(u.x, u.y))
        })
    }

    fn begin_transform(&mut self, scene: &mut Scene, id: &str, pointer: Point, rotate: bool) -> bool {
        let unit = scene.settings.snap_size;
        let Some(footprint) = scene.current_layer().and_then(|l| l.footprint(id)) else {
            return false;
        };
        let rotation = footprint.rotation.unwrap_or(0.0);
        let Some(pivot) = rotation_pivot(&footprint.units, rotation, unit) else {
            log::debug!("Footprint {} is not placed", id);
            return false;
        };
        let kind = if rotate {
            TransformKind::Rotate {
                start_angle: (pointer.y - pivot.y).atan2(pointer.x - pivot.x),
            }
        } else {
            TransformKind::Drag
        };
        let gesture = FootprintGesture {
            footprint_id: id.to_string(),
            units_before: footprint.units.clone(),
            rotation_before: rotation,
            pointer_start: pointer,
            pivot,
            kind,
        };
        scene.take_snapshot();
        self.transform = Some(gesture);
        self.selected_footprint_id = Some(id.to_string());
        true
    }

    /// `pointer` is in scene coordinates.
    pub fn start_drag_footprint(&mut self, scene: &mut Scene, id: &str, pointer: Point) -> bool {
        self.begin_transform(scene, id, pointer, false)
    }

    /// Translate by the snapped pointer delta. An invalid position is skipped
    /// and the footprint stays where it last fitted.
    pub fn drag_footprint(&self, scene: &mut Scene, pointer: Point) -> bool {
        let Some(gesture) = &self.transform else {
            return false;
        };
        if !matches!(gesture.kind, TransformKind::Drag) {
            return false;
        }
        let unit = scene.settings.snap_size;
        let dx = snap(pointer.x - gesture.pointer_start.x, unit);
        let dy = snap(pointer.y - gesture.pointer_start.y, unit);
        let moved: Vec<Point> = gesture.units_before.iter().map(|u| u.translate(dx, dy)).collect();

        if !Self::fits(scene, &gesture.footprint_id, &moved) {
            log::debug!("Rejected footprint drag by ({}, {})", dx, dy);
            return false;
        }
        match scene
            .current_layer_mut()
            .and_then(|l| l.footprint_mut(&gesture.footprint_id))
        {
            Some(f) => {
                f.units = moved;
                true
            }
            None => false,
        }
    }

    pub fn start_rotate_footprint(&mut self, scene: &mut Scene, id: &str, pointer: Point) -> bool {
        self.begin_transform(scene, id, pointer, true)
    }

    /// Rotate by the pointer's angle around the footprint, in 90° steps.
    pub fn rotate_footprint(&self, scene: &mut Scene, pointer: Point) -> bool {
        let Some(gesture) = &self.transform else {
            return false;
        };
        let TransformKind::Rotate { start_angle } = gesture.kind else {
            return false;
        };
        let angle = (pointer.y - gesture.pivot.y).atan2(pointer.x - gesture.pivot.x);
        let step = normalize_rotation((angle - start_angle).to_degrees(), 90.0);
        let unit = scene.settings.snap_size;
        let rotated = rotate_units(&gesture.units_before, &gesture.pivot, step, unit);

        if !Self::fits(scene, &gesture.footprint_id, &rotated) {
            log::debug!("Rejected footprint rotation by {}°", step);
            return false;
        }
        match scene
            .current_layer_mut()
            .and_then(|l| l.footprint_mut(&gesture.footprint_id))
        {
            Some(f) => {
                f.units = rotated;
                f.rotation = Some(normalize_rotation(gesture.rotation_before + step, 90.0));
                true
            }
            None => false,
        }
    }

    /// Set an absolute rotation, snapped to 90°, turning the units to match.
    pub fn update_footprint_rotation(&self, scene: &mut Scene, id: &str, degrees: f64) -> bool {
        let unit = scene.settings.snap_size;
        let Some(footprint) = scene.current_layer().and_then(|l| l.footprint(id)) else {
            return false;
        };
        let target = normalize_rotation(degrees, 90.0);
        let current = footprint.rotation.unwrap_or(0.0);
        let delta = target - current;
        let units = match rotation_pivot(&footprint.units, current, unit) {
            Some(pivot) => rotate_units(&footprint.units, &pivot, delta, unit),
            None => Vec::new(),
        };
        if !units.is_empty() && !Self::fits(scene, id, &units) {
            log::debug!("Rejected footprint rotation to {}°", target);
            return false;
        }
        scene.take_snapshot();
        if let Some(f) = scene.current_layer_mut().and_then(|l| l.footprint_mut(id)) {
            f.units = units;
            f.rotation = Some(target);
        }
        true
    }

    /// Release drag/rotate state. Call on every gesture exit.
    pub fn reset_footprint_state(&mut self) {
        self.transform = None;
    }
}
