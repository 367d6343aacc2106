//! Pod grouping for racks. Membership lives on each rack's `pod_id`; a pod is
//! just an id and a name, and its outline is derived from its members.

use uuid::Uuid;

use crate::geometry::{pod_boundaries, Point, PodBoundary};
use crate::layer::Pod;
use crate::racks::{Modifiers, RackManager, PRIMARY_BUTTON};
use crate::scene::Scene;
use crate::spatial::SpatialIndex;

fn new_pod_id() -> String {
    format!("pod-{}", Uuid::new_v4().simple())
}

impl RackManager {
    /// Group the selected racks into a new pod. Pods left without members by
    /// the move are dropped.
    pub fn create_pod(&mut self, scene: &mut Scene) -> Option<String> {
        if self.selected.is_empty() {
            return None;
        }
        let count = scene.current_layer()?.pods.len();
        scene.take_snapshot();
        let layer = scene.current_layer_mut()?;

        let pod = Pod {
            id: new_pod_id(),
            name: format!("Pod {}", count + 1),
        };
        for &i in &self.selected {
            if let Some(rack) = layer.racks.get_mut(i) {
                rack.pod_id = Some(pod.id.clone());
            }
        }
        let id = pod.id.clone();
        layer.pods.push(pod);
        layer.prune_empty_pods();
        log::debug!("Created pod {} with {} racks", id, self.selected.len());
        Some(id)
    }

    /// Take the selected racks out of their pods.
    pub fn leave_pod(&mut self, scene: &mut Scene) -> bool {
        let in_pod = scene.current_layer().is_some_and(|l| {
            self.selected
                .iter()
                .any(|&i| l.racks.get(i).is_some_and(|r| r.pod_id.is_some()))
        });
        if !in_pod {
            return false;
        }
        scene.take_snapshot();
        let Some(layer) = scene.current_layer_mut() else {
            return false;
        };
        for &i in &self.selected {
            if let Some(rack) = layer.racks.get_mut(i) {
                rack.pod_id = None;
            }
        }
        layer.prune_empty_pods();
        true
    }

    /// Dissolve a pod. Its racks stay where they are.
    pub fn delete_pod(&mut self, scene: &mut Scene, pod_id: &str) -> bool {
        let exists = scene
            .current_layer()
            .is_some_and(|l| l.pods.iter().any(|p| p.id == pod_id));
        if !exists {
            return false;
        }
        scene.take_snapshot();
        let Some(layer) = scene.current_layer_mut() else {
            return false;
        };
        for rack in layer.racks.iter_mut() {
            if rack.pod_id.as_deref() == Some(pod_id) {
                rack.pod_id = None;
            }
        }
        layer.pods.retain(|p| p.id != pod_id);
        true
    }

    /// Select every member of a pod and start dragging them together,
    /// anchored on the first member.
    pub fn select_pod(&mut self, scene: &mut Scene, pod_id: &str, pointer: Point) -> bool {
        let members = match scene.current_layer() {
            Some(layer) => layer.pod_members(pod_id),
            None => return false,
        };
        let Some(&first) = members.first() else {
            return false;
        };
        self.selected = members;
        self.start_drag_rack(scene, first, pointer, Modifiers::default(), PRIMARY_BUTTON)
    }

    /// Padded outlines of the active layer's pods.
    pub fn pod_boundaries(scene: &Scene) -> Vec<PodBoundary> {
        match scene.current_layer() {
            Some(layer) => pod_boundaries(&layer.racks, &layer.pods, &scene.settings),
            None => Vec::new(),
        }
    }

    /// Pod whose outline contains a scene-space point.
    pub fn pod_at(scene: &Scene, point: &Point) -> Option<String> {
        let layer = scene.current_layer()?;
        SpatialIndex::for_layer(layer, &scene.settings).pod_at(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BBox, ViewTransform};

    fn room_with_racks() -> (Scene, RackManager) {
        let mut scene = Scene::new();
        scene.set_walls(vec![
            Point::new(0.0, 0.0),
            Point::new(400.0, 0.0),
            Point::new(400.0, 400.0),
            Point::new(0.0, 400.0),
        ]);
        scene.initialize();
        scene.set_current_layer(2);
        let mut racks = RackManager::new();
        racks.create_rack(&mut scene, 1, Some(Point::new(40.0, 40.0)));
        racks.create_rack(&mut scene, 1, Some(Point::new(100.0, 40.0)));
        racks.create_rack(&mut scene, 1, Some(Point::new(300.0, 300.0)));
        (scene, racks)
    }

    fn pod_of(scene: &Scene, index: usize) -> Option<String> {
        scene.current_layer().unwrap().racks[index].pod_id.clone()
    }

    #[test]
    fn test_create_pod_stamps_members() {
        let (mut scene, mut racks) = room_with_racks();
        racks.clear_selection();
        assert!(racks.create_pod(&mut scene).is_none());

        racks.click_rack(0, Modifiers::default());
        racks.click_rack(1, Modifiers::ctrl());
        let id = racks.create_pod(&mut scene).unwrap();
        assert!(id.starts_with("pod-"));
        assert_eq!(pod_of(&scene, 0).as_deref(), Some(id.as_str()));
        assert_eq!(pod_of(&scene, 1).as_deref(), Some(id.as_str()));
        assert!(pod_of(&scene, 2).is_none());
        assert_eq!(scene.current_layer().unwrap().pods[0].name, "Pod 1");
    }

    #[test]
    fn test_repod_drops_emptied_pod() {
        let (mut scene, mut racks) = room_with_racks();
        racks.click_rack(0, Modifiers::default());
        let first = racks.create_pod(&mut scene).unwrap();
        let second = racks.create_pod(&mut scene).unwrap();
        let pods = &scene.current_layer().unwrap().pods;
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].id, second);
        assert_ne!(first, second);
    }

    #[test]
    fn test_leave_pod_prunes_last_member() {
        let (mut scene, mut racks) = room_with_racks();
        racks.click_rack(0, Modifiers::default());
        racks.click_rack(1, Modifiers::ctrl());
        racks.create_pod(&mut scene).unwrap();

        racks.click_rack(0, Modifiers::default());
        assert!(racks.leave_pod(&mut scene));
        assert_eq!(scene.current_layer().unwrap().pods.len(), 1);
        assert!(!racks.leave_pod(&mut scene));

        racks.click_rack(1, Modifiers::default());
        assert!(racks.leave_pod(&mut scene));
        assert!(scene.current_layer().unwrap().pods.is_empty());
    }

    #[test]
    fn test_delete_pod_releases_members() {
        let (mut scene, mut racks) = room_with_racks();
        racks.click_rack(0, Modifiers::default());
        racks.click_rack(2, Modifiers::ctrl());
        let id = racks.create_pod(&mut scene).unwrap();
        assert!(racks.delete_pod(&mut scene, &id));
        assert!(pod_of(&scene, 0).is_none());
        assert!(pod_of(&scene, 2).is_none());
        assert!(scene.current_layer().unwrap().pods.is_empty());
        assert!(!racks.delete_pod(&mut scene, &id));
    }

    #[test]
    fn test_boundary_grows_with_dragged_member() {
        let (mut scene, mut racks) = room_with_racks();
        racks.click_rack(0, Modifiers::default());
        racks.click_rack(1, Modifiers::ctrl());
        racks.create_pod(&mut scene).unwrap();

        let before = RackManager::pod_boundaries(&scene);
        assert_eq!(before.len(), 1);
        assert_eq!(
            before[0].bbox,
            BBox::new(Point::new(30.0, 30.0), Point::new(150.0, 90.0))
        );

        let view = ViewTransform::default();
        racks.click_rack(1, Modifiers::default());
        racks.start_drag_rack(&mut scene, 1, Point::new(0.0, 0.0), Modifiers::default(), PRIMARY_BUTTON);
        assert!(racks.drag_rack(&mut scene, Point::new(40.0, 40.0), &view));
        racks.reset_rack_state();

        let after = RackManager::pod_boundaries(&scene);
        assert_eq!(after.len(), 1);
        assert_eq!(
            after[0].bbox,
            BBox::new(Point::new(30.0, 30.0), Point::new(190.0, 130.0))
        );
    }

    #[test]
    fn test_select_pod_starts_group_drag() {
        let (mut scene, mut racks) = room_with_racks();
        racks.click_rack(0, Modifiers::default());
        racks.click_rack(1, Modifiers::ctrl());
        let id = racks.create_pod(&mut scene).unwrap();
        racks.clear_selection();

        assert_eq!(
            RackManager::pod_at(&scene, &Point::new(35.0, 35.0)).as_deref(),
            Some(id.as_str())
        );
        assert!(racks.select_pod(&mut scene, &id, Point::new(0.0, 0.0)));
        assert_eq!(racks.selected(), &[0, 1]);
        assert!(racks.is_dragging());

        racks.drag_rack(&mut scene, Point::new(20.0, 20.0), &ViewTransform::default());
        let layer = scene.current_layer().unwrap();
        assert_eq!((layer.racks[0].x, layer.racks[0].y), (60.0, 60.0));
        assert_eq!((layer.racks[1].x, layer.racks[1].y), (120.0, 60.0));
        assert!(!racks.select_pod(&mut scene, "pod-missing", Point::new(0.0, 0.0)));
    }
}
