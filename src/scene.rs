use std::collections::HashMap;

use nalgebra::Point3;

use crate::tracking::curve::TipFrame;

/// Opaque handle to a node in the host scene graph. The core never sees
/// scene internals, only these handles.
pub type NodeHandle = u64;

/// Narrow interface to the host 3D scene. The core pushes curve polylines
/// and tip frames through it after each tracking tick; rendering, colors
/// and widget wiring live entirely on the host side.
pub trait SceneRepository {
    fn create_node(&mut self, name: &str) -> NodeHandle;
    fn set_curve_points(&mut self, node: NodeHandle, points: &[Point3<f64>]);
    fn set_tip_frame(&mut self, node: NodeHandle, tip: &TipFrame);
    fn remove_node(&mut self, node: NodeHandle);
}

/// Scene repository backed by plain maps. Stands in for the host scene in
/// tests and headless runs.
#[derive(Debug, Default)]
pub struct InMemoryScene {
    next_handle: NodeHandle,
    pub names: HashMap<NodeHandle, String>,
    pub curves: HashMap<NodeHandle, Vec<Point3<f64>>>,
    pub tips: HashMap<NodeHandle, TipFrame>,
}

impl InMemoryScene {
    pub fn new() -> Self {
        InMemoryScene::default()
    }
}

impl SceneRepository for InMemoryScene {
    fn create_node(&mut self, name: &str) -> NodeHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.names.insert(handle, name.to_string());
        handle
    }

    fn set_curve_points(&mut self, node: NodeHandle, points: &[Point3<f64>]) {
        self.curves.insert(node, points.to_vec());
    }

    fn set_tip_frame(&mut self, node: NodeHandle, tip: &TipFrame) {
        self.tips.insert(node, tip.clone());
    }

    fn remove_node(&mut self, node: NodeHandle) {
        self.names.remove(&node);
        self.curves.remove(&node);
        self.tips.remove(&node);
    }
}

#[cfg(test)]
mod scene_tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let mut scene = InMemoryScene::new();
        let a = scene.create_node("curve");
        let b = scene.create_node("tip");
        assert_ne!(a, b);
        assert_eq!(scene.names[&a], "curve");
    }

    #[test]
    fn test_remove_clears_all_attributes() {
        let mut scene = InMemoryScene::new();
        let node = scene.create_node("curve");
        scene.set_curve_points(node, &[Point3::origin()]);
        scene.remove_node(node);
        assert!(scene.names.is_empty());
        assert!(scene.curves.is_empty());
    }
}
