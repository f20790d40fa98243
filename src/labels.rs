//! Decorative code labels that flicker next to nodes near the camera.
//!
//! Labels draw from their own [`SwarmRng`], so how many are on screen never
//! changes the node random walk.

use crate::config::LabelConfig;
use crate::nodes::Node;
use crate::spawn::SwarmRng;
use crate::Vec3;

/// Label attached to one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub node: usize,
    pub code: String,
    /// World-space anchor, offset from the node.
    pub anchor: Vec3,
    pub visible: bool,
}

/// One label per node, animated each tick.
#[derive(Debug, Clone)]
pub struct LabelField {
    labels: Vec<Label>,
    display_dist: f32,
    code_length: usize,
    offset: Vec3,
    rng: SwarmRng,
}

impl LabelField {
    /// Create hidden labels with an initial code for every node.
    pub fn new(nodes: &[Node], config: &LabelConfig, mut rng: SwarmRng) -> Self {
        let labels = nodes
            .iter()
            .map(|n| Label {
                node: n.id,
                code: rng.random_code(config.code_length),
                anchor: n.position + config.offset,
                visible: false,
            })
            .collect();

        Self {
            labels,
            display_dist: config.display_dist,
            code_length: config.code_length,
            offset: config.offset,
            rng,
        }
    }

    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Visible labels only.
    pub fn visible(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter().filter(|l| l.visible)
    }

    /// Show labels of nodes within the display distance of `camera`, give
    /// them a fresh code and move them with their node. Others are hidden and
    /// keep their last code.
    pub fn tick(&mut self, nodes: &[Node], camera: Vec3) -> usize {
        let mut shown = 0;
        for label in &mut self.labels {
            let Some(node) = nodes.get(label.node) else {
                label.visible = false;
                continue;
            };
            label.visible = camera.distance(node.position) < self.display_dist;
            if label.visible {
                label.code = self.rng.random_code(self.code_length);
                label.anchor = node.position + self.offset;
                shown += 1;
            }
        }
        shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_near_labels_animate() {
        let nodes = vec![
            Node { id: 0, position: Vec3::new(0.0, 0.0, 100.0), velocity: Vec3::ZERO },
            Node { id: 1, position: Vec3::new(0.0, 0.0, 1000.0), velocity: Vec3::ZERO },
        ];
        let mut field = LabelField::new(&nodes, &LabelConfig::default(), SwarmRng::seeded(31));
        let far_code = field.labels()[1].code.clone();

        let shown = field.tick(&nodes, Vec3::ZERO);

        assert_eq!(shown, 1);
        let near = &field.labels()[0];
        assert!(near.visible);
        assert_eq!(near.anchor, Vec3::new(10.0, 10.0, 100.0));
        assert_eq!(near.code.len(), 6);
        let far = &field.labels()[1];
        assert!(!far.visible);
        assert_eq!(far.code, far_code);
        assert_eq!(field.visible().count(), 1);
    }
}
