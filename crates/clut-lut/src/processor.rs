//! Optimized CPU evaluation of a process list.

use crate::clf::{ProcessList, ProcessNode};
use clut_math::{Mat3, Vec3};

/// Flattened, optimized form of a [`ProcessList`].
///
/// Runs of adjacent matrices are folded into one affine transform and
/// identity matrices are dropped, so a list of conversions and a grade
/// costs one multiply per pixel for the conversions.
#[derive(Debug, Clone)]
pub struct CpuProcessor {
    ops: Vec<ProcessNode>,
}

impl CpuProcessor {
    /// Builds the processor for `list`.
    pub fn new(list: &ProcessList) -> Self {
        let mut ops: Vec<ProcessNode> = Vec::with_capacity(list.nodes.len());
        for node in &list.nodes {
            match (ops.last_mut(), node) {
                (
                    Some(ProcessNode::Matrix { m: m1, offset: o1 }),
                    ProcessNode::Matrix { m: m2, offset: o2 },
                ) => {
                    let o = *m2 * Vec3::from(*o1) + Vec3::from(*o2);
                    *m1 = *m2 * *m1;
                    *o1 = o.to_array();
                }
                _ => ops.push(node.clone()),
            }
        }
        ops.retain(|op| {
            !matches!(op, ProcessNode::Matrix { m, offset }
                if m.max_abs_diff(&Mat3::IDENTITY) < 1e-7 && offset.iter().all(|v| *v == 0.0))
        });
        tracing::trace!(nodes = list.nodes.len(), ops = ops.len(), "optimized process list");
        Self { ops }
    }

    /// Number of operations after optimization.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when the processor is the identity.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies to one RGB triple.
    #[inline]
    pub fn apply_rgb(&self, rgb: &mut [f32; 3]) {
        for op in &self.ops {
            op.apply(rgb);
        }
    }

    /// Applies to packed `[R, G, B, R, G, B, ...]` samples in place.
    ///
    /// A trailing partial pixel is left untouched.
    pub fn apply_packed(&self, rgb: &mut [f32]) {
        if self.ops.is_empty() {
            return;
        }
        for px in rgb.chunks_exact_mut(3) {
            let mut v = [px[0], px[1], px[2]];
            self.apply_rgb(&mut v);
            px.copy_from_slice(&v);
        }
    }
}

impl From<&ProcessList> for CpuProcessor {
    fn from(list: &ProcessList) -> Self {
        Self::new(list)
    }
}
