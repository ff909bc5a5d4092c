use log::debug;
use ndarray::{s, Array1};

use crate::error::{Error, Result};
use crate::memory::layout::MemoryLayout;
use crate::model::{Graph, ValueId};

/// Packs constant values contiguously into one arena and materializes the
/// backing buffer
pub struct ConstantPacker;

impl ConstantPacker {
    /// Append constants back-to-back in input order. Constants are
    /// immutable and live for the whole graph's lifetime, so there is no
    /// reuse and no holes. Returns the layout together with a buffer of
    /// `total_size` elements holding every constant's flattened data at
    /// its offset; bytes outside any allocation stay zero.
    pub fn pack(graph: &Graph, constants: &[ValueId]) -> Result<(MemoryLayout, Array1<f32>)> {
        let mut layout = MemoryLayout::new();

        for &id in constants {
            if layout.contains(id) {
                continue;
            }

            let value = graph.value(id);
            let data = value.constant_data().ok_or_else(|| {
                Error::InvalidGraph(format!("value {} is not a constant", value.name))
            })?;
            if data.len() != value.size {
                return Err(Error::ConstantSizeMismatch {
                    name: value.name.clone(),
                    declared: value.size,
                    actual: data.len(),
                });
            }

            layout.append(value);
        }

        let mut buffer = Array1::<f32>::zeros(layout.total_size());
        for &id in constants {
            let allocation = layout
                .get(id)
                .ok_or_else(|| Error::UnallocatedValue(graph.value(id).name.clone()))?;
            let data = graph.value(id).constant_data().ok_or_else(|| {
                Error::InvalidGraph(format!("value {} is not a constant", graph.value(id).name))
            })?;

            let mut target = buffer.slice_mut(s![allocation.offset()..allocation.end()]);
            for (dst, &src) in target.iter_mut().zip(data.iter()) {
                *dst = src;
            }
        }

        debug!(
            "packed {} constants into {} elements",
            layout.len(),
            layout.total_size()
        );
        Ok((layout, buffer))
    }
}
