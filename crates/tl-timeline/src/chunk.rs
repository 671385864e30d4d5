/// A bounded, pixel-mapped window of the unit axis.
///
/// Chunks segment the unbounded logical axis into pages so the render layer
/// never needs unbounded width. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chunk {
    /// Index of the chunk along the axis.
    pub index: i64,
    /// First unit covered by the chunk.
    pub start: f64,
    /// Width of the chunk in pixels.
    pub width_px: f64,
}

/// Computes the chunk containing `current`.
///
/// A chunk spans `chunk_width_px / px_per_unit` units; the index is the
/// floored quotient of `current` by that span, and the start is the floored
/// product of index and span. Holds `start <= current < start + span` for
/// `current >= 0` and positive scale. With a non-positive scale (viewport
/// not yet measured) the zero chunk is returned.
pub fn compute_chunk(current: f64, px_per_unit: f64, chunk_width_px: f64) -> Chunk {
    if px_per_unit <= 0.0 || chunk_width_px <= 0.0 {
        return Chunk {
            index: 0,
            start: 0.0,
            width_px: chunk_width_px,
        };
    }
    let range = chunk_width_px / px_per_unit;
    let index = (current / range).floor() as i64;
    let start = (index as f64 * range).floor();
    Chunk {
        index,
        start,
        width_px: chunk_width_px,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_holds_across_scales() {
        for &(current, px_per_unit, chunk_width_px) in &[
            (0.0, 0.025, 500.0),
            (4000.0, 0.025, 500.0),
            (19_999.0, 0.025, 500.0),
            (123_456.0, 1.5, 800.0),
            (7.0, 10.0, 100.0),
        ] {
            let chunk = compute_chunk(current, px_per_unit, chunk_width_px);
            let range = chunk_width_px / px_per_unit;
            assert!(chunk.start <= current, "start > current for {current}");
            assert!(
                current < chunk.start + range + 1.0,
                "current outside chunk for {current}"
            );
        }
    }

    #[test]
    fn consecutive_positions_walk_consecutive_chunks() {
        // span = 500 / 0.025 = 20000 units per chunk
        assert_eq!(compute_chunk(0.0, 0.025, 500.0).index, 0);
        assert_eq!(compute_chunk(19_999.0, 0.025, 500.0).index, 0);
        let second = compute_chunk(20_000.0, 0.025, 500.0);
        assert_eq!(second.index, 1);
        assert_eq!(second.start, 20_000.0);
    }

    #[test]
    fn unmeasured_viewport_maps_to_the_zero_chunk() {
        let chunk = compute_chunk(5_000.0, 0.0, 500.0);
        assert_eq!(chunk.index, 0);
        assert_eq!(chunk.start, 0.0);
    }
}
