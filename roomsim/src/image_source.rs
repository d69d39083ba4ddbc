//! Image-source enumeration for rectangular rooms.
//!
//! Mirroring a source repeatedly across the two walls of one axis places an
//! image at `src + 2·o·dim` for every integer `o`. The enumerator walks the
//! lattice `[-max_order, max_order]^3` lazily, x outermost and z innermost, so
//! a consumer never holds more than one candidate at a time.

use crate::room::{Point3D, RoomModel};

/// One image source: lattice indices and mirrored position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MirroredSource {
    /// Lattice indices (ox, oy, oz)
    pub order: [i32; 3],
    /// Position of the image
    pub position: Point3D,
}

impl MirroredSource {
    /// Reflection order approximated as `|ox| + |oy| + |oz|`
    pub fn total_order(&self) -> u32 {
        total_order(self.order)
    }

    /// Whether this is the real source (no reflection)
    pub fn is_direct(&self) -> bool {
        self.order == [0, 0, 0]
    }
}

pub(crate) fn total_order(order: [i32; 3]) -> u32 {
    order.iter().map(|o| o.unsigned_abs()).sum()
}

/// Lazy iterator over the image sources of one real source.
///
/// Cloning yields an independent iterator from the same position, so a fresh
/// enumeration is one `image_sources` call (or one clone) away.
#[derive(Debug, Clone)]
pub struct ImageSources {
    source: Point3D,
    dims: [f64; 3],
    max_order: i32,
    next: Option<[i32; 3]>,
    remaining: usize,
}

/// Enumerate the `(2·max_order+1)^3` image sources of `source` in `room`
pub fn image_sources(room: &RoomModel, source: Point3D) -> ImageSources {
    let max_order = room.max_order() as i32;
    ImageSources {
        source,
        dims: room.dims(),
        max_order,
        next: Some([-max_order; 3]),
        remaining: room.candidate_count(),
    }
}

impl ImageSources {
    fn mirror(&self, order: [i32; 3]) -> Point3D {
        let axis = |src: f64, o: i32, dim: f64| src + 2.0 * o as f64 * dim;
        Point3D::new(
            axis(self.source.x, order[0], self.dims[0]),
            axis(self.source.y, order[1], self.dims[1]),
            axis(self.source.z, order[2], self.dims[2]),
        )
    }

    fn advance(&self, mut order: [i32; 3]) -> Option<[i32; 3]> {
        // odometer with z as the fastest digit
        for axis in (0..3).rev() {
            if order[axis] < self.max_order {
                order[axis] += 1;
                return Some(order);
            }
            order[axis] = -self.max_order;
        }
        None
    }
}

impl Iterator for ImageSources {
    type Item = MirroredSource;

    fn next(&mut self) -> Option<MirroredSource> {
        let order = self.next?;
        self.next = self.advance(order);
        self.remaining = self.remaining.saturating_sub(1);
        Some(MirroredSource {
            order,
            position: self.mirror(order),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ImageSources {}

impl std::iter::FusedIterator for ImageSources {}
