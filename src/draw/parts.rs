use crate::foundation::core::Rect;

/// Caller-supplied selection of source regions and where they land.
///
/// Evaluated before any image lock is taken, so implementations may freely call back into image
/// operations (including sampling the images involved in the draw).
pub trait ImageParts {
    /// Number of parts.
    fn len(&self) -> usize;

    /// Destination rectangle of part `i`, in the destination's local space.
    fn dst(&self, i: usize) -> Rect;

    /// Source rectangle of part `i`, in source pixels.
    fn src(&self, i: usize) -> Rect;

    /// True when there are no parts.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One explicit source-to-destination mapping.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImagePart {
    /// Destination rectangle.
    pub dst: Rect,
    /// Source rectangle.
    pub src: Rect,
}

impl ImageParts for Vec<ImagePart> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn dst(&self, i: usize) -> Rect {
        self[i].dst
    }

    fn src(&self, i: usize) -> Rect {
        self[i].src
    }
}

/// The whole source drawn at the origin, unscaled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WholeImage {
    pub width: u32,
    pub height: u32,
}

impl ImageParts for WholeImage {
    fn len(&self) -> usize {
        1
    }

    fn dst(&self, _i: usize) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    fn src(&self, _i: usize) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}
