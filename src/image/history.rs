use std::sync::{Arc, Weak};

use crate::{
    backend::texture::{DrawParams, TexturedQuad},
    image::store::ImageStore,
};

/// One recorded composite draw onto the owning image.
///
/// `source` is a non-owning back-reference: it identifies the source image and reports whether
/// it is still alive, but never keeps it alive.
#[derive(Clone, Debug)]
pub(crate) struct DrawRecord {
    pub(crate) source: Weak<ImageStore>,
    pub(crate) quads: Vec<TexturedQuad>,
    pub(crate) params: DrawParams,
}

impl DrawRecord {
    pub(crate) fn new(source: &Arc<ImageStore>, quads: Vec<TexturedQuad>, params: DrawParams) -> Self {
        Self {
            source: Arc::downgrade(source),
            quads,
            params,
        }
    }

    pub(crate) fn is_from(&self, target: &ImageStore) -> bool {
        std::ptr::eq(self.source.as_ptr(), target)
    }
}

/// Ordered log of draws since the image content was last flattened.
#[derive(Debug, Default)]
pub(crate) struct DrawHistory {
    records: Vec<DrawRecord>,
}

impl DrawHistory {
    pub(crate) fn push(&mut self, record: DrawRecord) {
        self.records.push(record);
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn references(&self, target: &ImageStore) -> bool {
        self.records.iter().any(|r| r.is_from(target))
    }

    pub(crate) fn to_vec(&self) -> Vec<DrawRecord> {
        self.records.clone()
    }
}
