use super::domain::ListingDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Floorplan,
}

/// Boundaries of one publish's upload batch.
///
/// Uploads are staged as images, then videos, then floorplans; the batch
/// index of a result alone decides which field it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UploadPlan {
    images: usize,
    videos: usize,
    floorplans: usize,
}

impl UploadPlan {
    pub(crate) fn new(images: usize, videos: usize, floorplans: usize) -> Self {
        Self {
            images,
            videos,
            floorplans,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.images + self.videos + self.floorplans
    }

    pub(crate) fn kind_at(&self, index: usize) -> MediaKind {
        if index < self.images {
            MediaKind::Image
        } else if index < self.images + self.videos {
            MediaKind::Video
        } else {
            MediaKind::Floorplan
        }
    }

    /// Append uploaded paths, given in staging order, to the draft's fields.
    pub(crate) fn assign(&self, draft: &mut ListingDraft, paths: impl IntoIterator<Item = String>) {
        for (index, path) in paths.into_iter().enumerate() {
            let field = match self.kind_at(index) {
                MediaKind::Image => &mut draft.images,
                MediaKind::Video => &mut draft.videos,
                MediaKind::Floorplan => &mut draft.floorplans,
            };
            field.get_or_insert_with(Vec::new).push(path);
        }
    }
}
