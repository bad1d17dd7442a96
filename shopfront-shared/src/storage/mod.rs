/// Product image storage
///
/// - [`images`]: validated writes, mirror directory, removal, listing
/// - [`cleanup`]: background queue for removing files that lost their product

pub mod cleanup;
pub mod images;

pub use cleanup::CleanupQueue;
pub use images::{
    ImageKind, ImageStore, ImageUpload, MirrorSyncReport, StorageConfig, StorageError,
    StoredImage,
};
