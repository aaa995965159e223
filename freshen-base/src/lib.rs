pub mod hashing;

mod asset_id;
pub use asset_id::AssetId;

mod content_digest;
pub use content_digest::ContentDigest;
