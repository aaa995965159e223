use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use uuid::Uuid;

/// Identifies a logical asset in the repository. Stable across file
/// moves/renames, never reused after the asset is deleted.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetId(pub u128);
impl AssetId {
    pub const fn null() -> Self {
        AssetId(0)
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        AssetId(uuid.as_u128())
    }

    pub fn as_uuid(&self) -> Uuid {
        Uuid::from_u128(self.0)
    }

    pub fn is_null(&self) -> bool {
        return self.0 == 0;
    }
}

impl Debug for AssetId {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_tuple("AssetId")
            .field(&Uuid::from_u128(self.0))
            .finish()
    }
}
