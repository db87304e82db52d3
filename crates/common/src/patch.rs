// Partial document updates.
//
// A save only carries the fields that have work at dispatch time. Each field
// is three-state on the wire: omitted (leave unchanged), `null` (clear), or a
// value (set).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// One field of a partial update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchField<T> {
    /// Field absent from the patch; the stored value is left alone.
    Unchanged,
    /// Field present as `null`; the stored value is cleared.
    Clear,
    /// Field present with a value.
    Set(T),
}

impl<T> Default for PatchField<T> {
    fn default() -> Self {
        Self::Unchanged
    }
}

impl<T> PatchField<T> {
    /// `None` becomes `Clear`, `Some(v)` becomes `Set(v)`.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Set(v),
            None => Self::Clear,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    pub fn is_present(&self) -> bool {
        !self.is_unchanged()
    }

    /// `None` when unchanged, otherwise the value the field is being set to.
    pub fn as_update(&self) -> Option<Option<&T>> {
        match self {
            Self::Unchanged => None,
            Self::Clear => Some(None),
            Self::Set(v) => Some(Some(v)),
        }
    }

    /// Take the field out, leaving `Unchanged` behind.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl<T: Serialize> Serialize for PatchField<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unchanged | Self::Clear => serializer.serialize_none(),
            Self::Set(v) => serializer.serialize_some(v),
        }
    }
}

// Absent fields never reach this impl; they fall back to `Default` through
// `#[serde(default)]` on the containing struct field.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for PatchField<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from_option)
    }
}

/// A partial update dispatched to the persistence service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePatch {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "PatchField::is_unchanged")]
    pub title: PatchField<String>,
    #[serde(default, skip_serializing_if = "PatchField::is_unchanged")]
    pub content: PatchField<String>,
}

impl SavePatch {
    pub fn new(id: Uuid) -> Self {
        Self { id, title: PatchField::Unchanged, content: PatchField::Unchanged }
    }

    pub fn with_title(mut self, title: PatchField<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_content(mut self, content: PatchField<String>) -> Self {
        self.content = content;
        self
    }

    /// True if at least one field would change server state.
    pub fn has_work(&self) -> bool {
        self.title.is_present() || self.content.is_present()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn id() -> Uuid {
        Uuid::parse_str("6f1c2b9e-8a43-4b8e-9d6a-1f2e3d4c5b6a").unwrap()
    }

    #[test]
    fn unchanged_fields_are_omitted() {
        let patch = SavePatch::new(id()).with_content(PatchField::Set("AB".into()));
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({ "id": id(), "content": "AB" }));
    }

    #[test]
    fn cleared_fields_serialize_as_null() {
        let patch = SavePatch::new(id()).with_title(PatchField::Clear);
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({ "id": id(), "title": null }));
    }

    #[test]
    fn deserialize_distinguishes_absent_null_and_value() {
        let patch: SavePatch =
            serde_json::from_value(json!({ "id": id(), "title": null, "content": "x" })).unwrap();
        assert_eq!(patch.title, PatchField::Clear);
        assert_eq!(patch.content, PatchField::Set("x".to_string()));

        let patch: SavePatch = serde_json::from_value(json!({ "id": id() })).unwrap();
        assert!(patch.title.is_unchanged());
        assert!(patch.content.is_unchanged());
        assert!(!patch.has_work());
    }

    #[test]
    fn take_leaves_unchanged_behind() {
        let mut field = PatchField::Set("t".to_string());
        assert_eq!(field.take(), PatchField::Set("t".to_string()));
        assert!(field.is_unchanged());
    }

    #[test]
    fn as_update_maps_three_states() {
        assert_eq!(PatchField::<String>::Unchanged.as_update(), None);
        assert_eq!(PatchField::<String>::Clear.as_update(), Some(None));
        let set = PatchField::Set("v".to_string());
        assert_eq!(set.as_update(), Some(Some(&"v".to_string())));
    }
}
