/// Opaque edit payload passed through to the decode adapter.
///
/// The scheduler never inspects this beyond keying generation increments;
/// treat it as inert data (per the "Edit-state payload" design note).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EditState(pub serde_json::Value);

impl EditState {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }
}
