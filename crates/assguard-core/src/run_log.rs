use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Provision,
    List,
    Extract,
    Normalize,
    Load,
    Materialize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncEvent {
    pub stage: SyncStage,
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

/// Structured event sink carried through the run instead of ambient
/// logger state. Events accumulate in order of emission.
#[derive(Debug, Default, Clone)]
pub struct RunLog {
    events: Vec<SyncEvent>,
}

impl RunLog {
    pub fn emit(
        &mut self,
        stage: SyncStage,
        name: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) {
        self.events.push(SyncEvent {
            stage,
            name: name.into(),
            fields,
        });
    }

    pub fn emit_field(
        &mut self,
        stage: SyncStage,
        name: impl Into<String>,
        key: &str,
        value: impl Into<String>,
    ) {
        self.emit(
            stage,
            name,
            BTreeMap::from([(key.to_string(), value.into())]),
        );
    }

    #[must_use]
    pub fn events(&self) -> &[SyncEvent] {
        &self.events
    }
}
