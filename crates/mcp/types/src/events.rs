//! Change notifications emitted by the store

use crate::ids::ObjectKey;
use crate::record::RecordKind;
use crate::work::owner_from_labels;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
}

/// A record of some kind changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub kind: RecordKind,

    pub event_type: WatchEventType,

    pub key: ObjectKey,

    /// Labels of the record at the time of the change
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl WatchEvent {
    pub fn new(
        kind: RecordKind,
        event_type: WatchEventType,
        key: ObjectKey,
        labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            kind,
            event_type,
            key,
            labels,
        }
    }

    /// The Deployable a change should wake up, if any
    ///
    /// Deployable events map to themselves; Work events map to the
    /// Deployable named by their owner labels.
    pub fn deployable_key(&self) -> Option<ObjectKey> {
        match self.kind {
            RecordKind::Deployable => Some(self.key.clone()),
            RecordKind::Work => owner_from_labels(&self.labels),
            RecordKind::Manifest => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Deployable, Record, Work};

    #[test]
    fn test_deployable_event_maps_to_itself() {
        let key = ObjectKey::new("default", "web");
        let event = WatchEvent::new(
            RecordKind::Deployable,
            WatchEventType::Modified,
            key.clone(),
            BTreeMap::new(),
        );
        assert_eq!(event.deployable_key(), Some(key));
    }

    #[test]
    fn test_work_event_maps_to_owner() {
        let work = Work::for_deployable("east", &Deployable::new("default", "web"));
        let event = WatchEvent::new(
            RecordKind::Work,
            WatchEventType::Deleted,
            work.key(),
            work.metadata.labels.clone(),
        );
        assert_eq!(event.deployable_key(), Some(ObjectKey::new("default", "web")));
    }

    #[test]
    fn test_manifest_event_maps_to_nothing() {
        let event = WatchEvent::new(
            RecordKind::Manifest,
            WatchEventType::Added,
            ObjectKey::new("default", "apps-v1-deployment-web"),
            BTreeMap::new(),
        );
        assert_eq!(event.deployable_key(), None);
    }
}
