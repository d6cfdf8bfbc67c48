//! Dock records and workload types.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

/// Hash field holding the dock URL.
pub const FIELD_HOST: &str = "host";
/// Hash field holding the dock's comma separated labels.
pub const FIELD_TAGS: &str = "tags";

/// The two kinds of workload the scheduler tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadType {
    ContainerRun,
    ContainerBuild,
}

impl WorkloadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadType::ContainerRun => "container_run",
            WorkloadType::ContainerBuild => "container_build",
        }
    }

    /// The per-dock counter this workload type loads.
    pub fn counter(&self) -> CounterField {
        match self {
            WorkloadType::ContainerRun => CounterField::NumContainers,
            WorkloadType::ContainerBuild => CounterField::NumBuilds,
        }
    }
}

impl fmt::Display for WorkloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized workload type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWorkloadType(pub String);

impl FromStr for WorkloadType {
    type Err = UnknownWorkloadType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "container_run" => Ok(WorkloadType::ContainerRun),
            "container_build" => Ok(WorkloadType::ContainerBuild),
            other => Err(UnknownWorkloadType(other.to_string())),
        }
    }
}

/// Load counters stored on every dock record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterField {
    NumBuilds,
    NumContainers,
}

impl CounterField {
    pub const ALL: [CounterField; 2] = [CounterField::NumBuilds, CounterField::NumContainers];

    /// Name of the field inside the stored hash.
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterField::NumBuilds => "numBuilds",
            CounterField::NumContainers => "numContainers",
        }
    }
}

impl fmt::Display for CounterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CounterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CounterField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("'{s}' is not a counter field"))
    }
}

/// A stored record exactly as the store returned it, possibly incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawDockRecord {
    /// Registry key the record was read from.
    pub key: String,

    /// Every field present in the stored hash.
    pub fields: HashMap<String, String>,
}

impl RawDockRecord {
    /// Convert into a [`DockRecord`], or `None` if the record is not valid for
    /// selection.
    ///
    /// Negative counters are clamped to zero here; the stored value is left
    /// untouched.
    pub fn to_valid(&self) -> Option<DockRecord> {
        let host = self.fields.get(FIELD_HOST)?;
        let num_builds = self.counter(CounterField::NumBuilds)?;
        let num_containers = self.counter(CounterField::NumContainers)?;

        Some(DockRecord {
            host: host.clone(),
            num_builds,
            num_containers,
            tags: self.fields.get(FIELD_TAGS).cloned().unwrap_or_default(),
        })
    }

    fn counter(&self, field: CounterField) -> Option<i64> {
        let raw = self.fields.get(field.as_str())?;
        let value = match raw.trim().parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                debug!(key = %self.key, field = %field, value = %raw, "Counter is not an integer");
                return None;
            }
        };
        if value < 0 {
            debug!(key = %self.key, field = %field, value, "Clamping negative counter");
        }
        Some(value.max(0))
    }
}

/// A dock eligible for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DockRecord {
    pub host: String,
    pub num_builds: i64,
    pub num_containers: i64,
    pub tags: String,
}

impl DockRecord {
    pub fn counter(&self, field: CounterField) -> i64 {
        match field {
            CounterField::NumBuilds => self.num_builds,
            CounterField::NumContainers => self.num_containers,
        }
    }

    /// Whether one of the comma separated labels equals `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.split(',').map(str::trim).any(|t| !t.is_empty() && t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn raw(fields: &[(&str, &str)]) -> RawDockRecord {
        RawDockRecord {
            key: "http://10.0.0.1:4242".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_workload_type_maps_to_counter() {
        assert_eq!(WorkloadType::ContainerRun.counter(), CounterField::NumContainers);
        assert_eq!(WorkloadType::ContainerBuild.counter(), CounterField::NumBuilds);
        assert!("container_stop".parse::<WorkloadType>().is_err());
    }

    #[test]
    fn test_complete_record_is_valid() {
        let record = raw(&[
            ("host", "http://10.0.0.1:4242"),
            ("numBuilds", "2"),
            ("numContainers", "5"),
            ("tags", "gpu, large"),
        ])
        .to_valid()
        .unwrap();

        assert_eq!(record.num_builds, 2);
        assert_eq!(record.num_containers, 5);
        assert!(record.has_tag("large"));
        assert!(!record.has_tag("small"));
    }

    #[test]
    fn test_missing_tags_default_to_empty() {
        let record = raw(&[
            ("host", "http://10.0.0.1:4242"),
            ("numBuilds", "0"),
            ("numContainers", "0"),
        ])
        .to_valid()
        .unwrap();
        assert_eq!(record.tags, "");
        assert!(!record.has_tag(""));
    }

    #[test]
    fn test_negative_counter_is_clamped() {
        let record = raw(&[
            ("host", "http://10.0.0.1:4242"),
            ("numBuilds", "-3"),
            ("numContainers", "1"),
        ])
        .to_valid()
        .unwrap();
        assert_eq!(record.num_builds, 0);
    }

    #[rstest]
    #[case(&[("numBuilds", "1"), ("numContainers", "1")])]
    #[case(&[("host", "http://h:1"), ("numContainers", "1")])]
    #[case(&[("host", "http://h:1"), ("numBuilds", "1")])]
    #[case(&[("host", "http://h:1"), ("numBuilds", "many"), ("numContainers", "1")])]
    fn test_incomplete_record_is_invalid(#[case] fields: &[(&str, &str)]) {
        assert!(raw(fields).to_valid().is_none());
    }

    proptest! {
        #[test]
        fn records_missing_a_required_field_are_never_valid(
            missing in 0usize..3,
            builds in any::<i64>(),
            containers in any::<i64>(),
        ) {
            let builds = builds.to_string();
            let containers = containers.to_string();
            let mut fields = vec![
                ("host", "http://10.0.0.1:4242"),
                ("numBuilds", builds.as_str()),
                ("numContainers", containers.as_str()),
            ];
            fields.remove(missing);
            prop_assert!(raw(&fields).to_valid().is_none());
        }
    }
}
