use serde::{Deserialize, Serialize};

/// Identifier of an [`AlarmRecord`](crate::AlarmRecord). Assigned by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(pub i64);

/// Identifier of an [`AlarmInstance`](crate::AlarmInstance). Distinct from the record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub i64);

impl AlarmId {
    /// Placeholder id for a record that has not been persisted yet.
    pub const INVALID: AlarmId = AlarmId(-1);

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl InstanceId {
    /// Placeholder id for an instance that has not been persisted yet.
    pub const INVALID: InstanceId = InstanceId(-1);

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl std::fmt::Display for AlarmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for InstanceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(InstanceId)
    }
}

impl std::str::FromStr for AlarmId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(AlarmId)
    }
}
