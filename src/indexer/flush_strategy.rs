use std::ops::{BitOr, BitOrAssign};

use super::operation::OperationKind;

/// Staleness raised by applying an operation.
///
/// Added documents become visible to NRT snapshots as is; deletions only become
/// visible once pending deletes are applied, which is the more expensive flush.
/// Both dimensions are therefore tracked separately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushEffect {
    pub writes: bool,
    pub deletes: bool,
}

impl FlushEffect {
    pub const NONE: FlushEffect = FlushEffect { writes: false, deletes: false };
    pub const WRITES: FlushEffect = FlushEffect { writes: true, deletes: false };
    pub const DELETES: FlushEffect = FlushEffect { writes: false, deletes: true };
    pub const WRITES_AND_DELETES: FlushEffect = FlushEffect { writes: true, deletes: true };

    pub fn is_empty(&self) -> bool {
        !self.writes && !self.deletes
    }
}

impl BitOr for FlushEffect {
    type Output = FlushEffect;

    fn bitor(self, rhs: FlushEffect) -> FlushEffect {
        FlushEffect { writes: self.writes || rhs.writes, deletes: self.deletes || rhs.deletes }
    }
}

impl BitOrAssign for FlushEffect {
    fn bitor_assign(&mut self, rhs: FlushEffect) {
        *self = *self | rhs;
    }
}

/// Maps each kind of operation to the staleness it raises.
///
/// Adding a variant to [`OperationKind`] fails compilation here until its effect is declared.
pub fn flush_effect(kind: OperationKind) -> FlushEffect {
    match kind {
        OperationKind::Add | OperationKind::Optimize => FlushEffect::WRITES,
        OperationKind::Delete | OperationKind::PurgeAll | OperationKind::DeleteByQuery => {
            FlushEffect::DELETES
        }
        OperationKind::Update | OperationKind::Flush => FlushEffect::WRITES_AND_DELETES,
    }
}
