use smallvec::SmallVec;

use super::flush_strategy::FlushEffect;
use super::operation::Operation;

// Most of the time, users will send one or two operations per changeset.
type OperationBatch = SmallVec<[Operation; 4]>;

/// An ordered batch of operations, applied as one unit of commit-policy bookkeeping.
///
/// A streaming changeset belongs to a bulk load: it is not committed on its own and does
/// not raise reader generation requirements until the next explicit flush.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Changeset {
    operations: OperationBatch,
    streaming: bool,
}

impl Changeset {
    pub fn new<I: IntoIterator<Item = Operation>>(operations: I) -> Changeset {
        Changeset { operations: operations.into_iter().collect(), streaming: false }
    }

    pub fn streaming<I: IntoIterator<Item = Operation>>(operations: I) -> Changeset {
        Changeset { operations: operations.into_iter().collect(), streaming: true }
    }

    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn with_operation(mut self, operation: Operation) -> Changeset {
        self.push(operation);
        self
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Union of the staleness raised by every operation.
    pub fn flush_effect(&self) -> FlushEffect {
        self.operations.iter().fold(FlushEffect::NONE, |effect, operation| effect | operation.flush_effect())
    }

    pub fn requests_flush(&self) -> bool {
        self.operations.iter().any(|operation| matches!(operation, Operation::Flush))
    }
}

impl FromIterator<Operation> for Changeset {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Changeset::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Term;

    #[test]
    fn test_changeset_effect_and_flush() {
        let changeset = Changeset::new(vec![Operation::Add(doc!("a"))]);
        assert_eq!(changeset.flush_effect(), FlushEffect::WRITES);
        assert!(!changeset.requests_flush());
        assert!(!changeset.is_streaming());

        let changeset = changeset.with_operation(Operation::Delete(Term::for_id("b")));
        assert_eq!(changeset.flush_effect(), FlushEffect::WRITES_AND_DELETES);
        assert_eq!(changeset.len(), 2);

        let changeset: Changeset = vec![Operation::Flush].into_iter().collect();
        assert!(changeset.requests_flush());
    }

    #[test]
    fn test_streaming_changeset() {
        let changeset = Changeset::streaming(vec![Operation::Add(doc!("a")), Operation::Add(doc!("b"))]);
        assert!(changeset.is_streaming());
        assert!(!changeset.is_empty());
        assert_eq!(Changeset::default().flush_effect(), FlushEffect::NONE);
    }
}
