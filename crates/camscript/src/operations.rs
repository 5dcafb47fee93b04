//! The operation registry and the objects the host tree can hand to it.

use crate::error::{CamError, Result};
use crate::geometry::Geometry;
use crate::operation::{Operation, OperationId, OperationKind};
use crate::types::CuttingTool;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Any object the host may try to put under a program container.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeObject {
    Operation(Operation),
    CuttingTool(CuttingTool),
    /// Hand-written or generated NC text.
    NcCode(String),
    Geometry(Geometry),
}

impl TreeObject {
    pub fn type_name(&self) -> &'static str {
        match self {
            TreeObject::Operation(_) => "Operation",
            TreeObject::CuttingTool(_) => "CuttingTool",
            TreeObject::NcCode(_) => "NcCode",
            TreeObject::Geometry(_) => "Geometry",
        }
    }
}

impl From<Operation> for TreeObject {
    fn from(operation: Operation) -> Self {
        TreeObject::Operation(operation)
    }
}

impl From<CuttingTool> for TreeObject {
    fn from(tool: CuttingTool) -> Self {
        TreeObject::CuttingTool(tool)
    }
}

impl From<Geometry> for TreeObject {
    fn from(geometry: Geometry) -> Self {
        TreeObject::Geometry(geometry)
    }
}

/// Operations of a program, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operations {
    operations: Vec<Operation>,
}

impl Operations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child object, returning its index. Anything but an operation is
    /// refused and the registry is left as it was. An operation whose id is
    /// already registered gets a fresh id so lookups stay unambiguous.
    pub fn add(&mut self, object: impl Into<TreeObject>) -> Result<usize> {
        match object.into() {
            TreeObject::Operation(mut operation) => {
                if self.get(operation.id).is_some() {
                    let fresh = OperationId::new();
                    warn!(duplicate = %operation.id, operation = %fresh, "operation id already in use, assigning a new one");
                    operation.id = fresh;
                }
                debug!(operation = %operation.id, kind = operation.kind().name(), "add operation");
                self.operations.push(operation);
                Ok(self.operations.len() - 1)
            }
            other => Err(CamError::InvalidChild {
                container: "Operations",
                kind: other.type_name(),
            }),
        }
    }

    pub fn remove(&mut self, id: OperationId) -> Option<Operation> {
        let index = self.operations.iter().position(|op| op.id == id)?;
        Some(self.operations.remove(index))
    }

    pub fn get(&self, id: OperationId) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }

    pub fn get_mut(&mut self, id: OperationId) -> Option<&mut Operation> {
        self.operations.iter_mut().find(|op| op.id == id)
    }

    /// Operations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Operation> {
        self.operations.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Whether any operation of this kind exists, active or not.
    pub fn contains_kind(&self, kind: OperationKind) -> bool {
        self.operations.iter().any(|op| op.kind() == kind)
    }

    /// Operations in emission order: ascending execution order, ties in
    /// insertion order.
    pub fn sorted(&self) -> Vec<&Operation> {
        let mut sorted: Vec<&Operation> = self.operations.iter().collect();
        sorted.sort_by_key(|op| op.execution_order);
        sorted
    }
}

/// Receives a notification for every operation a command changes.
pub trait ModificationListener {
    fn was_modified(&mut self, operation: &Operation);
}

/// A listener that ignores notifications.
impl ModificationListener for () {
    fn was_modified(&mut self, _operation: &Operation) {}
}

/// Collects the ids of modified operations.
impl ModificationListener for Vec<OperationId> {
    fn was_modified(&mut self, operation: &Operation) {
        self.push(operation.id);
    }
}

fn set_all(
    operations: &mut Operations,
    listener: &mut dyn ModificationListener,
    active: bool,
) -> usize {
    let mut changed = 0;
    for operation in operations.iter_mut() {
        if operation.active != active {
            operation.active = active;
            listener.was_modified(operation);
            changed += 1;
        }
    }
    debug!(active, changed, "set all operations");
    changed
}

/// Turn every operation on.
pub struct SetAllActive<'a> {
    pub operations: &'a mut Operations,
    pub listener: &'a mut dyn ModificationListener,
}

impl<'a> SetAllActive<'a> {
    pub fn new(operations: &'a mut Operations, listener: &'a mut dyn ModificationListener) -> Self {
        Self {
            operations,
            listener,
        }
    }

    pub fn title(&self) -> &'static str {
        "Set All Active"
    }

    /// Returns the number of operations that changed.
    pub fn run(self) -> usize {
        set_all(self.operations, self.listener, true)
    }
}

/// Turn every operation off.
pub struct SetAllInactive<'a> {
    pub operations: &'a mut Operations,
    pub listener: &'a mut dyn ModificationListener,
}

impl<'a> SetAllInactive<'a> {
    pub fn new(operations: &'a mut Operations, listener: &'a mut dyn ModificationListener) -> Self {
        Self {
            operations,
            listener,
        }
    }

    pub fn title(&self) -> &'static str {
        "Set All Inactive"
    }

    pub fn run(self) -> usize {
        set_all(self.operations, self.listener, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drilling::DrillingParams;
    use crate::geometry::{Geometry, Point3};
    use crate::operation::OperationParams;
    use crate::profile::ProfileParams;
    use crate::types::ToolKind;

    fn profile(order: i32) -> Operation {
        Operation::new("Profile", OperationParams::Profile(ProfileParams::default()))
            .with_order(order)
    }

    #[test]
    fn test_sorted_is_stable() {
        let mut ops = Operations::new();
        let a = profile(2);
        let b = profile(1);
        let c = profile(2);
        let d = profile(1);
        let ids = [a.id, b.id, c.id, d.id];
        for op in [a, b, c, d] {
            ops.add(op).unwrap();
        }

        let order: Vec<OperationId> = ops.sorted().iter().map(|op| op.id).collect();
        assert_eq!(order, vec![ids[1], ids[3], ids[0], ids[2]]);
    }

    fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut all = Vec::new();
        for (i, &first) in items.iter().enumerate() {
            let mut rest = items.to_vec();
            rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, first);
                all.push(tail);
            }
        }
        all
    }

    #[test]
    fn test_sorted_keeps_insertion_order_for_every_permutation() {
        let orders = [5, 1, 5, 5, 1];
        for permutation in permutations(&[0, 1, 2, 3, 4]) {
            let mut ops = Operations::new();
            let mut inserted = Vec::new();
            for &i in &permutation {
                let op = profile(orders[i]);
                inserted.push((orders[i], op.id));
                ops.add(op).unwrap();
            }

            let sorted: Vec<(i32, OperationId)> = ops
                .sorted()
                .iter()
                .map(|op| (op.execution_order, op.id))
                .collect();
            let mut expected = inserted.clone();
            expected.sort_by_key(|&(order, _)| order);
            assert_eq!(sorted, expected, "insertion order {permutation:?}");
        }
    }

    #[test]
    fn test_duplicate_id_gets_a_fresh_one() {
        let mut ops = Operations::new();
        let original = profile(1);
        let copy = original.clone();
        ops.add(original.clone()).unwrap();
        let index = ops.add(copy).unwrap();

        assert_eq!(ops.len(), 2);
        let reassigned = ops.iter().nth(index).unwrap().id;
        assert_ne!(reassigned, original.id);
        assert_eq!(ops.get(original.id).unwrap().execution_order, 1);
        assert!(ops.remove(reassigned).is_some());
        assert!(ops.get(original.id).is_some());
    }

    #[test]
    fn test_add_refuses_other_objects() {
        let mut ops = Operations::new();
        ops.add(profile(0)).unwrap();
        let before = ops.clone();

        let err = ops
            .add(CuttingTool::new(1, "Endmill", ToolKind::EndMill, 3.0))
            .unwrap_err();
        assert!(matches!(
            err,
            CamError::InvalidChild {
                container: "Operations",
                kind: "CuttingTool"
            }
        ));
        assert!(ops
            .add(Geometry::Point(Point3::new(0.0, 0.0, 0.0)))
            .is_err());
        assert_eq!(ops, before);
    }

    #[test]
    fn test_contains_kind_ignores_active_flag() {
        let mut ops = Operations::new();
        ops.add(
            Operation::new("Holes", OperationParams::Drilling(DrillingParams::default()))
                .with_active(false),
        )
        .unwrap();
        assert!(ops.contains_kind(OperationKind::Drilling));
        assert!(!ops.contains_kind(OperationKind::Pocket));
    }

    #[test]
    fn test_remove_and_get() {
        let mut ops = Operations::new();
        let op = profile(0);
        let id = op.id;
        ops.add(op).unwrap();
        ops.get_mut(id).unwrap().title = "Outline".into();
        assert_eq!(ops.get(id).unwrap().title, "Outline");
        assert_eq!(ops.remove(id).map(|op| op.id), Some(id));
        assert!(ops.is_empty());
        assert!(ops.remove(id).is_none());
    }

    #[test]
    fn test_set_all_commands_notify_changed_operations() {
        let mut ops = Operations::new();
        let on = profile(0);
        let off = profile(1).with_active(false);
        let off_id = off.id;
        ops.add(on).unwrap();
        ops.add(off).unwrap();

        let mut modified: Vec<OperationId> = Vec::new();
        let command = SetAllActive::new(&mut ops, &mut modified);
        assert_eq!(command.title(), "Set All Active");
        assert_eq!(command.run(), 1);
        assert_eq!(modified, vec![off_id]);
        assert!(ops.iter().all(|op| op.active));

        let mut modified: Vec<OperationId> = Vec::new();
        assert_eq!(SetAllInactive::new(&mut ops, &mut modified).run(), 2);
        assert_eq!(modified.len(), 2);
        assert!(ops.iter().all(|op| !op.active));
    }
}
