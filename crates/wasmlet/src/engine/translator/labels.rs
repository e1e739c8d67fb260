use crate::{
    ir::{BranchOffset, Instr, InstrSequence, Instruction},
    Error,
};

/// A reference to a branch target label.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LabelRef(usize);

/// The state of a single label.
#[derive(Debug)]
enum Label {
    /// The label has been pinned to an instruction position.
    Pinned(Instr),
    /// The label is not yet pinned; the recorded branch instructions are
    /// patched once it is.
    Unpinned(Vec<Instr>),
}

/// Allocates and resolves the branch target labels of one function body.
///
/// Backward branches (to loop headers) resolve immediately; forward
/// branches emit a placeholder offset that is patched when the matching
/// `end` pins the label.
#[derive(Debug, Default)]
pub struct LabelRegistry {
    labels: Vec<Label>,
}

impl LabelRegistry {
    /// Allocates a new unpinned label.
    pub fn new_label(&mut self) -> LabelRef {
        let label = LabelRef(self.labels.len());
        self.labels.push(Label::Unpinned(Vec::new()));
        label
    }

    /// Pins `label` to the next instruction position of `instrs` and
    /// patches all branches recorded against it.
    ///
    /// # Errors
    ///
    /// If a patched branch offset does not fit its encoding.
    ///
    /// # Panics
    ///
    /// If `label` has already been pinned.
    pub fn pin_label(&mut self, label: LabelRef, instrs: &mut InstrSequence) -> Result<(), Error> {
        let dst = instrs.next_instr();
        let users = match &mut self.labels[label.0] {
            Label::Pinned(pinned) => panic!("label already pinned to {pinned:?}"),
            Label::Unpinned(users) => core::mem::take(users),
        };
        for user in users {
            instrs.patch_branch(user, dst)?;
        }
        self.labels[label.0] = Label::Pinned(dst);
        Ok(())
    }

    /// Pushes a branching instruction targeting `label`.
    ///
    /// `make` receives the branch offset, which is zero (a placeholder) for
    /// not yet pinned labels.
    ///
    /// # Errors
    ///
    /// If the branch offset does not fit its encoding.
    pub fn branch_to(
        &mut self,
        label: LabelRef,
        instrs: &mut InstrSequence,
        make: impl FnOnce(BranchOffset) -> Instruction,
    ) -> Result<(), Error> {
        let src = instrs.next_instr();
        match &mut self.labels[label.0] {
            Label::Pinned(dst) => {
                let offset = BranchOffset::from_src_to_dst(src, *dst)?;
                instrs.push(make(offset));
            }
            Label::Unpinned(users) => {
                users.push(src);
                instrs.push(make(BranchOffset::uninit()));
            }
        }
        Ok(())
    }

    /// Records the already emitted branching instruction at `user` as
    /// targeting `label`, patching it immediately for pinned labels.
    ///
    /// # Errors
    ///
    /// If the branch offset does not fit its encoding.
    pub fn register_user(
        &mut self,
        label: LabelRef,
        user: Instr,
        instrs: &mut InstrSequence,
    ) -> Result<(), Error> {
        match &mut self.labels[label.0] {
            Label::Pinned(dst) => instrs.patch_branch(user, *dst)?,
            Label::Unpinned(users) => users.push(user),
        }
        Ok(())
    }
}
