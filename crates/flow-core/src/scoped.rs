use crate::blackboard::{BbKey, BbValue, Blackboard, BlackboardAccess, ObjKey};

/// A blackboard view that layers a local overlay over a parent layer.
///
/// Reads check the overlay first, then the parent chain. `set_local` shadows a key only inside
/// this view; `set_global` writes through to the root so the value is visible everywhere.
/// Clearing the overlay restores whatever the parent holds.
pub struct ScopedBlackboard<'p> {
    parent: &'p mut dyn BlackboardAccess,
    local: Blackboard,
}

impl<'p> ScopedBlackboard<'p> {
    pub fn new(parent: &'p mut dyn BlackboardAccess) -> Self {
        Self::with_local(parent, Blackboard::new())
    }

    /// Re-attach a previously detached overlay (see [`ScopedBlackboard::into_local`]).
    pub fn with_local(parent: &'p mut dyn BlackboardAccess, local: Blackboard) -> Self {
        Self { parent, local }
    }

    pub fn get<T: BbValue>(&self, key: BbKey<T>) -> Option<T> {
        let view: &dyn BlackboardAccess = self;
        view.get(key)
    }

    pub fn contains<T: BbValue>(&self, key: BbKey<T>) -> bool {
        let view: &dyn BlackboardAccess = self;
        view.contains(key)
    }

    pub fn get_obj<T: 'static>(&self, key: ObjKey<T>) -> Option<&T> {
        let view: &dyn BlackboardAccess = self;
        view.get_obj(key)
    }

    pub fn set_local<T: BbValue>(&mut self, key: BbKey<T>, value: T) {
        self.local.set(key, value);
    }

    pub fn set_global<T: BbValue>(&mut self, key: BbKey<T>, value: T) {
        let view: &mut dyn BlackboardAccess = self;
        view.set_global(key, value);
    }

    pub fn remove_local<T: BbValue>(&mut self, key: BbKey<T>) -> Option<T> {
        self.local.remove(key)
    }

    pub fn clear_local(&mut self) {
        self.local.clear();
    }

    pub fn local(&self) -> &Blackboard {
        &self.local
    }

    /// Detach the overlay, releasing the borrow of the parent.
    pub fn into_local(self) -> Blackboard {
        self.local
    }
}

impl BlackboardAccess for ScopedBlackboard<'_> {
    fn layer(&self) -> &Blackboard {
        &self.local
    }

    fn layer_mut(&mut self) -> &mut Blackboard {
        &mut self.local
    }

    fn parent(&self) -> Option<&dyn BlackboardAccess> {
        Some(&*self.parent)
    }

    fn parent_mut(&mut self) -> Option<&mut dyn BlackboardAccess> {
        Some(&mut *self.parent)
    }

    fn root(&self) -> &Blackboard {
        self.parent.root()
    }

    fn root_mut(&mut self) -> &mut Blackboard {
        self.parent.root_mut()
    }
}
