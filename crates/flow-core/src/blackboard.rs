use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// Typed key for a value stored in one of the blackboard's per-type tables.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    id: u64,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    pub fn id(self) -> u64 {
        self.id
    }
}

/// Typed key for an arbitrary object value (stored boxed, in its own table).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjKey<T: 'static> {
    id: u64,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for ObjKey<T> {}

impl<T: 'static> Clone for ObjKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> ObjKey<T> {
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    pub fn id(self) -> u64 {
        self.id
    }
}

/// A value type with a dedicated table on the [`Blackboard`].
///
/// Lookups for these types never box or downcast: each type resolves statically to its own map.
pub trait BbValue: Clone + 'static {
    #[doc(hidden)]
    fn table(bb: &Blackboard) -> &BTreeMap<u64, Self>;

    #[doc(hidden)]
    fn table_mut(bb: &mut Blackboard) -> &mut BTreeMap<u64, Self>;
}

macro_rules! bb_values {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl BbValue for $ty {
                fn table(bb: &Blackboard) -> &BTreeMap<u64, Self> {
                    &bb.$field
                }

                fn table_mut(bb: &mut Blackboard) -> &mut BTreeMap<u64, Self> {
                    &mut bb.$field
                }
            }
        )*
    };
}

bb_values! {
    bool => bools,
    i32 => i32s,
    i64 => i64s,
    u32 => u32s,
    u64 => u64s,
    f32 => f32s,
    f64 => f64s,
    String => strings,
}

/// Type-segregated key/value store shared by the nodes of a tree.
#[derive(Default)]
pub struct Blackboard {
    bools: BTreeMap<u64, bool>,
    i32s: BTreeMap<u64, i32>,
    i64s: BTreeMap<u64, i64>,
    u32s: BTreeMap<u64, u32>,
    u64s: BTreeMap<u64, u64>,
    f32s: BTreeMap<u64, f32>,
    f64s: BTreeMap<u64, f64>,
    strings: BTreeMap<u64, String>,
    objects: BTreeMap<u64, Box<dyn Any>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.bools.clear();
        self.i32s.clear();
        self.i64s.clear();
        self.u32s.clear();
        self.u64s.clear();
        self.f32s.clear();
        self.f64s.clear();
        self.strings.clear();
        self.objects.clear();
    }

    /// Total number of entries across all tables.
    pub fn len(&self) -> usize {
        self.bools.len()
            + self.i32s.len()
            + self.i64s.len()
            + self.u32s.len()
            + self.u64s.len()
            + self.f32s.len()
            + self.f64s.len()
            + self.strings.len()
            + self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains<T: BbValue>(&self, key: BbKey<T>) -> bool {
        T::table(self).contains_key(&key.id)
    }

    pub fn get<T: BbValue>(&self, key: BbKey<T>) -> Option<T> {
        T::table(self).get(&key.id).cloned()
    }

    pub fn set<T: BbValue>(&mut self, key: BbKey<T>, value: T) {
        T::table_mut(self).insert(key.id, value);
    }

    pub fn remove<T: BbValue>(&mut self, key: BbKey<T>) -> Option<T> {
        T::table_mut(self).remove(&key.id)
    }

    pub fn contains_obj<T: 'static>(&self, key: ObjKey<T>) -> bool {
        self.objects.contains_key(&key.id)
    }

    pub fn set_obj<T: 'static>(&mut self, key: ObjKey<T>, value: T) {
        self.objects.insert(key.id, Box::new(value));
    }

    pub fn get_obj<T: 'static>(&self, key: ObjKey<T>) -> Option<&T> {
        let value = self.objects.get(&key.id)?;
        value.downcast_ref::<T>().or_else(|| {
            panic!(
                "blackboard type mismatch for key id={} (stored type differs from requested)",
                key.id
            )
        })
    }

    pub fn get_obj_mut<T: 'static>(&mut self, key: ObjKey<T>) -> Option<&mut T> {
        let value = self.objects.get_mut(&key.id)?;
        value.downcast_mut::<T>().or_else(|| {
            panic!(
                "blackboard type mismatch for key id={} (stored type differs from requested)",
                key.id
            )
        })
    }

    pub fn remove_obj<T: 'static>(&mut self, key: ObjKey<T>) -> Option<T> {
        // Check the type first so a mismatch leaves the entry in place.
        if !self.objects.get(&key.id)?.is::<T>() {
            panic!(
                "blackboard type mismatch for key id={} (stored type differs from requested)",
                key.id
            );
        }
        let value = self.objects.remove(&key.id)?;
        value.downcast::<T>().ok().map(|b| *b)
    }
}

/// One layer of a (possibly scoped) blackboard chain.
///
/// Object-safe so that scopes can nest over any other layer; the typed operations live on
/// `dyn BlackboardAccess` and walk the chain innermost-first.
pub trait BlackboardAccess {
    /// The innermost table set of this layer.
    fn layer(&self) -> &Blackboard;

    fn layer_mut(&mut self) -> &mut Blackboard;

    /// The layer this one shadows, or `None` for the root blackboard.
    fn parent(&self) -> Option<&dyn BlackboardAccess>;

    fn parent_mut(&mut self) -> Option<&mut dyn BlackboardAccess>;

    fn root(&self) -> &Blackboard;

    fn root_mut(&mut self) -> &mut Blackboard;
}

impl BlackboardAccess for Blackboard {
    fn layer(&self) -> &Blackboard {
        self
    }

    fn layer_mut(&mut self) -> &mut Blackboard {
        self
    }

    fn parent(&self) -> Option<&dyn BlackboardAccess> {
        None
    }

    fn parent_mut(&mut self) -> Option<&mut dyn BlackboardAccess> {
        None
    }

    fn root(&self) -> &Blackboard {
        self
    }

    fn root_mut(&mut self) -> &mut Blackboard {
        self
    }
}

impl dyn BlackboardAccess + '_ {
    /// Read through the chain: innermost layer first, then each parent.
    pub fn get<T: BbValue>(&self, key: BbKey<T>) -> Option<T> {
        if let Some(value) = self.layer().get(key) {
            return Some(value);
        }
        self.parent()?.get(key)
    }

    pub fn contains<T: BbValue>(&self, key: BbKey<T>) -> bool {
        self.layer().contains(key) || self.parent().is_some_and(|p| p.contains(key))
    }

    /// Write to the innermost layer. On a root blackboard this is a global write.
    pub fn set<T: BbValue>(&mut self, key: BbKey<T>, value: T) {
        self.layer_mut().set(key, value);
    }

    /// Write to the root layer, dropping any shadowing entries in the overlays in between so
    /// the new value is visible from every view.
    pub fn set_global<T: BbValue>(&mut self, key: BbKey<T>, value: T) {
        if let Some(parent) = self.parent_mut() {
            parent.set_global(key, value);
            self.layer_mut().remove(key);
            return;
        }
        self.layer_mut().set(key, value);
    }

    pub fn get_obj<T: 'static>(&self, key: ObjKey<T>) -> Option<&T> {
        if let Some(value) = self.layer().get_obj(key) {
            return Some(value);
        }
        self.parent()?.get_obj(key)
    }
}
