//! Process-wide registry of custom YAML representers.
//!
//! A type opts in by implementing [`Representable`]; values are then
//! serialized through [`Represented`] or the [`represent`] helper, which look
//! up the most specific registered representer.

use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_yaml::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, RwLock};

type RepresenterFn = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type Registry = HashMap<TypeId, RepresenterFn>;

static REPRESENTERS: LazyLock<RwLock<Registry>> = LazyLock::new(|| RwLock::new(Registry::new()));
static SCOPE_LOCK: Mutex<()> = Mutex::new(());

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

pub trait Representable: AsAny + Send + Sync {
    /// More general views of this value, most specific first. A representer
    /// registered for one of them applies when none exists for the value's
    /// own type.
    fn bases(&self) -> Vec<&dyn Representable> {
        Vec::new()
    }
}

pub fn register_representer<T, F>(representer: F)
where
    T: Any,
    F: Fn(&T) -> Value + Send + Sync + 'static,
{
    let erased: RepresenterFn =
        Arc::new(move |value: &dyn Any| value.downcast_ref::<T>().map(&representer));
    REPRESENTERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(TypeId::of::<T>(), erased);
}

pub fn unregister_representer<T: Any>() -> bool {
    REPRESENTERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&TypeId::of::<T>())
        .is_some()
}

pub fn clear_representers() {
    REPRESENTERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

/// Finds the most specific representer for `value` and applies it.
///
/// The registry lock is released before the representer runs, so
/// representers may themselves use the registry.
pub fn represent_value(value: &dyn Representable) -> Option<Value> {
    let any = value.as_any();
    if let Some(representer) = registered(any) {
        return representer(any);
    }
    value.bases().into_iter().find_map(represent_value)
}

fn registered(value: &dyn Any) -> Option<RepresenterFn> {
    REPRESENTERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&Any::type_id(value))
        .cloned()
}

/// Serializes a value through the representer registry.
pub struct Represented<'a>(pub &'a dyn Representable);

impl Serialize for Represented<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_represented(self.0, serializer)
    }
}

/// `#[serde(serialize_with = "represent")]` adapter.
pub fn represent<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Representable,
    S: Serializer,
{
    serialize_represented(value, serializer)
}

fn serialize_represented<S: Serializer>(
    value: &dyn Representable,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match represent_value(value) {
        Some(tree) => tree.serialize(serializer),
        None => Err(S::Error::custom(format!(
            "cannot represent an object of type '{}': no representer registered",
            value.type_name()
        ))),
    }
}

/// Snapshot of the registry restored on drop.
///
/// Scopes are exclusive: a second scope blocks until the first is dropped,
/// so tests that register representers do not observe each other.
pub struct RepresenterScope {
    saved: Registry,
    _exclusive: MutexGuard<'static, ()>,
}

pub fn representer_scope() -> RepresenterScope {
    let exclusive = SCOPE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let saved = REPRESENTERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    RepresenterScope {
        saved,
        _exclusive: exclusive,
    }
}

impl Drop for RepresenterScope {
    fn drop(&mut self) {
        let mut registry = REPRESENTERS.write().unwrap_or_else(PoisonError::into_inner);
        *registry = std::mem::take(&mut self.saved);
    }
}
