//! Type descriptors used for connection-time compatibility checks.
//!
//! A [`Prototype`] identifies an argument or result type. Commands capture
//! their prototypes once, when they are bound; function handles carry the
//! prototypes they expect. Connecting the two compares descriptors by type
//! identity, never by value.

use core::any::{Any, TypeId};
use core::fmt;
use core::hash::{Hash, Hasher};

/// Marker for values that can travel through commands, mailboxes and state
/// tables.
///
/// Queued commands capture a copy of their argument, so payloads must be
/// cloneable and transferable across threads.
pub trait Payload: Any + Clone + Send + Sync {}

impl<T: Any + Clone + Send + Sync> Payload for T {}

/// Descriptor of a payload type.
#[derive(Clone, Copy)]
pub struct Prototype {
    type_id: TypeId,
    type_name: &'static str,
}

impl Prototype {
    /// Descriptor for `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name, as reported by the compiler.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name with module paths stripped, e.g. `Vec<f64>`.
    pub fn short_name(&self) -> String {
        let mut out = String::with_capacity(self.type_name.len());
        let mut segment = String::new();
        for ch in self.type_name.chars() {
            match ch {
                ':' => segment.clear(),
                '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                    out.push_str(&segment);
                    segment.clear();
                    out.push(ch);
                }
                _ => segment.push(ch),
            }
        }
        out.push_str(&segment);
        out
    }

    /// Returns `true` when both descriptors name the same type.
    #[inline]
    pub fn is_compatible(&self, other: &Prototype) -> bool {
        self.type_id == other.type_id
    }

    /// Returns `true` when this descriptor names `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for Prototype {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for Prototype {}

impl Hash for Prototype {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Prototype").field(&self.type_name).finish()
    }
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}
