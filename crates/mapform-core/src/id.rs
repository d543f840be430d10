use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};

/// One interner behind every id kind below.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident, $sigil:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($sigil, "{}"), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                Cow::<str>::deserialize(deserializer).map(|s| $name::intern(&s))
            }
        }
    };
}

interned_id!(
    /// A geometry form field, named after its backing input.
    FieldId,
    "field:"
);

interned_id!(
    /// A shape in the drawing library's flat feature store.
    FeatureId,
    "feature:"
);

interned_id!(
    /// Primary key of an entity on the object layer.
    ObjectKey,
    "object:"
);

static RESTORED: AtomicU32 = AtomicU32::new(0);

impl FeatureId {
    /// Fresh id for a shape put back on the surface from `field`'s stored
    /// value, e.g. `parcel/restored-3`. Never collides with library ids.
    pub fn restored(field: FieldId) -> Self {
        let n = RESTORED.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{field}/restored-{n}"))
    }
}
