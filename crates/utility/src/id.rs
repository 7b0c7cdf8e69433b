use std::{borrow::Cow, fmt, hash, marker::PhantomData};

use schemars::{gen::SchemaGenerator, schema::Schema, JsonSchema};
use serde::{Deserialize, Serialize};

/// Implemented by every entity that is addressed by a typed [`Id`].
pub trait HasId {
    type IdType;
}

/// An identifier tagged with the entity it points to, so ids of help
/// requests can not be mixed up with ids of anything else. On the wire it is
/// just the raw value.
#[derive(Serialize, Deserialize)]
#[serde(
    transparent,
    bound(
        serialize = "T::IdType: Serialize",
        deserialize = "T::IdType: Deserialize<'de>"
    )
)]
pub struct Id<T: HasId> {
    raw: T::IdType,
    #[serde(skip)]
    entity: PhantomData<fn() -> T>,
}

impl<T: HasId> Id<T> {
    pub fn new(raw: T::IdType) -> Self {
        Self {
            raw,
            entity: PhantomData,
        }
    }

    pub fn into_raw(self) -> T::IdType {
        self.raw
    }

    pub fn raw_ref(&self) -> &T::IdType {
        &self.raw
    }
}

// derives would put the bounds on `T` instead of its raw id

impl<T: HasId> Clone for Id<T>
where
    T::IdType: Clone,
{
    fn clone(&self) -> Self {
        Self::new(self.raw.clone())
    }
}

impl<T: HasId> PartialEq for Id<T>
where
    T::IdType: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: HasId> Eq for Id<T> where T::IdType: Eq {}

impl<T: HasId> hash::Hash for Id<T>
where
    T::IdType: hash::Hash,
{
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state)
    }
}

impl<T: HasId> fmt::Debug for Id<T>
where
    T::IdType: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:?}", self.raw)
    }
}

impl<T: HasId> fmt::Display for Id<T>
where
    T::IdType: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.fmt(f)
    }
}

impl<T> JsonSchema for Id<T>
where
    T: HasId + JsonSchema,
    T::IdType: JsonSchema,
{
    fn schema_name() -> String {
        format!("{}Id", T::schema_name())
    }

    fn schema_id() -> Cow<'static, str> {
        Cow::Owned(format!("{}::Id<{}>", module_path!(), T::schema_id()))
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        T::IdType::json_schema(gen)
    }
}
