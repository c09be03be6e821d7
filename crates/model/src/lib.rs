use std::fmt::Debug;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use serde_with;
use utility::id::{HasId, Id};

pub mod assignment;
pub mod history;
pub mod station;
pub mod user;
pub mod visit;

/// Types that can produce a representative sample value, used by the
/// `/schema?exampleData=true` endpoints.
pub trait ExampleData {
    fn example_data() -> Self;
}

/// A domain value together with its storage id.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WithId<T>
where
    T: HasId,
    T::IdType: Debug + Clone + Serialize,
{
    pub id: Id<T>,
    #[serde(flatten)]
    pub content: T,
}

impl<T> WithId<T>
where
    T: HasId,
    T::IdType: Debug + Clone + Serialize,
{
    pub fn new(id: Id<T>, content: T) -> Self {
        Self { id, content }
    }
}

/// A value annotated with its distance from a query point.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithDistance<T> {
    pub distance_km: f64,
    #[serde(flatten)]
    pub content: T,
}

impl<T> WithDistance<T> {
    pub fn new(distance_km: f64, content: T) -> Self {
        Self {
            distance_km,
            content,
        }
    }

    pub fn with_id(self, id: Id<T>) -> WithDistance<WithId<T>>
    where
        T: HasId,
        T::IdType: Debug + Clone + Serialize,
    {
        WithDistance::new(self.distance_km, WithId::new(id, self.content))
    }
}
