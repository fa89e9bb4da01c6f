//! Runtime object kinds and the heap that owns them.

mod array;
mod gc;
mod map;
mod method;
mod number;
mod string;
mod value;

pub use array::{Array, ArrayTransient};
pub use gc::{CompareError, Heap, HeapObject, NoRoots, RootProvider};
pub use map::{Map, MapTransient, SlotKey};
pub use method::{CompiledMethod, Method, MethodBuilder, NativeMethod};
pub use number::{Number, NumberError, PRECISION};
pub use string::Str;
pub use value::{ObjectKind, Value};

pub use ::heap::{CycleKind, GcBits, GcStats, Handle, HeapSettings, SweepCounts};
