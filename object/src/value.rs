use core::fmt;

use heap::Handle;

use crate::{Array, ArrayTransient, Map, MapTransient, Method, NativeMethod, Number, Str};

/// Dynamic kind of a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectKind {
    Map = 0,
    MapTransient,
    Array,
    ArrayTransient,
    Number,
    String,
    Method,
    NativeMethod,
}

impl ObjectKind {
    pub const COUNT: usize = Self::NativeMethod as usize + 1;

    pub const ALL: [ObjectKind; Self::COUNT] = [
        ObjectKind::Map,
        ObjectKind::MapTransient,
        ObjectKind::Array,
        ObjectKind::ArrayTransient,
        ObjectKind::Number,
        ObjectKind::String,
        ObjectKind::Method,
        ObjectKind::NativeMethod,
    ];

    /// Global name of the prototype that holds the methods of this kind.
    pub const fn prototype_name(self) -> &'static str {
        match self {
            ObjectKind::Map => "Map",
            ObjectKind::MapTransient => "MapTransient",
            ObjectKind::Array => "Array",
            ObjectKind::ArrayTransient => "ArrayTransient",
            ObjectKind::Number => "Number",
            ObjectKind::String => "String",
            ObjectKind::Method | ObjectKind::NativeMethod => "Method",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::NativeMethod => "NativeMethod",
            other => other.prototype_name(),
        };
        f.pad(name)
    }
}

/// A reference to a heap object.
///
/// Values are plain handles: copying one is free and does not keep the
/// object alive. Equality is identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Map(Handle<Map>),
    MapTransient(Handle<MapTransient>),
    Array(Handle<Array>),
    ArrayTransient(Handle<ArrayTransient>),
    Number(Handle<Number>),
    String(Handle<Str>),
    Method(Handle<Method>),
    NativeMethod(Handle<NativeMethod>),
}

impl Value {
    #[inline]
    pub const fn kind(self) -> ObjectKind {
        match self {
            Value::Map(_) => ObjectKind::Map,
            Value::MapTransient(_) => ObjectKind::MapTransient,
            Value::Array(_) => ObjectKind::Array,
            Value::ArrayTransient(_) => ObjectKind::ArrayTransient,
            Value::Number(_) => ObjectKind::Number,
            Value::String(_) => ObjectKind::String,
            Value::Method(_) => ObjectKind::Method,
            Value::NativeMethod(_) => ObjectKind::NativeMethod,
        }
    }

    /// Slot index inside the kind's pool.
    #[inline]
    pub const fn index(self) -> u32 {
        match self {
            Value::Map(h) => h.index(),
            Value::MapTransient(h) => h.index(),
            Value::Array(h) => h.index(),
            Value::ArrayTransient(h) => h.index(),
            Value::Number(h) => h.index(),
            Value::String(h) => h.index(),
            Value::Method(h) => h.index(),
            Value::NativeMethod(h) => h.index(),
        }
    }

    #[inline]
    pub fn as_map(self) -> Option<Handle<Map>> {
        match self {
            Value::Map(h) => Some(h),
            _ => None,
        }
    }

    #[inline]
    pub fn as_number(self) -> Option<Handle<Number>> {
        match self {
            Value::Number(h) => Some(h),
            _ => None,
        }
    }

    #[inline]
    pub fn as_string(self) -> Option<Handle<Str>> {
        match self {
            Value::String(h) => Some(h),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(self) -> Option<Handle<Array>> {
        match self {
            Value::Array(h) => Some(h),
            _ => None,
        }
    }

    #[inline]
    pub fn as_method(self) -> Option<Handle<Method>> {
        match self {
            Value::Method(h) => Some(h),
            _ => None,
        }
    }

    /// Whether sending to this value activates code.
    #[inline]
    pub fn is_callable(self) -> bool {
        matches!(self, Value::Method(_) | Value::NativeMethod(_))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.index())
    }
}
