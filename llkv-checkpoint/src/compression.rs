//! Compression function registry.
//!
//! Segments arrive already compressed; the checkpoint only needs to know which
//! function produced them (to tag data pointers) and to swap in the `Constant`
//! function when a segment's statistics prove every row identical.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use llkv_result::{Error, Result};
use llkv_types::PhysicalType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompressionKind {
    Uncompressed,
    /// No bytes on disk; the value lives in the statistics.
    Constant,
    Rle,
    BitPacking,
    Dictionary,
}

impl CompressionKind {
    pub const fn name(self) -> &'static str {
        match self {
            CompressionKind::Uncompressed => "uncompressed",
            CompressionKind::Constant => "constant",
            CompressionKind::Rle => "rle",
            CompressionKind::BitPacking => "bitpacking",
            CompressionKind::Dictionary => "dictionary",
        }
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compression function for one physical type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompressionFunction {
    kind: CompressionKind,
    physical_type: PhysicalType,
}

impl CompressionFunction {
    pub const fn new(kind: CompressionKind, physical_type: PhysicalType) -> Self {
        Self {
            kind,
            physical_type,
        }
    }

    #[inline]
    pub fn kind(&self) -> CompressionKind {
        self.kind
    }

    #[inline]
    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }
}

/// Lookup of compression functions by `(kind, physical type)`.
#[derive(Debug, Default, Clone)]
pub struct CompressionRegistry {
    functions: FxHashMap<(CompressionKind, PhysicalType), Arc<CompressionFunction>>,
}

impl CompressionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// `Uncompressed` and `Constant` for every type, `Rle` and `BitPacking`
    /// for numeric types, and `Dictionary` for `VARCHAR`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for ty in PhysicalType::ALL {
            registry.register(CompressionFunction::new(CompressionKind::Uncompressed, ty));
            registry.register(CompressionFunction::new(CompressionKind::Constant, ty));
            if ty.is_numeric() {
                registry.register(CompressionFunction::new(CompressionKind::Rle, ty));
                registry.register(CompressionFunction::new(CompressionKind::BitPacking, ty));
            }
        }
        registry.register(CompressionFunction::new(
            CompressionKind::Dictionary,
            PhysicalType::Varchar,
        ));
        registry
    }

    /// Register (or replace) a function; returns the shared handle.
    pub fn register(&mut self, function: CompressionFunction) -> Arc<CompressionFunction> {
        let key = (function.kind, function.physical_type);
        let function = Arc::new(function);
        self.functions.insert(key, Arc::clone(&function));
        function
    }

    pub fn get(
        &self,
        kind: CompressionKind,
        physical_type: PhysicalType,
    ) -> Result<Arc<CompressionFunction>> {
        self.functions
            .get(&(kind, physical_type))
            .cloned()
            .ok_or_else(|| {
                Error::unsupported(format!(
                    "no {kind} compression function registered for {physical_type}"
                ))
            })
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
