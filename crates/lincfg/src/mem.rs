//! The interface to the points-to oracle that partitions memory into abstract cells.

use std::fmt;

use hashbrown::HashMap;
use strum::Display;

use crate::ssa::{FuncId, InstId, Value};

#[derive(Display, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum TrackLevel {
    /// Only integer registers are modeled.
    #[default]
    None,

    /// Pointers and memory contents are modeled through array cells.
    Array,
}

/// An abstract memory region. All accesses through one cell are assumed to be
/// type-homogeneous and aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub u32);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

/// The cells a procedure or call site reads, modifies, and allocates, each in an order
/// that is stable across every query for the same callee.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefModNew {
    pub read: Vec<CellId>,
    pub modified: Vec<CellId>,
    pub new: Vec<CellId>,
}

impl RefModNew {
    /// Read cells followed by modified cells not already read.
    pub fn read_or_modified(&self) -> Vec<CellId> {
        let mut cells = self.read.clone();

        for &cell in &self.modified {
            if !cells.contains(&cell) {
                cells.push(cell);
            }
        }

        cells
    }
}

/// Read-only queries; procedures may be translated concurrently against one oracle.
pub trait MemAnalysis: Sync {
    fn track_level(&self) -> TrackLevel;

    /// The cell `ptr` points into, or `None` if the access cannot be modeled.
    fn array_id(&self, func_id: FuncId, ptr: Value) -> Option<CellId>;

    /// The unique object the cell stands for, if there is exactly one.
    fn singleton(&self, cell: CellId) -> Option<Value>;

    fn call_ref_mod_new(&self, func_id: FuncId, call: InstId) -> RefModNew;

    fn func_ref_mod_new(&self, func_id: FuncId) -> RefModNew;
}

/// An oracle that models no memory at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMemAnalysis;

impl MemAnalysis for NoMemAnalysis {
    fn track_level(&self) -> TrackLevel {
        TrackLevel::None
    }

    fn array_id(&self, _func_id: FuncId, _ptr: Value) -> Option<CellId> {
        None
    }

    fn singleton(&self, _cell: CellId) -> Option<Value> {
        None
    }

    fn call_ref_mod_new(&self, _func_id: FuncId, _call: InstId) -> RefModNew {
        Default::default()
    }

    fn func_ref_mod_new(&self, _func_id: FuncId) -> RefModNew {
        Default::default()
    }
}

/// An oracle backed by precomputed tables, for drivers that run the points-to analysis
/// up front.
#[derive(Debug, Default, Clone)]
pub struct StaticMemAnalysis {
    level: TrackLevel,
    cells: HashMap<(FuncId, Value), CellId>,
    singletons: HashMap<CellId, Value>,
    calls: HashMap<(FuncId, InstId), RefModNew>,
    funcs: HashMap<FuncId, RefModNew>,
}

impl StaticMemAnalysis {
    pub fn new(level: TrackLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn map_ptr(&mut self, func_id: FuncId, ptr: Value, cell: CellId) -> &mut Self {
        self.cells.insert((func_id, ptr), cell);

        self
    }

    pub fn set_singleton(&mut self, cell: CellId, object: Value) -> &mut Self {
        self.singletons.insert(cell, object);

        self
    }

    pub fn set_call_effects(&mut self, func_id: FuncId, call: InstId, effects: RefModNew) -> &mut Self {
        self.calls.insert((func_id, call), effects);

        self
    }

    pub fn set_func_effects(&mut self, func_id: FuncId, effects: RefModNew) -> &mut Self {
        self.funcs.insert(func_id, effects);

        self
    }
}

impl MemAnalysis for StaticMemAnalysis {
    fn track_level(&self) -> TrackLevel {
        self.level
    }

    fn array_id(&self, func_id: FuncId, ptr: Value) -> Option<CellId> {
        self.cells.get(&(func_id, ptr)).copied()
    }

    fn singleton(&self, cell: CellId) -> Option<Value> {
        self.singletons.get(&cell).copied()
    }

    fn call_ref_mod_new(&self, func_id: FuncId, call: InstId) -> RefModNew {
        self.calls.get(&(func_id, call)).cloned().unwrap_or_default()
    }

    fn func_ref_mod_new(&self, func_id: FuncId) -> RefModNew {
        self.funcs.get(&func_id).cloned().unwrap_or_default()
    }
}
