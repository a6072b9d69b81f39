use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
};

use crate::compile::llvm::types::LlvmType;

/// A named IR value: a variable's stack slot or a numbered temporary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterInfo {
    pub name: String,
    pub ty: LlvmType,
}

impl Display for RegisterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.name)
    }
}

/// Result of lowering an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Int(i32),
    Bool(bool),
    Register(RegisterInfo),
}

impl TypedValue {
    pub fn register(&self) -> Option<&RegisterInfo> {
        match self {
            Self::Register(register) => Some(register),
            _ => None,
        }
    }
}

impl Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Register(register) => write!(f, "{register}"),
        }
    }
}

///
/// Per unit register bookkeeping.
///
/// The id counter is shared by temporaries and labels and only ever grows,
/// while slots and array lengths are forgotten at each function boundary.
///
/// Array variables carry their length in a `%name.len` slot. `tracked` holds
/// the variables whose slot is current on every path reaching the point being
/// emitted; a `.length` on any other variable is an internal error.
///
#[derive(Debug, Default)]
pub struct RegisterTable {
    counter: usize,
    registers: HashMap<String, RegisterInfo>,
    allocated_lengths: HashMap<String, TypedValue>,
    length_slots: HashMap<String, RegisterInfo>,
    tracked: HashSet<String>,
}

impl RegisterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> usize {
        self.counter += 1;
        self.counter
    }

    pub fn fresh(&mut self, ty: LlvmType) -> RegisterInfo {
        let name = format!("t.{}", self.next_id());
        let register = RegisterInfo { name, ty };
        self.registers.insert(register.name.clone(), register.clone());

        register
    }

    /// Records the stack slot of a variable; `ty` is the slot's pointer type.
    pub fn bind_slot(&mut self, name: &str, ty: LlvmType) -> RegisterInfo {
        let register = RegisterInfo {
            name: name.to_string(),
            ty,
        };
        self.registers.insert(name.to_string(), register.clone());

        register
    }

    pub fn get(&self, name: &str) -> Option<&RegisterInfo> {
        self.registers.get(name)
    }

    /// Length of the array a fresh allocation left in temporary `key`.
    pub fn record_length(&mut self, key: &str, length: TypedValue) {
        self.allocated_lengths.insert(key.to_string(), length);
    }

    pub fn length(&self, key: &str) -> Option<&TypedValue> {
        self.allocated_lengths.get(key)
    }

    pub fn bind_length_slot(&mut self, name: &str) -> RegisterInfo {
        let slot = RegisterInfo {
            name: format!("{name}.len"),
            ty: LlvmType::I32.ptr(),
        };
        self.length_slots.insert(name.to_string(), slot.clone());

        slot
    }

    pub fn length_slot(&self, name: &str) -> Option<&RegisterInfo> {
        self.length_slots.get(name)
    }

    pub fn track(&mut self, name: &str) {
        self.tracked.insert(name.to_string());
    }

    pub fn forget(&mut self, name: &str) {
        self.tracked.remove(name);
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.tracked.contains(name)
    }

    pub fn tracked(&self) -> &HashSet<String> {
        &self.tracked
    }

    /// Swaps in the tracked set of another path, handing back the current one.
    pub fn replace_tracked(&mut self, tracked: HashSet<String>) -> HashSet<String> {
        std::mem::replace(&mut self.tracked, tracked)
    }

    /// Joins two paths: only what both of them track stays tracked.
    pub fn join_tracked(&mut self, other: &HashSet<String>) {
        self.tracked.retain(|name| other.contains(name));
    }

    /// Fields have a length slot but no variable slot. A call may reassign any of them.
    pub fn forget_fields(&mut self) {
        let registers = &self.registers;
        self.tracked.retain(|name| registers.contains_key(name));
    }

    pub fn enter_function(&mut self) {
        self.registers.clear();
        self.allocated_lengths.clear();
        self.length_slots.clear();
        self.tracked.clear();
    }
}
