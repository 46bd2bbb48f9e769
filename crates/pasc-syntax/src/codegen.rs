//! Emission of instructions for an abstract stack machine.
//!
//! The machine has an operand stack, typed local slots and symbolic labels.
//! Instructions are appended as the parser recognizes constructs and are
//! never retracted.

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::types::CType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i32),
    Real(f64),
    String(String),
    Boolean(bool),
}

impl Value {
    pub fn ty(&self) -> CType {
        match self {
            Value::Integer(_) => CType::Integer,
            Value::Real(_) => CType::Real,
            Value::String(_) => CType::String,
            Value::Boolean(_) => CType::Boolean,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v:?}"),
            Value::String(v) => write!(f, "'{v}'"),
            Value::Boolean(v) => write!(f, "{v}"),
        }
    }
}

/// Handle of a local storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot(pub u32);

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Primitive two-operand instructions. `>=`, `<=` and `<>` are not
/// primitives, see [`CodeGenerator::binary_op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Eq,
    Lt,
    Gt,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "eq",
            BinaryOp::Lt => "lt",
            BinaryOp::Gt => "gt",
        };
        f.write_str(name)
    }
}

/// Operators as written in source, including the synthesized comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    Push(Value),
    Load(Slot),
    Store(Slot),
    Neg,
    Not,
    /// Converts the integer on top of the stack to a real.
    Widen,
    Binary(BinaryOp),
    Concat,
    Label(Label),
    Jump(Label),
    JumpIfFalse(Label),
    Print(CType),
    Halt,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Push(value) => write!(f, "    push {value}"),
            Instr::Load(slot) => write!(f, "    load {slot}"),
            Instr::Store(slot) => write!(f, "    store {slot}"),
            Instr::Neg => write!(f, "    neg"),
            Instr::Not => write!(f, "    not"),
            Instr::Widen => write!(f, "    widen"),
            Instr::Binary(op) => write!(f, "    {op}"),
            Instr::Concat => write!(f, "    concat"),
            Instr::Label(label) => write!(f, "{label}:"),
            Instr::Jump(label) => write!(f, "    jump {label}"),
            Instr::JumpIfFalse(label) => write!(f, "    jump_if_false {label}"),
            Instr::Print(ty) => write!(f, "    print {ty}"),
            Instr::Halt => write!(f, "    halt"),
        }
    }
}

/// A finished, self-contained instruction sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Declared type of every slot, indexed by [`Slot`].
    pub slots: Vec<CType>,
    pub code: Vec<Instr>,
}

impl Program {
    /// Instruction index of every label.
    pub fn label_targets(&self) -> HashMap<Label, usize> {
        self.code
            .iter()
            .enumerate()
            .filter_map(|(index, instr)| match instr {
                Instr::Label(label) => Some((*label, index)),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self
            .slots
            .iter()
            .enumerate()
            .map(|(index, ty)| format!("{}: {ty}", Slot(index as u32)))
            .join(", ");
        writeln!(f, ".slots {slots}")?;
        for instr in &self.code {
            writeln!(f, "{instr}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CodeGenerator {
    slots: Vec<CType>,
    code: Vec<Instr>,
    labels: u32,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, instr: Instr) {
        tracing::trace!("emit {instr}");
        self.code.push(instr);
    }

    /// Allocates a slot and initializes it to the type's zero value.
    pub fn declare_slot(&mut self, ty: CType) -> Slot {
        let slot = Slot(self.slots.len() as u32);
        self.slots.push(ty);
        self.emit(Instr::Push(ty.zero_value()));
        self.emit(Instr::Store(slot));
        slot
    }

    pub fn push_int(&mut self, value: i32) {
        self.emit(Instr::Push(Value::Integer(value)));
    }

    pub fn push_real(&mut self, value: f64) {
        self.emit(Instr::Push(Value::Real(value)));
    }

    pub fn push_string(&mut self, value: impl Into<String>) {
        self.emit(Instr::Push(Value::String(value.into())));
    }

    pub fn push_bool(&mut self, value: bool) {
        self.emit(Instr::Push(Value::Boolean(value)));
    }

    pub fn push_const(&mut self, value: Value) {
        self.emit(Instr::Push(value));
    }

    pub fn push_slot(&mut self, slot: Slot) {
        self.emit(Instr::Load(slot));
    }

    pub fn store(&mut self, slot: Slot) {
        self.emit(Instr::Store(slot));
    }

    pub fn negate(&mut self) {
        self.emit(Instr::Neg);
    }

    pub fn not(&mut self) {
        self.emit(Instr::Not);
    }

    pub fn widen(&mut self) {
        self.emit(Instr::Widen);
    }

    pub fn binary_op(&mut self, op: Operator) {
        let (primitive, negate) = match op {
            Operator::Add => (BinaryOp::Add, false),
            Operator::Sub => (BinaryOp::Sub, false),
            Operator::Mul => (BinaryOp::Mul, false),
            Operator::Div => (BinaryOp::Div, false),
            Operator::Mod => (BinaryOp::Mod, false),
            Operator::And => (BinaryOp::And, false),
            Operator::Or => (BinaryOp::Or, false),
            Operator::Equal => (BinaryOp::Eq, false),
            Operator::Less => (BinaryOp::Lt, false),
            Operator::Greater => (BinaryOp::Gt, false),
            Operator::NotEqual => (BinaryOp::Eq, true),
            Operator::GreaterOrEqual => (BinaryOp::Lt, true),
            Operator::LessOrEqual => (BinaryOp::Gt, true),
        };
        self.emit(Instr::Binary(primitive));
        if negate {
            self.emit(Instr::Not);
        }
    }

    pub fn concat_strings(&mut self) {
        self.emit(Instr::Concat);
    }

    pub fn define_label(&mut self) -> Label {
        let label = Label(self.labels);
        self.labels += 1;
        label
    }

    pub fn mark_label(&mut self, label: Label) {
        self.emit(Instr::Label(label));
    }

    pub fn branch(&mut self, label: Label) {
        self.emit(Instr::Jump(label));
    }

    pub fn branch_if_false(&mut self, label: Label) {
        self.emit(Instr::JumpIfFalse(label));
    }

    pub fn print(&mut self, ty: CType) {
        self.emit(Instr::Print(ty));
    }

    pub fn finalize(mut self) -> Program {
        self.emit(Instr::Halt);
        let marks = self.code.iter().filter_map(|instr| match instr {
            Instr::Label(label) => Some(label.0),
            _ => None,
        });
        debug_assert!(
            marks.sorted().eq(0..self.labels),
            "every label is marked exactly once"
        );
        Program {
            slots: self.slots,
            code: self.code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_slot_emits_zero_initializer() {
        let mut cg = CodeGenerator::new();
        let a = cg.declare_slot(CType::Integer);
        let b = cg.declare_slot(CType::String);
        assert_eq!((a, b), (Slot(0), Slot(1)));
        let program = cg.finalize();
        assert_eq!(program.slots, vec![CType::Integer, CType::String]);
        assert_eq!(
            program.code,
            vec![
                Instr::Push(Value::Integer(0)),
                Instr::Store(Slot(0)),
                Instr::Push(Value::String(String::new())),
                Instr::Store(Slot(1)),
                Instr::Halt,
            ]
        );
    }

    #[test]
    fn synthesized_comparisons_are_two_instructions() {
        let cases = [
            (Operator::GreaterOrEqual, BinaryOp::Lt),
            (Operator::LessOrEqual, BinaryOp::Gt),
            (Operator::NotEqual, BinaryOp::Eq),
        ];
        for (op, primitive) in cases {
            let mut cg = CodeGenerator::new();
            cg.binary_op(op);
            assert_eq!(cg.code, vec![Instr::Binary(primitive), Instr::Not]);
        }

        let mut cg = CodeGenerator::new();
        cg.binary_op(Operator::Less);
        assert_eq!(cg.code, vec![Instr::Binary(BinaryOp::Lt)]);
    }

    #[test]
    fn labels_resolve_to_their_marks() {
        let mut cg = CodeGenerator::new();
        let top = cg.define_label();
        let end = cg.define_label();
        cg.mark_label(top);
        cg.push_bool(false);
        cg.branch_if_false(end);
        cg.branch(top);
        cg.mark_label(end);
        let program = cg.finalize();
        let targets = program.label_targets();
        assert_eq!(targets[&top], 0);
        assert_eq!(targets[&end], 4);
    }

    #[test]
    fn listing_is_readable() {
        let mut cg = CodeGenerator::new();
        let slot = cg.declare_slot(CType::Real);
        let end = cg.define_label();
        cg.push_slot(slot);
        cg.print(CType::Real);
        cg.mark_label(end);
        let listing = cg.finalize().to_string();
        assert_eq!(
            listing,
            concat!(
                ".slots $0: real\n",
                "    push 0.0\n    store $0\n    load $0\n    print real\n",
                "L0:\n    halt\n",
            )
        );
    }
}
