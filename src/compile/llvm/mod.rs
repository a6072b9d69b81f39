use std::{collections::HashSet, fmt::Write};

use thiserror::Error;

use crate::compile::{
    ast::{ClassDecl, Expr, MainClass, MethodDecl, Program, ProgramPass, Stmt, VarDecl},
    llvm::{
        registers::{RegisterInfo, RegisterTable, TypedValue},
        types::LlvmType,
    },
    semantic::symbols::SymbolModel,
};

// Writes one indented instruction into the generator's output.
macro_rules! emit {
    ($gen:expr, $($arg:tt)*) => {
        writeln!(&mut $gen.out, "  {}", format_args!($($arg)*))
    };
}

pub mod expr;
pub mod registers;
pub mod types;

const ENTRY_BLOCK: &str = "fn.entry";

/// Failures of the generator itself. A well typed program never produces one.
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("no register or field recorded for {0}")]
    MissingRegister(String),

    #[error("length of array {0} is not tracked")]
    UntrackedArrayLength(String),

    #[error("unknown class {0}")]
    UnknownClass(String),

    #[error("class {class} has no method {method}")]
    UnknownMethod { class: String, method: String },

    #[error("cannot use {value} as {expected}")]
    UnexpectedValue { value: String, expected: String },

    #[error("integer literal {0} does not fit into i32")]
    InvalidLiteral(String),

    #[error(transparent)]
    Fmt(#[from] std::fmt::Error),
}

/// Emits the IR module for an analyzed program.
pub fn generate(program: &Program, model: &SymbolModel) -> Result<String, CodegenError> {
    let mut generator = Generator::new(model);
    generator.run(program)?;

    Ok(generator.out)
}

///
/// Single pass IR emitter. Temporaries and labels draw from one counter that
/// is never reset, so every name is unique within the module.
///
pub struct Generator<'m> {
    model: &'m SymbolModel,
    out: String,
    registers: RegisterTable,
    class: Option<String>,
    current_block: String,
    in_cond: bool,
}

impl<'m> Generator<'m> {
    pub fn new(model: &'m SymbolModel) -> Self {
        Self {
            model,
            out: String::from(include_str!("prologue.ll")),
            registers: RegisterTable::new(),
            class: None,
            current_block: ENTRY_BLOCK.to_string(),
            in_cond: false,
        }
    }

    fn label(&mut self, name: String) -> Result<(), CodegenError> {
        writeln!(&mut self.out, "{name}:")?;
        self.current_block = name;

        Ok(())
    }

    fn begin_function(&mut self, header: String) -> Result<(), CodegenError> {
        self.registers.enter_function();
        writeln!(&mut self.out, "\n{header} {{")?;

        self.label(ENTRY_BLOCK.to_string())
    }

    fn end_function(&mut self) -> Result<(), CodegenError> {
        writeln!(&mut self.out, "}}")?;

        Ok(())
    }

    fn declare_local(&mut self, var: &VarDecl) -> Result<RegisterInfo, CodegenError> {
        let ty = LlvmType::from(&var.ty);
        let slot = self.registers.bind_slot(&var.name, ty.clone().ptr());
        emit!(self, "{slot} = alloca {ty}")?;

        if var.ty.is_array() {
            self.declare_length(&var.name)?;
        }

        Ok(slot)
    }

    fn declare_length(&mut self, name: &str) -> Result<(), CodegenError> {
        let slot = self.registers.bind_length_slot(name);
        emit!(self, "{slot} = alloca i32")?;

        Ok(())
    }

    /// Address of a named variable and the type stored there.
    /// Slots of the current function win over fields reached through `%this`.
    fn variable_address(&mut self, name: &str) -> Result<(RegisterInfo, LlvmType), CodegenError> {
        if let Some(slot) = self.registers.get(name).cloned() {
            let ty = slot
                .ty
                .pointee()
                .cloned()
                .ok_or_else(|| CodegenError::MissingRegister(name.to_string()))?;

            return Ok((slot, ty));
        }

        let model = self.model;
        let (_, field) = self
            .class
            .as_deref()
            .and_then(|class| model.lookup_field(class, name))
            .ok_or_else(|| CodegenError::MissingRegister(name.to_string()))?;

        let ty = LlvmType::from(&field.ty);
        let byte = self.registers.fresh(LlvmType::I8.ptr());
        emit!(self, "{byte} = getelementptr inbounds i8, i8* %this, i64 {}", field.offset)?;

        if ty == LlvmType::I8 {
            return Ok((byte, ty));
        }

        let typed = self.registers.fresh(ty.clone().ptr());
        emit!(self, "{typed} = bitcast i8* {byte} to {}", typed.ty)?;

        Ok((typed, ty))
    }

    fn load_variable(&mut self, name: &str) -> Result<RegisterInfo, CodegenError> {
        let (address, ty) = self.variable_address(name)?;
        let value = self.registers.fresh(ty.clone());
        emit!(self, "{value} = load {ty}, {} {address}", address.ty)?;

        Ok(value)
    }

    /// Loads the length slot of `name`, if it is current on every path here.
    fn tracked_length(&mut self, name: &str) -> Result<Option<TypedValue>, CodegenError> {
        let Some(slot) = self.registers.length_slot(name).cloned() else {
            return Ok(None);
        };
        if !self.registers.is_tracked(name) {
            return Ok(None);
        }

        let length = self.registers.fresh(LlvmType::I32);
        emit!(self, "{length} = load i32, i32* {slot}")?;

        Ok(Some(TypedValue::Register(length)))
    }

    /// Keeps the length slot of `name` in step with the array just stored there.
    fn update_length(&mut self, name: &str, source: &Expr, value: &TypedValue) -> Result<(), CodegenError> {
        let Some(slot) = self.registers.length_slot(name).cloned() else {
            return Ok(());
        };

        let length = match (source.copied_variable(), value.register()) {
            (Some(from), _) => self.tracked_length(from)?,
            (None, Some(array)) => self.registers.length(&array.name).cloned(),
            (None, None) => None,
        };

        match length {
            Some(length) => {
                emit!(self, "store i32 {length}, i32* {slot}")?;
                self.registers.track(name);
            }
            None => self.registers.forget(name),
        }

        Ok(())
    }

    /// Lowers a branch condition down to an `i1`.
    fn condition(&mut self, expr: &Expr) -> Result<TypedValue, CodegenError> {
        let outer = std::mem::replace(&mut self.in_cond, true);
        let value = self.expr(expr);
        self.in_cond = outer;

        self.as_i1(value?)
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Block(stmts) => {
                for stmt in stmts.iter() {
                    self.stmt(stmt)?;
                }
            }
            Stmt::Assign(name, source, _) => {
                let value = self.expr(source)?;
                let (address, ty) = self.variable_address(name)?;
                let value = self.coerce(value, &ty)?;
                emit!(self, "store {ty} {value}, {} {address}", address.ty)?;

                self.update_length(name, source, &value)?;
            }
            Stmt::ArrayAssign(name, index, value, _) => {
                let array = self.load_variable(name)?;
                let element = array.ty.pointee().cloned().ok_or_else(|| {
                    CodegenError::UnexpectedValue {
                        value: array.to_string(),
                        expected: "array".to_string(),
                    }
                })?;

                let index = self.expr(index)?;
                let index = self.coerce(index, &LlvmType::I32)?;
                let value = self.expr(value)?;
                let value = self.coerce(value, &element)?;

                let address = self.registers.fresh(element.clone().ptr());
                emit!(
                    self,
                    "{address} = getelementptr inbounds {element}, {} {array}, i32 {index}",
                    array.ty
                )?;
                emit!(self, "store {element} {value}, {} {address}", address.ty)?;
            }
            Stmt::If(cond, then, otherwise) => {
                let id = self.registers.next_id();
                let cond = self.condition(cond)?;
                emit!(self, "br i1 {cond}, label %if.{id}, label %else.{id}")?;
                let entry = self.registers.tracked().clone();

                self.label(format!("if.{id}"))?;
                self.stmt(then)?;
                emit!(self, "br label %continue.{id}")?;
                let then_tracked = self.registers.replace_tracked(entry);

                self.label(format!("else.{id}"))?;
                self.stmt(otherwise)?;
                emit!(self, "br label %continue.{id}")?;

                self.label(format!("continue.{id}"))?;
                self.registers.join_tracked(&then_tracked);
            }
            Stmt::While(cond, body) => {
                // the header is reached again from the end of the body
                if cond.contains_call() || body.contains_call() {
                    self.registers.forget_fields();
                }
                for name in lengths_lost_in(body, self.registers.tracked()) {
                    self.registers.forget(&name);
                }
                let entry = self.registers.tracked().clone();

                let id = self.registers.next_id();
                emit!(self, "br label %while.{id}")?;

                self.label(format!("while.{id}"))?;
                let cond = self.condition(cond)?;
                emit!(self, "br i1 {cond}, label %loop.{id}, label %break.{id}")?;

                self.label(format!("loop.{id}"))?;
                self.stmt(body)?;
                emit!(self, "br label %while.{id}")?;

                self.label(format!("break.{id}"))?;
                self.registers.replace_tracked(entry);
            }
            Stmt::Print(expr, _) => {
                let value = self.expr(expr)?;
                let value = self.coerce(value, &LlvmType::I32)?;
                let result = self.registers.fresh(LlvmType::I32);
                emit!(
                    self,
                    "{result} = call i32 (i8*, ...) @printf(i8* getelementptr inbounds ([4 x i8], [4 x i8]* @.str, i64 0, i64 0), i32 {value})"
                )?;
            }
        }

        Ok(())
    }
}

impl ProgramPass for Generator<'_> {
    type Error = CodegenError;

    fn main_class(&mut self, main: &MainClass) -> Result<(), Self::Error> {
        self.class = None;
        self.begin_function("define void @main()".to_string())?;

        for local in main.locals.iter() {
            self.declare_local(local)?;
        }

        for stmt in main.body.iter() {
            self.stmt(stmt)?;
        }

        emit!(self, "ret void")?;
        self.end_function()
    }

    fn enter_class(&mut self, class: &ClassDecl) -> Result<(), Self::Error> {
        let model = self.model;
        let info = model
            .class(&class.name)
            .ok_or_else(|| CodegenError::UnknownClass(class.name.clone()))?;

        match &info.parent {
            Some(parent) => writeln!(&mut self.out, "\n; class {} extends {parent}", info.name)?,
            None => writeln!(&mut self.out, "\n; class {}", info.name)?,
        }
        writeln!(&mut self.out, ";   size {}", model.object_size(&info.name))?;

        for (name, field) in info.fields.iter() {
            writeln!(&mut self.out, ";   field {name} : {} @ {}", field.ty, field.offset)?;
        }

        for (name, method) in info.methods.iter() {
            match &method.overrides {
                Some(owner) => writeln!(
                    &mut self.out,
                    ";   method {name} @ {} overrides {owner}",
                    method.offset
                )?,
                None => writeln!(&mut self.out, ";   method {name} @ {}", method.offset)?,
            }
        }

        Ok(())
    }

    fn method(&mut self, class: &ClassDecl, method: &MethodDecl) -> Result<(), Self::Error> {
        self.class = Some(class.name.clone());

        let ret = LlvmType::from(&method.ty);
        let params = std::iter::once("i8* %this".to_string())
            .chain(
                method
                    .params
                    .iter()
                    .map(|param| format!("{} %arg.{}", LlvmType::from(&param.ty), param.name)),
            )
            .collect::<Vec<_>>()
            .join(", ");

        self.begin_function(format!(
            "define {ret} @{}.{}({params})",
            class.name, method.name
        ))?;

        for param in method.params.iter() {
            let slot = self.declare_local(param)?;
            let ty = LlvmType::from(&param.ty);
            emit!(self, "store {ty} %arg.{}, {} {slot}", param.name, slot.ty)?;
        }

        for local in method.locals.iter() {
            self.declare_local(local)?;
        }

        let model = self.model;
        let mut visible = HashSet::new();
        for owner in model.ancestors(&class.name) {
            for (name, field) in owner.fields.iter() {
                let shadowed = self.registers.get(name).is_some() || !visible.insert(name);
                if field.ty.is_array() && !shadowed {
                    self.declare_length(name)?;
                }
            }
        }

        for stmt in method.body.iter() {
            self.stmt(stmt)?;
        }

        let value = self.expr(&method.ret)?;
        let value = self.coerce(value, &ret)?;
        emit!(self, "ret {ret} {value}")?;

        self.end_function()
    }
}

/// Variables a loop body may leave holding an array whose length slot is stale.
fn lengths_lost_in(body: &Stmt, tracked: &HashSet<String>) -> HashSet<String> {
    let mut assignments = Vec::new();
    body.assignments(&mut assignments);

    let mut lost: HashSet<String> = HashSet::new();
    loop {
        let known = lost.len();

        for (name, value) in assignments.iter() {
            let keeps = match value.copied_variable() {
                Some(from) => tracked.contains(from) && !lost.contains(from),
                None => value.is_array_allocation(),
            };
            if !keeps {
                lost.insert(name.to_string());
            }
        }

        if lost.len() == known {
            return lost;
        }
    }
}
