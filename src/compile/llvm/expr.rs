use std::fmt::Write;

use crate::compile::{
    ast::{BinaryOp, Expr},
    llvm::{
        CodegenError, Generator,
        registers::{RegisterInfo, TypedValue},
        types::LlvmType,
    },
};

impl BinaryOp {
    fn instruction(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Less => "icmp slt",
            Self::Plus => "add",
            Self::Minus => "sub",
            Self::Times => "mul",
        }
    }

    fn fold(&self, lhs: i32, rhs: i32) -> TypedValue {
        match self {
            Self::And => TypedValue::Bool(lhs != 0 && rhs != 0),
            Self::Less => TypedValue::Bool(lhs < rhs),
            Self::Plus => TypedValue::Int(lhs.wrapping_add(rhs)),
            Self::Minus => TypedValue::Int(lhs.wrapping_sub(rhs)),
            Self::Times => TypedValue::Int(lhs.wrapping_mul(rhs)),
        }
    }
}

impl Generator<'_> {
    pub(super) fn expr(&mut self, expr: &Expr) -> Result<TypedValue, CodegenError> {
        match expr {
            Expr::Binary(BinaryOp::And, lhs, rhs) => self.and(lhs, rhs),
            Expr::Binary(op, lhs, rhs) => self.arithmetic(*op, lhs, rhs),
            Expr::ArrayLookup(array, index) => {
                let array = self.expr(array)?;
                let Some(array) = array.register().cloned() else {
                    return Err(CodegenError::UnexpectedValue {
                        value: array.to_string(),
                        expected: "array".to_string(),
                    });
                };
                let element = array.ty.pointee().cloned().ok_or_else(|| {
                    CodegenError::UnexpectedValue {
                        value: array.to_string(),
                        expected: "array".to_string(),
                    }
                })?;

                let index = self.expr(index)?;
                let index = self.coerce(index, &LlvmType::I32)?;

                let address = self.registers.fresh(element.clone().ptr());
                emit!(
                    self,
                    "{address} = getelementptr inbounds {element}, {} {array}, i32 {index}",
                    array.ty
                )?;

                let value = self.registers.fresh(element.clone());
                emit!(self, "{value} = load {element}, {} {address}", address.ty)?;

                Ok(TypedValue::Register(value))
            }
            Expr::ArrayLength(array, _) => self.length(array),
            Expr::MethodCall(receiver, name, args, _) => {
                let outer = std::mem::replace(&mut self.in_cond, false);
                let value = self.call(receiver, name, args);
                self.in_cond = outer;

                value
            }
            Expr::Int(literal, span) => literal
                .parse(span)
                .map(TypedValue::Int)
                .map_err(|_| CodegenError::InvalidLiteral(literal.text().to_string())),
            Expr::True(_) => Ok(TypedValue::Bool(true)),
            Expr::False(_) => Ok(TypedValue::Bool(false)),
            Expr::Ident(name, _) => self.load_variable(name).map(TypedValue::Register),
            Expr::This(_) => {
                let class = self
                    .class
                    .clone()
                    .ok_or_else(|| CodegenError::MissingRegister("this".to_string()))?;

                Ok(TypedValue::Register(RegisterInfo {
                    name: "this".to_string(),
                    ty: LlvmType::Object(class),
                }))
            }
            Expr::NewObject(class, _) => {
                if self.model.class(class).is_none() {
                    return Err(CodegenError::UnknownClass(class.clone()));
                }

                let size = self.model.object_size(class);
                let object = self.registers.fresh(LlvmType::Object(class.clone()));
                emit!(self, "{object} = call i8* @calloc(i64 1, i64 {size})")?;

                Ok(TypedValue::Register(object))
            }
            Expr::NewIntArray(size, _) => self.new_array(size, LlvmType::I32),
            Expr::NewBoolArray(size, _) => self.new_array(size, LlvmType::I8),
            Expr::Not(inner, _) => {
                let value = self.expr(inner)?;
                if let TypedValue::Bool(value) = value {
                    return Ok(TypedValue::Bool(!value));
                }

                let bit = self.as_i1(value)?;
                let negated = self.registers.fresh(LlvmType::I1);
                emit!(self, "{negated} = xor i1 {bit}, true")?;

                self.widen_outside_condition(negated)
            }
            Expr::Paren(inner, _) => self.expr(inner),
        }
    }

    fn arithmetic(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<TypedValue, CodegenError> {
        let lhs = self.expr(lhs)?;
        let rhs = self.expr(rhs)?;

        if let (TypedValue::Int(lhs), TypedValue::Int(rhs)) = (&lhs, &rhs) {
            return Ok(op.fold(*lhs, *rhs));
        }

        let lhs = self.coerce(lhs, &LlvmType::I32)?;
        let rhs = self.coerce(rhs, &LlvmType::I32)?;

        if op == BinaryOp::Less {
            let cmp = self.registers.fresh(LlvmType::I1);
            emit!(self, "{cmp} = {} i32 {lhs}, {rhs}", op.instruction())?;

            return self.widen_outside_condition(cmp);
        }

        let result = self.registers.fresh(LlvmType::I32);
        emit!(self, "{result} = {} i32 {lhs}, {rhs}", op.instruction())?;

        Ok(TypedValue::Register(result))
    }

    fn widen_outside_condition(&mut self, bit: RegisterInfo) -> Result<TypedValue, CodegenError> {
        if self.in_cond {
            return Ok(TypedValue::Register(bit));
        }

        self.as_i8(TypedValue::Register(bit))
    }

    fn and(&mut self, lhs: &Expr, rhs: &Expr) -> Result<TypedValue, CodegenError> {
        match (lhs.bool_literal(), rhs.bool_literal()) {
            (Some(false), _) => Ok(TypedValue::Bool(false)),
            (Some(true), Some(value)) => Ok(TypedValue::Bool(value)),
            (Some(true), None) => {
                let value = self.expr(rhs)?;
                self.round_trip(value)
            }
            (None, Some(true)) => {
                let value = self.expr(lhs)?;
                self.round_trip(value)
            }
            (None, Some(false)) => {
                // still evaluated for its calls
                self.expr(lhs)?;
                Ok(TypedValue::Bool(false))
            }
            (None, None) => self.short_circuit(lhs, rhs),
        }
    }

    fn round_trip(&mut self, value: TypedValue) -> Result<TypedValue, CodegenError> {
        let bit = self.as_i1(value)?;
        self.as_i8(bit)
    }

    fn short_circuit(&mut self, lhs: &Expr, rhs: &Expr) -> Result<TypedValue, CodegenError> {
        let left = self.expr(lhs)?;
        let left = self.as_i1(left)?;

        let id = self.registers.next_id();
        let rhs_label = format!("and.rhs.{id}");
        let end_label = format!("and.end.{id}");

        let from = self.current_block.clone();
        emit!(self, "br i1 {left}, label %{rhs_label}, label %{end_label}")?;

        self.label(rhs_label)?;
        let right = self.expr(rhs)?;
        let right = self.as_i1(right)?;
        let rhs_end = self.current_block.clone();
        emit!(self, "br label %{end_label}")?;

        self.label(end_label)?;
        let merged = self.registers.fresh(LlvmType::I1);
        emit!(self, "{merged} = phi i1 [ false, %{from} ], [ {right}, %{rhs_end} ]")?;

        self.as_i8(TypedValue::Register(merged))
    }

    fn length(&mut self, array: &Expr) -> Result<TypedValue, CodegenError> {
        let array = match array {
            Expr::Paren(inner, _) => return self.length(inner),
            Expr::Ident(name, _) => {
                return self
                    .tracked_length(name)?
                    .ok_or_else(|| CodegenError::UntrackedArrayLength(name.clone()));
            }
            other => self.expr(other)?,
        };

        array
            .register()
            .and_then(|register| self.registers.length(&register.name))
            .cloned()
            .ok_or_else(|| CodegenError::UntrackedArrayLength(array.to_string()))
    }

    fn new_array(&mut self, size: &Expr, element: LlvmType) -> Result<TypedValue, CodegenError> {
        let length = self.expr(size)?;
        let length = self.coerce(length, &LlvmType::I32)?;

        let count = match &length {
            TypedValue::Register(register) => {
                let wide = self.registers.fresh(LlvmType::I64);
                emit!(self, "{wide} = sext i32 {register} to i64")?;
                wide.to_string()
            }
            literal => literal.to_string(),
        };

        let element_size = match element {
            LlvmType::I32 => 4,
            _ => 1,
        };

        let raw = self.registers.fresh(LlvmType::I8.ptr());
        emit!(self, "{raw} = call i8* @calloc(i64 {count}, i64 {element_size})")?;

        let array = if element == LlvmType::I8 {
            raw
        } else {
            let cast = self.registers.fresh(element.ptr());
            emit!(self, "{cast} = bitcast i8* {raw} to {}", cast.ty)?;
            cast
        };

        self.registers.record_length(&array.name, length);

        Ok(TypedValue::Register(array))
    }

    fn call(&mut self, receiver: &Expr, name: &str, args: &[Expr]) -> Result<TypedValue, CodegenError> {
        let receiver = self.expr(receiver)?;
        let Some(class) = receiver
            .register()
            .and_then(|register| register.ty.class())
            .map(str::to_string)
        else {
            return Err(CodegenError::UnexpectedValue {
                value: receiver.to_string(),
                expected: "object".to_string(),
            });
        };

        let model = self.model;
        let (owner, method) = model
            .lookup_method(&class, name)
            .ok_or_else(|| CodegenError::UnknownMethod {
                class: class.clone(),
                method: name.to_string(),
            })?;

        let mut operands = vec![format!("i8* {receiver}")];
        for ((_, param), arg) in method.params.iter().zip(args.iter()) {
            let ty = LlvmType::from(param);
            let value = self.expr(arg)?;
            let value = self.coerce(value, &ty)?;
            operands.push(format!("{ty} {value}"));
        }

        let ret = LlvmType::from(&method.ret);
        let result = self.registers.fresh(ret.clone());
        emit!(
            self,
            "{result} = call {ret} @{}.{name}({})",
            owner.name,
            operands.join(", ")
        )?;
        self.registers.forget_fields();

        Ok(TypedValue::Register(result))
    }

    pub(super) fn as_i1(&mut self, value: TypedValue) -> Result<TypedValue, CodegenError> {
        match value {
            TypedValue::Int(value) => Ok(TypedValue::Bool(value != 0)),
            TypedValue::Register(register) if register.ty == LlvmType::I8 => {
                let bit = self.registers.fresh(LlvmType::I1);
                emit!(self, "{bit} = trunc i8 {register} to i1")?;

                Ok(TypedValue::Register(bit))
            }
            TypedValue::Register(register) if register.ty != LlvmType::I1 => {
                Err(CodegenError::UnexpectedValue {
                    value: register.to_string(),
                    expected: "i1".to_string(),
                })
            }
            value => Ok(value),
        }
    }

    pub(super) fn as_i8(&mut self, value: TypedValue) -> Result<TypedValue, CodegenError> {
        match value {
            TypedValue::Bool(value) => Ok(TypedValue::Int(value as i32)),
            TypedValue::Register(register) if register.ty == LlvmType::I1 => {
                let byte = self.registers.fresh(LlvmType::I8);
                emit!(self, "{byte} = zext i1 {register} to i8")?;

                Ok(TypedValue::Register(byte))
            }
            TypedValue::Register(register) if register.ty != LlvmType::I8 => {
                Err(CodegenError::UnexpectedValue {
                    value: register.to_string(),
                    expected: "i8".to_string(),
                })
            }
            value => Ok(value),
        }
    }

    /// Converts booleans between their branch and storage widths.
    pub(super) fn coerce(&mut self, value: TypedValue, ty: &LlvmType) -> Result<TypedValue, CodegenError> {
        match ty {
            LlvmType::I1 => self.as_i1(value),
            LlvmType::I8 => self.as_i8(value),
            _ => Ok(value),
        }
    }
}
