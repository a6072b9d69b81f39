use crate::{
    compile::{
        ast::{BinaryOp, ClassDecl, Expr, MainClass, MethodDecl, ProgramPass, SourcePos, Stmt, Type, VarDecl},
        semantic::{
            SemanticError,
            symbols::{Scope, SymbolModel, VariableBinding},
        },
    },
    datstructures::scope_stack::ScopeStack,
};

/// Operand and result types of a binary operator.
trait TypeCheckableOperation {
    fn operand_type(&self) -> Type;
    fn synthesized_type(&self) -> Type;
}

impl TypeCheckableOperation for BinaryOp {
    fn operand_type(&self) -> Type {
        match self {
            Self::And => Type::Boolean,
            Self::Less | Self::Plus | Self::Minus | Self::Times => Type::Int,
        }
    }

    fn synthesized_type(&self) -> Type {
        match self {
            Self::And | Self::Less => Type::Boolean,
            Self::Plus | Self::Minus | Self::Times => Type::Int,
        }
    }
}

///
/// Body pass of the analyzer. Resolves every identifier through a scope stack
/// (ancestor fields at the bottom, locals on top) and derives a type for every
/// expression.
///
pub struct TypeChecker<'m> {
    model: &'m SymbolModel,
    scopes: ScopeStack<String, VariableBinding>,
    class: Option<String>,
}

impl<'m> TypeChecker<'m> {
    pub fn new(model: &'m SymbolModel) -> Self {
        Self {
            model,
            scopes: ScopeStack::new(),
            class: None,
        }
    }

    fn declare_locals(&mut self, method: &str, locals: &[VarDecl]) -> Result<(), SemanticError> {
        for local in locals.iter() {
            self.model.check_type(&local.ty, &local.span)?;

            let binding = VariableBinding {
                name: local.name.clone(),
                ty: local.ty.clone(),
                scope: Scope::Local(method.to_string()),
            };

            if self.scopes.declare(local.name.clone(), binding).is_err() {
                return Err(SemanticError::DuplicateVariable {
                    name: local.name.clone(),
                    span: local.span.clone(),
                });
            }
        }

        Ok(())
    }

    fn lookup(&self, name: &str, span: &SourcePos) -> Result<&VariableBinding, SemanticError> {
        self.scopes
            .lookup(name)
            .ok_or_else(|| SemanticError::Undeclared {
                name: name.to_string(),
                span: span.clone(),
            })
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), SemanticError> {
        match stmt {
            Stmt::Block(stmts) => {
                for stmt in stmts.iter() {
                    self.check_stmt(stmt)?;
                }
            }
            Stmt::Assign(name, value, span) => {
                let target = self.lookup(name, span)?.ty.clone();
                let got = self.synthesize(value)?;

                if value.is_array_allocation() && !target.is_array() {
                    return Err(SemanticError::WrongAllocation {
                        name: name.clone(),
                        expected: target,
                        got,
                        span: span.clone(),
                    });
                }

                if !self.model.is_assignable(&got, &target) {
                    return Err(SemanticError::WrongAssignment {
                        name: name.clone(),
                        expected: target,
                        got,
                        span: span.clone(),
                    });
                }
            }
            Stmt::ArrayAssign(name, index, value, span) => {
                let array = self.lookup(name, span)?.ty.clone();
                let Some(element) = array.element() else {
                    return Err(SemanticError::NotAnArray {
                        got: array,
                        span: span.clone(),
                    });
                };

                self.check(Type::Int, index)?;

                let got = self.synthesize(value)?;
                if got != element {
                    return Err(SemanticError::WrongAssignment {
                        name: format!("{name}[]"),
                        expected: element,
                        got,
                        span: span.clone(),
                    });
                }
            }
            Stmt::If(cond, then, otherwise) => {
                self.check(Type::Boolean, cond)?;
                self.check_stmt(then)?;
                self.check_stmt(otherwise)?;
            }
            Stmt::While(cond, body) => {
                self.check(Type::Boolean, cond)?;
                self.check_stmt(body)?;
            }
            Stmt::Print(expr, _) => {
                self.check(Type::Int, expr)?;
            }
        }

        Ok(())
    }

    /// Requires `expr` to have exactly type `expected`.
    pub fn check(&mut self, expected: Type, expr: &Expr) -> Result<(), SemanticError> {
        let got = self.synthesize(expr)?;

        if got == expected {
            return Ok(());
        }

        Err(SemanticError::MismatchedTypes {
            expected,
            got,
            span: expr.span(),
        })
    }

    /// Derives the static type of `expr`.
    pub fn synthesize(&mut self, expr: &Expr) -> Result<Type, SemanticError> {
        let ty = match expr {
            Expr::Binary(op, lhs, rhs) => {
                let lhs_ty = self.synthesize(lhs)?;
                let rhs_ty = self.synthesize(rhs)?;
                let expected = op.operand_type();

                if *op == BinaryOp::Times && (lhs_ty != expected || rhs_ty != expected) {
                    return Err(SemanticError::WrongMultiplication {
                        lhs: lhs_ty,
                        rhs: rhs_ty,
                        span: expr.span(),
                    });
                }

                for (got, operand) in [(lhs_ty, lhs), (rhs_ty, rhs)] {
                    if got != expected {
                        return Err(SemanticError::WrongOperand {
                            op: *op,
                            expected,
                            got,
                            span: operand.span(),
                        });
                    }
                }

                op.synthesized_type()
            }
            Expr::ArrayLookup(array, index) => {
                let array_ty = self.synthesize(array)?;
                let Some(element) = array_ty.element() else {
                    return Err(SemanticError::NotAnArray {
                        got: array_ty,
                        span: array.span(),
                    });
                };

                self.check(Type::Int, index)?;
                element
            }
            Expr::ArrayLength(array, span) => {
                let array_ty = self.synthesize(array)?;
                if !array_ty.is_array() {
                    return Err(SemanticError::NotAnArray {
                        got: array_ty,
                        span: span.clone(),
                    });
                }

                Type::Int
            }
            Expr::MethodCall(receiver, name, args, span) => {
                self.synthesize_call(receiver, name, args, span)?
            }
            Expr::Int(literal, span) => {
                literal.parse(span)?;
                Type::Int
            }
            Expr::True(_) | Expr::False(_) => Type::Boolean,
            Expr::Ident(name, span) => self.lookup(name, span)?.ty.clone(),
            Expr::This(span) => match &self.class {
                Some(class) => Type::Class(class.clone()),
                None => return Err(SemanticError::ThisInMain { span: span.clone() }),
            },
            Expr::NewObject(class, span) => {
                let ty = Type::Class(class.clone());
                self.model.check_type(&ty, span)?;
                ty
            }
            Expr::NewIntArray(size, _) => {
                self.check(Type::Int, size)?;
                Type::IntArray
            }
            Expr::NewBoolArray(size, _) => {
                self.check(Type::Int, size)?;
                Type::BoolArray
            }
            Expr::Not(inner, _) => {
                self.check(Type::Boolean, inner)?;
                Type::Boolean
            }
            Expr::Paren(inner, _) => self.synthesize(inner)?,
        };

        Ok(ty)
    }

    fn synthesize_call(
        &mut self,
        receiver: &Expr,
        name: &str,
        args: &[Expr],
        span: &SourcePos,
    ) -> Result<Type, SemanticError> {
        let class = match self.synthesize(receiver)? {
            Type::Class(class) => class,
            got => {
                return Err(SemanticError::NotAnObject {
                    method: name.to_string(),
                    got,
                    span: span.clone(),
                });
            }
        };

        let model = self.model;
        let Some((_, method)) = model.lookup_method(&class, name) else {
            return Err(SemanticError::UnknownMethod {
                class,
                method: name.to_string(),
                span: span.clone(),
            });
        };

        if method.params.len() != args.len() {
            return Err(SemanticError::WrongArgumentCount {
                method: format!("{class}.{name}"),
                expected: method.params.len(),
                got: args.len(),
                span: span.clone(),
            });
        }

        for ((_, param), arg) in method.params.iter().zip(args.iter()) {
            let got = self.synthesize(arg)?;
            if !model.is_assignable(&got, param) {
                return Err(SemanticError::MismatchedTypes {
                    expected: param.clone(),
                    got,
                    span: arg.span(),
                });
            }
        }

        Ok(method.ret.clone())
    }
}

impl ProgramPass for TypeChecker<'_> {
    type Error = SemanticError;

    fn main_class(&mut self, main: &MainClass) -> Result<(), Self::Error> {
        self.scopes.clear();
        self.scopes.push();
        self.class = None;

        let model = self.model;
        let info = model.main();
        if let Some(local) = main.locals.iter().find(|local| local.name == info.args_name) {
            return Err(SemanticError::DuplicateVariable {
                name: local.name.clone(),
                span: local.span.clone(),
            });
        }

        self.declare_locals(&info.name, &main.locals)?;

        for stmt in main.body.iter() {
            self.check_stmt(stmt)?;
        }

        Ok(())
    }

    fn method(&mut self, class: &ClassDecl, method: &MethodDecl) -> Result<(), Self::Error> {
        self.scopes.clear();
        self.class = Some(class.name.clone());

        let model = self.model;
        let mut lineage: Vec<_> = model.ancestors(&class.name).collect();
        lineage.reverse();

        for owner in lineage {
            self.scopes.push_with(owner.fields.iter().map(|(name, field)| {
                let binding = VariableBinding {
                    name: name.clone(),
                    ty: field.ty.clone(),
                    scope: Scope::Field(owner.name.clone()),
                };

                (name.clone(), binding)
            }));
        }

        self.scopes.push();
        self.declare_locals(&method.name, &method.params)?;
        self.declare_locals(&method.name, &method.locals)?;

        for stmt in method.body.iter() {
            self.check_stmt(stmt)?;
        }

        let got = self.synthesize(&method.ret)?;
        if !model.is_assignable(&got, &method.ty) {
            return Err(SemanticError::WrongReturnType {
                method: format!("{}.{}", class.name, method.name),
                expected: method.ty.clone(),
                got,
                span: method.ret.span(),
            });
        }

        Ok(())
    }
}
