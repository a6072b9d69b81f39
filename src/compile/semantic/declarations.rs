use std::collections::HashSet;

use crate::compile::{
    ast::{ClassDecl, Program, SourcePos, Type, VarDecl},
    semantic::{
        SemanticError,
        symbols::{ClassInfo, MainInfo, SymbolModel},
    },
};

/// Declaration pre-pass: registers every class, lays out fields and method slots.
///
/// Runs before any body is checked so that bodies may refer to classes declared
/// further down the file.
pub fn declare(program: &Program) -> Result<SymbolModel, SemanticError> {
    let mut model = SymbolModel::new(MainInfo {
        name: program.main.name.clone(),
        args_name: program.main.args_name.clone(),
    });

    let mut names: HashSet<&str> = HashSet::new();
    for class in program.classes.iter() {
        if class.name == program.main.name || !names.insert(&class.name) {
            return Err(SemanticError::DuplicateClass {
                name: class.name.clone(),
                span: class.span.clone(),
            });
        }
    }

    for class in program.classes.iter() {
        let info = declare_class(&model, &names, class)?;
        model.insert_class(info);
    }

    Ok(model)
}

fn declare_class(
    model: &SymbolModel,
    names: &HashSet<&str>,
    class: &ClassDecl,
) -> Result<ClassInfo, SemanticError> {
    // only classes already laid out are visible as parents
    let (field_start, method_start) = match &class.parent {
        Some(parent) => {
            let Some(parent_info) = model.class(parent) else {
                return Err(SemanticError::UnknownParent {
                    name: class.name.clone(),
                    parent: parent.clone(),
                    span: class.span.clone(),
                });
            };

            (parent_info.field_end, parent_info.method_end)
        }
        None => (0, 0),
    };

    let mut info = ClassInfo::new(
        class.name.clone(),
        class.parent.clone(),
        field_start,
        method_start,
    );

    for field in class.fields.iter() {
        check_type(names, &field.ty, &field.span)?;

        if info.field(&field.name).is_some() {
            return Err(SemanticError::DuplicateField {
                class: class.name.clone(),
                name: field.name.clone(),
                span: field.span.clone(),
            });
        }

        info.add_field(field.name.clone(), field.ty.clone());
    }

    for method in class.methods.iter() {
        check_type(names, &method.ty, &method.span)?;
        let params = declare_params(names, &method.params)?;

        if info.method(&method.name).is_some() {
            return Err(SemanticError::DuplicateMethod {
                class: class.name.clone(),
                name: method.name.clone(),
                span: method.span.clone(),
            });
        }

        let inherited = class.parent.as_deref().and_then(|parent| {
            model
                .lookup_method(parent, &method.name)
                .map(|(owner, slot)| (owner.name.clone(), slot.offset))
        });

        info.add_method(method.name.clone(), method.ty.clone(), params, inherited);
    }

    Ok(info)
}

fn declare_params(
    names: &HashSet<&str>,
    params: &[VarDecl],
) -> Result<Vec<(String, Type)>, SemanticError> {
    let mut declared: Vec<(String, Type)> = Vec::with_capacity(params.len());

    for param in params.iter() {
        check_type(names, &param.ty, &param.span)?;

        if declared.iter().any(|(name, _)| *name == param.name) {
            return Err(SemanticError::DuplicateVariable {
                name: param.name.clone(),
                span: param.span.clone(),
            });
        }

        declared.push((param.name.clone(), param.ty.clone()));
    }

    Ok(declared)
}

fn check_type(names: &HashSet<&str>, ty: &Type, span: &SourcePos) -> Result<(), SemanticError> {
    match ty {
        Type::Class(name) if !names.contains(name.as_str()) => Err(SemanticError::UnknownType {
            name: name.clone(),
            span: span.clone(),
        }),
        _ => Ok(()),
    }
}
