use std::{collections::HashMap, fmt::Write};

use crate::compile::{
    ast::{SourcePos, Type},
    semantic::SemanticError,
};

/// Where a variable binding lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Parameter or local of the named method, or of the main class for the entry point.
    Local(String),
    /// Field declared by the named class.
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBinding {
    pub name: String,
    pub ty: Type,
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub ty: Type,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub ret: Type,
    pub params: Vec<(String, Type)>,
    pub offset: usize,
    /// Ancestor whose slot this method reuses.
    pub overrides: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainInfo {
    pub name: String,
    pub args_name: String,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub parent: Option<String>,
    pub fields: Vec<(String, FieldInfo)>,
    pub methods: Vec<(String, MethodInfo)>,
    /// First free field offset after this class's own fields.
    pub field_end: usize,
    /// First free method slot after this class's own methods.
    pub method_end: usize,
}

impl ClassInfo {
    pub fn new(name: String, parent: Option<String>, field_start: usize, method_start: usize) -> Self {
        Self {
            name,
            parent,
            fields: Vec::new(),
            methods: Vec::new(),
            field_end: field_start,
            method_end: method_start,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find_map(|(field, info)| (field == name).then_some(info))
    }

    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find_map(|(method, info)| (method == name).then_some(info))
    }

    pub fn add_field(&mut self, name: String, ty: Type) -> &FieldInfo {
        let offset = self.field_end;
        self.field_end += ty.field_size();
        self.fields.push((name, FieldInfo { ty, offset }));

        &self.fields[self.fields.len() - 1].1
    }

    /// Adds a method, taking a fresh 8 byte slot unless `inherited` names the slot it overrides.
    pub fn add_method(
        &mut self,
        name: String,
        ret: Type,
        params: Vec<(String, Type)>,
        inherited: Option<(String, usize)>,
    ) -> &MethodInfo {
        let (offset, overrides) = match inherited {
            Some((owner, offset)) => (offset, Some(owner)),
            None => {
                let offset = self.method_end;
                self.method_end += 8;
                (offset, None)
            }
        };

        self.methods.push((
            name,
            MethodInfo {
                ret,
                params,
                offset,
                overrides,
            },
        ));

        &self.methods[self.methods.len() - 1].1
    }
}

///
/// Whole-program class table shared by the type checker and the code generator.
/// Built once, before any method body is looked at.
///
#[derive(Debug, Clone)]
pub struct SymbolModel {
    main: MainInfo,
    classes: HashMap<String, ClassInfo>,
    order: Vec<String>,
}

impl SymbolModel {
    pub fn new(main: MainInfo) -> Self {
        Self {
            main,
            classes: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn main(&self) -> &MainInfo {
        &self.main
    }

    pub fn insert_class(&mut self, class: ClassInfo) {
        self.order.push(class.name.clone());
        self.classes.insert(class.name.clone(), class);
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    /// Classes in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.order.iter().filter_map(|name| self.classes.get(name))
    }

    /// The class itself followed by its parent, grandparent and so on.
    pub fn ancestors<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a ClassInfo> {
        std::iter::successors(self.class(name), |class| {
            class.parent.as_deref().and_then(|parent| self.class(parent))
        })
    }

    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        self.ancestors(sub).any(|class| class.name == sup)
    }

    /// Whether a value of type `from` may be stored where `to` is expected.
    pub fn is_assignable(&self, from: &Type, to: &Type) -> bool {
        match (from, to) {
            (Type::Class(sub), Type::Class(sup)) => self.is_subclass(sub, sup),
            _ => from == to,
        }
    }

    pub fn check_type(&self, ty: &Type, span: &SourcePos) -> Result<(), SemanticError> {
        match ty {
            Type::Class(name) if !self.classes.contains_key(name) => {
                Err(SemanticError::UnknownType {
                    name: name.clone(),
                    span: span.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn lookup_field(&self, class: &str, name: &str) -> Option<(&ClassInfo, &FieldInfo)> {
        self.ancestors(class)
            .find_map(|owner| owner.field(name).map(|field| (owner, field)))
    }

    /// Resolves a method on `class` or the nearest ancestor declaring it.
    pub fn lookup_method(&self, class: &str, name: &str) -> Option<(&ClassInfo, &MethodInfo)> {
        self.ancestors(class)
            .find_map(|owner| owner.method(name).map(|method| (owner, method)))
    }

    /// Bytes to allocate for an instance, inherited fields included.
    pub fn object_size(&self, class: &str) -> usize {
        self.class(class)
            .map(|class| class.field_end)
            .unwrap_or(0)
            .max(1)
    }

    /// Layout listing, one `Class.member : offset` line per field and newly introduced method.
    pub fn render_offsets(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();

        for class in self.classes() {
            for (name, field) in class.fields.iter() {
                writeln!(out, "{}.{} : {}", class.name, name, field.offset)?;
            }

            for (name, method) in class.methods.iter() {
                if method.overrides.is_none() {
                    writeln!(out, "{}.{} : {}", class.name, name, method.offset)?;
                }
            }

            out.push('\n');
        }

        Ok(out)
    }
}
